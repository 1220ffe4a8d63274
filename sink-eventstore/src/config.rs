//! Configuration module for the Event Store Sink Connector
//!
//! This module handles all configuration aspects including:
//! - Input row schema and raw insert parameters
//! - Named service configurations (`[services.<name>]`)
//! - Optional setup statements run before inserting
//! - Toolkit location
//! - Environment variable overrides for endpoints and secrets

use crate::connection::ConnectionSource;
use crate::error::{ConfigError, ConfigErrorReason, ConnectorResult};
use crate::insert::{InsertConfig, InsertConfigBuilder, INSERT_PARAMS};
use crate::params::{find_spec, ParamSpec, RawParams};
use crate::schema::RowSchema;
use crate::service::{ServiceRef, ServiceRegistry};
use crate::statement::{StatementConfig, STATEMENT_PARAMS};
use crate::toolkit::{ToolkitLocation, ToolkitSettings};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::Path;

/// Complete configuration for the Event Store Sink Connector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStoreSinkConfig {
    /// Core connector settings
    pub core: CoreConfig,

    /// Event Store sink settings
    pub eventstore: EventStoreConfig,

    /// Named service configurations
    #[serde(default)]
    pub services: ServiceRegistry,

    /// Toolkit location
    #[serde(default)]
    pub toolkit: ToolkitSettings,
}

/// Core connector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Unique connector name
    pub connector_name: String,
}

/// Event Store sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStoreConfig {
    /// Schema of the rows written to the table, e.g. "tuple<int32 id, rstring name>"
    pub input_schema: RowSchema,

    /// Raw insert parameters, validated by [`InsertConfigBuilder`]
    pub insert: RawParams,

    /// Statements to run before inserting (e.g. table DDL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<RawParams>,
}

impl EventStoreSinkConfig {
    /// Load configuration from TOML file
    ///
    /// The config file path must be specified via CONNECTOR_CONFIG_PATH environment variable.
    /// Environment variables can override endpoints and secrets.
    pub fn load() -> ConnectorResult<Self> {
        let config_path = env::var("CONNECTOR_CONFIG_PATH").map_err(|_| {
            ConfigError::missing(
                "CONNECTOR_CONFIG_PATH (path of the TOML configuration file)",
            )
        })?;

        let mut config = Self::from_file(&config_path)?;
        config.apply_env_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> ConnectorResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::new(
                ConfigErrorReason::Io,
                format!("Failed to read config file '{}': {}", path.display(), e),
            )
        })?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> ConnectorResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply environment variable overrides
    ///
    /// - `CONNECTOR_NAME`
    /// - `EVENTSTORE_CONNECTION`: replaces the literal connection, or the
    ///   connection string of the service config in use (named or inline)
    /// - `EVENTSTORE_DATABASE`, `EVENTSTORE_USER`, `EVENTSTORE_PASSWORD`
    ///
    /// Overrides apply to the insert parameters and to the setup statements alike.
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(name) = env("CONNECTOR_NAME") {
            tracing::info!("Overriding connector_name from environment");
            self.core.connector_name = name;
        }

        let connection = env("EVENTSTORE_CONNECTION");
        let overrides: Vec<(&str, String)> = [
            ("EVENTSTORE_DATABASE", "database"),
            ("EVENTSTORE_USER", "user"),
            ("EVENTSTORE_PASSWORD", "password"),
        ]
        .into_iter()
        .filter_map(|(var, param)| env(var).map(|value| (param, value)))
        .collect();

        let targets = [
            ("insert", INSERT_PARAMS, Some(&mut self.eventstore.insert)),
            ("setup", STATEMENT_PARAMS, self.eventstore.setup.as_mut()),
        ];
        for (section, specs, params) in targets {
            let Some(params) = params else { continue };

            if let Some(connection) = &connection {
                override_connection(section, specs, params, &mut self.services, connection);
            }
            for (param, value) in &overrides {
                if let Some(spec) = find_spec(specs, param) {
                    tracing::info!("Overriding {} parameter '{}' from environment", section, param);
                    params.replace(spec, value.as_str());
                }
            }
        }
    }

    /// Validate the insert parameters and build the insert configuration
    pub fn insert_config(&self) -> ConnectorResult<InsertConfig> {
        InsertConfigBuilder::new(self.eventstore.input_schema.clone(), &self.services)
            .build(&self.eventstore.insert)
    }

    /// Validate the setup statement parameters, if any
    pub fn setup_config(&self) -> ConnectorResult<Option<StatementConfig>> {
        self.eventstore
            .setup
            .as_ref()
            .map(|raw| StatementConfig::build(raw, &self.services))
            .transpose()
    }

    /// Resolve the toolkit location, consulting the process environment
    pub fn toolkit_location(&self) -> ConnectorResult<ToolkitLocation> {
        ToolkitLocation::resolve(&self.toolkit, |key| env::var(key).ok())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.core.connector_name.trim().is_empty() {
            return Err(ConfigError::missing("connector_name"));
        }

        if self.eventstore.input_schema.is_empty() {
            return Err(ConfigError::missing("input_schema"));
        }

        let insert = self.insert_config()?;
        if let ConnectionSource::NamedService(ServiceRef::Name(name)) = insert.connection_source() {
            tracing::debug!("Insert uses service config '{}'", name);
        }

        self.setup_config()?;
        Ok(())
    }
}

/// Point the connection source of `params` at `connection` without adding a second source
fn override_connection(
    section: &str,
    specs: &[ParamSpec],
    params: &mut RawParams,
    services: &mut ServiceRegistry,
    connection: &str,
) {
    let named = find_spec(specs, "config").and_then(|spec| params.lookup_mut(spec));

    match named {
        Some(Value::String(name)) if !name.trim().is_empty() => {
            match services.get_mut(name.trim()) {
                Some(details) => {
                    tracing::info!(
                        "Overriding connection string of service config '{}' from environment",
                        name.trim()
                    );
                    details.connection_string = connection.to_string();
                }
                None => tracing::warn!(
                    "Ignoring EVENTSTORE_CONNECTION: {} uses unknown service config '{}'",
                    section,
                    name.trim()
                ),
            }
        }
        Some(Value::Object(inline)) => {
            tracing::info!(
                "Overriding connection string of the inline {} service config from environment",
                section
            );
            for key in INLINE_CONNECTION_KEYS {
                inline.remove(*key);
            }
            inline.insert("connection_string".to_string(), Value::from(connection));
        }
        Some(Value::String(_)) | None => {
            if let Some(spec) = find_spec(specs, "connection") {
                tracing::info!("Overriding {} connection from environment", section);
                params.replace(spec, connection);
            }
        }
        Some(other) => tracing::warn!(
            "Ignoring EVENTSTORE_CONNECTION: {} service config is not usable ({})",
            section,
            other
        ),
    }
}

// Keys under which an inline service config may carry its connection string
const INLINE_CONNECTION_KEYS: &[&str] = &["connection_string", "connection", "connectionString"];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[core]
connector_name = "eventstore-sink"

[eventstore]
input_schema = "tuple<int32 id, rstring name>"

[eventstore.insert]
table = "SampleTable"
schemaName = "sample"
config = "eventstore"
primary_key = "id"
batch_size = 100
plugin_flag = "false"

[eventstore.setup]
config = "eventstore"
statement = "CREATE TABLE IF NOT EXISTS sample.SampleTable (id INT NOT NULL, name VARCHAR(32))"

[services.eventstore]
connection_string = "10.0.0.5:18730;10.0.0.5:1101"
database = "EVENTDB"
username = "admin"

[toolkit]
url = "https://example.com/streamsx.eventstore.tgz"
"#;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_parse_and_validate_sample() {
        let config = EventStoreSinkConfig::from_toml(SAMPLE).unwrap();
        assert!(config.validate().is_ok());

        let insert = config.insert_config().unwrap();
        assert_eq!(insert.database(), "EVENTDB");
        assert_eq!(insert.schema_name(), Some("sample"));
        assert_eq!(insert.batch_size(), Some(100));
        assert_eq!(insert.plugin_flag(), Some(false));

        let setup = config.setup_config().unwrap().unwrap();
        assert_eq!(setup.statements().len(), 1);
    }

    #[test]
    fn test_shipped_example_config() {
        let config =
            EventStoreSinkConfig::from_toml(include_str!("../config/connector.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.toolkit, ToolkitSettings::default());
    }

    #[test]
    fn test_env_overrides_named_service() {
        let mut config = EventStoreSinkConfig::from_toml(SAMPLE).unwrap();
        config.apply_env_overrides(env_of(&[
            ("CONNECTOR_NAME", "prod-sink"),
            ("EVENTSTORE_CONNECTION", "10.1.1.1:18730;10.1.1.1:1101"),
            ("EVENTSTORE_PASSWORD", "from-env"),
        ]));

        assert_eq!(config.core.connector_name, "prod-sink");
        let insert = config.insert_config().unwrap();
        assert_eq!(insert.connection_string(), "10.1.1.1:18730;10.1.1.1:1101");
        assert_eq!(insert.credentials().password.as_deref(), Some("from-env"));
        assert_eq!(insert.credentials().username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_env_overrides_literal_connection_alias() {
        let toml = r#"
[core]
connector_name = "eventstore-sink"

[eventstore]
input_schema = "tuple<int32 id>"

[eventstore.insert]
table = "T"
connectionString = "h:1"
databaseName = "d"
"#;
        let mut config = EventStoreSinkConfig::from_toml(toml).unwrap();
        config.apply_env_overrides(env_of(&[
            ("EVENTSTORE_CONNECTION", "h:2"),
            ("EVENTSTORE_DATABASE", "other"),
        ]));

        let insert = config.insert_config().unwrap();
        assert_eq!(insert.connection_string(), "h:2");
        assert_eq!(insert.database(), "other");
    }

    #[test]
    fn test_env_connection_updates_inline_service_config() {
        let toml = r#"
[core]
connector_name = "eventstore-sink"

[eventstore]
input_schema = "tuple<int32 id>"

[eventstore.insert]
table = "T"
config = { connectionString = "h:1;h:2", database = "EVENTDB" }
"#;
        let mut config = EventStoreSinkConfig::from_toml(toml).unwrap();
        assert_eq!(config.insert_config().unwrap().connection_string(), "h:1;h:2");

        config.apply_env_overrides(env_of(&[("EVENTSTORE_CONNECTION", "h:9;h:10")]));
        let insert = config.insert_config().unwrap();
        assert_eq!(insert.connection_string(), "h:9;h:10");
        assert_eq!(insert.database(), "EVENTDB");
    }

    #[test]
    fn test_env_connection_never_adds_a_second_source() {
        let insert_ref = "config = \"eventstore\"\nprimary_key";
        let padded = SAMPLE.replace(insert_ref, "config = \" eventstore \"\nprimary_key");
        let mut config = EventStoreSinkConfig::from_toml(&padded).unwrap();
        config.apply_env_overrides(env_of(&[("EVENTSTORE_CONNECTION", "h:9;h:10")]));
        assert_eq!(config.insert_config().unwrap().connection_string(), "h:9;h:10");

        let unknown = SAMPLE.replace(insert_ref, "config = \"missing\"\nprimary_key");
        let mut config = EventStoreSinkConfig::from_toml(&unknown).unwrap();
        config.apply_env_overrides(env_of(&[("EVENTSTORE_CONNECTION", "h:9;h:10")]));
        let err = config.insert_config().unwrap_err();
        assert_eq!(err.reason(), ConfigErrorReason::ServiceConfigNotFound);
    }

    #[test]
    fn test_env_overrides_reach_setup_statements() {
        let toml = r#"
[core]
connector_name = "eventstore-sink"

[eventstore]
input_schema = "tuple<int32 id>"

[eventstore.insert]
table = "T"
connection = "h:1;h:2"
database = "FILEDB"
user = "fileuser"
ssl_connection = false

[eventstore.setup]
connection = "h:1;h:2"
database = "FILEDB"
user = "fileuser"
statement = "CREATE TABLE T (id INT)"
ssl_connection = false
"#;
        let mut config = EventStoreSinkConfig::from_toml(toml).unwrap();
        config.apply_env_overrides(env_of(&[
            ("EVENTSTORE_CONNECTION", "h:9;h:10"),
            ("EVENTSTORE_DATABASE", "ENVDB"),
            ("EVENTSTORE_USER", "envuser"),
        ]));

        let insert = config.insert_config().unwrap();
        assert_eq!(insert.database(), "ENVDB");
        assert_eq!(insert.credentials().username.as_deref(), Some("envuser"));

        let setup = config.setup_config().unwrap().unwrap();
        assert_eq!(setup.database(), "ENVDB");
        assert_eq!(setup.credentials().username.as_deref(), Some("envuser"));
        assert_eq!(setup.jdbc_url(), "jdbc:db2://h:9/ENVDB");
    }

    #[test]
    fn test_validate_reports_insert_errors() {
        let toml = SAMPLE.replace("batch_size = 100", "batch_size = 0");
        let config = EventStoreSinkConfig::from_toml(&toml).unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.reason(), ConfigErrorReason::InvalidNumericParameter);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connector.toml");
        fs::write(&path, SAMPLE).unwrap();
        let config = EventStoreSinkConfig::from_file(&path).unwrap();
        assert_eq!(config.services.len(), 1);

        let err = EventStoreSinkConfig::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.reason(), ConfigErrorReason::Io);

        let err = EventStoreSinkConfig::from_toml("[core").unwrap_err();
        assert_eq!(err.reason(), ConfigErrorReason::Parse);
    }
}
