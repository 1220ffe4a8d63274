//! Insert configuration
//!
//! [`InsertConfigBuilder`] validates and normalizes the parameters of a
//! table-insert sink and assembles them into one immutable [`InsertConfig`].
//! Building is a pure, single-pass, all-or-nothing step: either every parameter
//! is valid and a configuration is returned, or the first problem is reported
//! as a [`ConfigError`](crate::error::ConfigError).

use crate::connection::{ConnectionSource, ResolvedConnection};
use crate::error::{ConfigError, ConnectorResult};
use crate::params::{CanonicalParams, ParamSpec, RawParams};
use crate::schema::RowSchema;
use crate::service::{Credentials, ServiceResolver, TlsMaterial};
use tracing::{debug, warn};

/// Parameters accepted by [`InsertConfigBuilder::build`]
pub const INSERT_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("table", &["tableName"]),
    ParamSpec::new("schema_name", &["schemaName"]),
    ParamSpec::new("database", &["databaseName"]),
    ParamSpec::new("connection", &["connectionString"]),
    ParamSpec::new("config", &["serviceConfig"]),
    ParamSpec::new("batch_size", &["batchSize"]),
    ParamSpec::new(
        "max_num_active_batches",
        &["maxNumActiveBatches", "maxActiveBatches", "max_active_batches"],
    ),
    ParamSpec::new("front_end_connection_flag", &["frontEndConnectionFlag"]),
    ParamSpec::new("plugin_flag", &["pluginFlag"]),
    ParamSpec::new("ssl_connection", &["sslConnection"]),
    ParamSpec::new("user", &["username", "eventStoreUser"]),
    ParamSpec::new("password", &["eventStorePassword"]),
    ParamSpec::new("truststore", &["trustStore"]),
    ParamSpec::new("truststore_password", &["trustStorePassword"]),
    ParamSpec::new("keystore", &["keyStore"]),
    ParamSpec::new("keystore_password", &["keyStorePassword"]),
    ParamSpec::new("primary_key", &["primaryKey"]),
    ParamSpec::new("partitioning_key", &["partitioningKey"]),
    ParamSpec::new("schema", &["resultSchema", "result_schema"]),
    ParamSpec::new("name", &[]),
];

/// Explicit output schema carrying a per-row insert-success flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSchema {
    pub schema: RowSchema,
    /// Name of the boolean indicator column
    pub indicator: String,
}

/// Validated, normalized configuration of a table-insert sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertConfig {
    connection: ResolvedConnection,
    database: String,
    table: String,
    schema_name: Option<String>,
    primary_key: Option<Vec<String>>,
    partitioning_key: Option<Vec<String>>,
    batch_size: Option<u64>,
    max_active_batches: Option<u64>,
    ssl_connection: bool,
    plugin_flag: Option<bool>,
    front_end_connection_flag: Option<bool>,
    credentials: Credentials,
    tls: TlsMaterial,
    result_schema: Option<ResultSchema>,
    name: Option<String>,
}

impl InsertConfig {
    pub fn connection(&self) -> &ResolvedConnection {
        &self.connection
    }

    pub fn connection_source(&self) -> &ConnectionSource {
        &self.connection.source
    }

    /// Normalized `host:port[;host:port...]` endpoint string
    pub fn connection_string(&self) -> String {
        self.connection.connection_string()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    pub fn primary_key(&self) -> Option<&[String]> {
        self.primary_key.as_deref()
    }

    pub fn partitioning_key(&self) -> Option<&[String]> {
        self.partitioning_key.as_deref()
    }

    /// Rows buffered per write; `None` leaves the operator default in place
    pub fn batch_size(&self) -> Option<u64> {
        self.batch_size
    }

    pub fn max_active_batches(&self) -> Option<u64> {
        self.max_active_batches
    }

    pub fn ssl_connection(&self) -> bool {
        self.ssl_connection
    }

    pub fn plugin_flag(&self) -> Option<bool> {
        self.plugin_flag
    }

    pub fn front_end_connection_flag(&self) -> Option<bool> {
        self.front_end_connection_flag
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn tls(&self) -> &TlsMaterial {
        &self.tls
    }

    pub fn result_schema(&self) -> Option<&ResultSchema> {
        self.result_schema.as_ref()
    }

    /// Operator name in the job graph
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Builds [`InsertConfig`]s for rows of a given input schema
pub struct InsertConfigBuilder<'a> {
    input_schema: RowSchema,
    resolver: &'a dyn ServiceResolver,
}

impl<'a> InsertConfigBuilder<'a> {
    pub fn new(input_schema: RowSchema, resolver: &'a dyn ServiceResolver) -> Self {
        Self {
            input_schema,
            resolver,
        }
    }

    /// Validate `raw` and assemble the insert configuration
    pub fn build(&self, raw: &RawParams) -> ConnectorResult<InsertConfig> {
        let params = raw.canonicalize(INSERT_PARAMS)?;

        let source = ConnectionSource::from_params(&params)?;
        let connection = source.resolve(self.resolver)?;
        debug!(
            "Connection source resolved to endpoints '{}'",
            connection.connection_string()
        );

        let ssl_connection = params.flag("ssl_connection")?.unwrap_or(true);
        let plugin_flag = params.flag("plugin_flag")?;
        let front_end_connection_flag = params.flag("front_end_connection_flag")?;

        let batch_size = params.positive("batch_size")?;
        let max_active_batches = params.positive("max_num_active_batches")?;

        let primary_key = params.key_columns("primary_key")?;
        let partitioning_key = params.key_columns("partitioning_key")?;

        let result_schema = self.result_schema(&params)?;

        let table = params
            .non_blank("table")?
            .ok_or_else(|| ConfigError::missing("table"))?;
        let database = self.database(&params, &connection)?;

        let credentials = connection.credentials.clone().overridden_by(Credentials {
            username: params.non_blank("user")?,
            password: params.string("password")?,
        });
        let tls = connection.tls.clone().overridden_by(TlsMaterial {
            truststore_path: params.non_blank("truststore")?,
            truststore_password: params.string("truststore_password")?,
            keystore_path: params.non_blank("keystore")?,
            keystore_password: params.string("keystore_password")?,
        });

        if !ssl_connection && !tls.is_empty() {
            warn!("Truststore/keystore settings are ignored because ssl_connection is false");
        }

        let config = InsertConfig {
            connection,
            database,
            table,
            schema_name: params.non_blank("schema_name")?,
            primary_key,
            partitioning_key,
            batch_size,
            max_active_batches,
            ssl_connection,
            plugin_flag,
            front_end_connection_flag,
            credentials,
            tls,
            result_schema,
            name: params.non_blank("name")?,
        };

        debug!(
            "Insert configuration built for table '{}' in database '{}'",
            config.table, config.database
        );
        Ok(config)
    }

    fn database(
        &self,
        params: &CanonicalParams,
        connection: &ResolvedConnection,
    ) -> ConnectorResult<String> {
        match (params.non_blank("database")?, &connection.database) {
            (Some(explicit), Some(implied)) => {
                if &explicit != implied {
                    warn!(
                        "Explicit database '{}' overrides '{}' from the service config",
                        explicit, implied
                    );
                }
                Ok(explicit)
            }
            (Some(explicit), None) => Ok(explicit),
            (None, Some(implied)) => Ok(implied.clone()),
            (None, None) => Err(ConfigError::missing("database")),
        }
    }

    fn result_schema(&self, params: &CanonicalParams) -> ConnectorResult<Option<ResultSchema>> {
        let Some(value) = params.value("schema") else {
            return Ok(None);
        };

        let schema = RowSchema::from_value(value)
            .map_err(|e| ConfigError::schema_mismatch(format!("unusable result schema: {}", e)))?;
        let indicator = schema.insert_indicator(&self.input_schema)?;

        Ok(Some(ResultSchema { schema, indicator }))
    }
}
