//! Operator invocation rendering
//!
//! Turns validated configurations into the parameter maps of the external
//! operators: the Event Store insert sink and the JDBC statement runner.
//! Only parameters that are set are rendered, so operator defaults apply to
//! everything else.

use crate::insert::InsertConfig;
use crate::statement::StatementConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Operator kind of the Event Store insert sink
pub const INSERT_OPERATOR: &str = "com.ibm.streamsx.eventstore::EventStoreSink";

/// Operator kind used to run SQL statements
pub const STATEMENT_OPERATOR: &str = "com.ibm.streamsx.jdbc::JDBCRun";

/// A single operator parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Integer(u64),
    Flag(bool),
    Columns(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<u64> for ParamValue {
    fn from(n: u64) -> Self {
        ParamValue::Integer(n)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Flag(b)
    }
}

impl From<&[String]> for ParamValue {
    fn from(columns: &[String]) -> Self {
        ParamValue::Columns(columns.to_vec())
    }
}

/// Operator kind plus rendered parameters, ready for the attachment call
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorInvocation {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub params: BTreeMap<String, ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<String>,
}

impl OperatorInvocation {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: None,
            params: BTreeMap::new(),
            output_schema: None,
        }
    }

    fn param(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.params.insert(key.to_string(), value.into());
    }

    fn optional<V: Into<ParamValue>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.param(key, value);
        }
    }

    /// Render an insert configuration as an `EventStoreSink` invocation
    pub fn insert(config: &InsertConfig) -> Self {
        let mut op = Self::new(INSERT_OPERATOR);
        op.name = config.name().map(str::to_string);

        op.param("connectionString", config.connection_string());
        op.param("databaseName", config.database());
        op.param("tableName", config.table());
        op.optional("schemaName", config.schema_name());
        op.optional("primaryKey", config.primary_key());
        op.optional("partitioningKey", config.partitioning_key());
        op.optional("batchSize", config.batch_size());
        op.optional("maxNumActiveBatches", config.max_active_batches());
        op.optional("frontEndConnectionFlag", config.front_end_connection_flag());
        op.optional("pluginFlag", config.plugin_flag());
        op.param("sslConnection", config.ssl_connection());

        let credentials = config.credentials();
        op.optional("eventStoreUser", credentials.username.clone());
        op.optional("eventStorePassword", credentials.password.clone());

        if config.ssl_connection() {
            let tls = config.tls();
            op.optional("trustStore", tls.truststore_path.clone());
            op.optional("trustStorePassword", tls.truststore_password.clone());
            op.optional("keyStore", tls.keystore_path.clone());
            op.optional("keyStorePassword", tls.keystore_password.clone());
        }

        op.output_schema = config.result_schema().map(|r| r.schema.to_string());
        op
    }

    /// Render one `JDBCRun` invocation per statement
    pub fn statements(config: &StatementConfig) -> Vec<Self> {
        config
            .statements()
            .iter()
            .map(|statement| {
                let mut op = Self::new(STATEMENT_OPERATOR);
                op.param("jdbcUrl", config.jdbc_url());
                op.optional("jdbcUser", config.credentials().username.clone());
                op.optional("jdbcPassword", config.credentials().password.clone());
                op.param("statement", statement.as_str());
                op
            })
            .collect()
    }
}

impl fmt::Debug for OperatorInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: BTreeMap<&str, String> = self
            .params
            .iter()
            .map(|(k, v)| {
                let shown = if k.ends_with("Password") || k == "jdbcUrl" {
                    "***".to_string()
                } else {
                    format!("{:?}", v)
                };
                (k.as_str(), shown)
            })
            .collect();
        f.debug_struct("OperatorInvocation")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("params", &params)
            .field("output_schema", &self.output_schema)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insert::InsertConfigBuilder;
    use crate::params::RawParams;
    use crate::schema::RowSchema;
    use crate::service::ServiceRegistry;
    use serde_json::json;

    fn build(raw: RawParams) -> InsertConfig {
        let schema: RowSchema = "tuple<int32 id, rstring name>".parse().unwrap();
        let registry = ServiceRegistry::new();
        InsertConfigBuilder::new(schema, &registry).build(&raw).unwrap()
    }

    #[test]
    fn test_minimal_insert_params() {
        let op = OperatorInvocation::insert(&build(
            RawParams::new()
                .with("table", "SampleTable")
                .with("connection", "9.26.150.75:1101")
                .with("database", "sample_db"),
        ));

        assert_eq!(op.kind, INSERT_OPERATOR);
        let keys: Vec<&str> = op.params.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["connectionString", "databaseName", "sslConnection", "tableName"]
        );
        assert_eq!(op.params["sslConnection"], ParamValue::Flag(true));
        assert!(op.output_schema.is_none());
    }

    #[test]
    fn test_full_insert_params_serialize() {
        let op = OperatorInvocation::insert(&build(
            RawParams::new()
                .with("table", "SampleTable")
                .with("schema_name", "sample")
                .with("connection", "h:1;h:2")
                .with("database", "TESTDB")
                .with("primary_key", "id")
                .with("batch_size", 100)
                .with("plugin_flag", "false")
                .with("user", "admin")
                .with("password", "secret")
                .with("truststore", "/ts.jks")
                .with("schema", "tuple<int32 id, rstring name, boolean _Inserted_>")
                .with("name", "EventStoreInsert"),
        ));

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["name"], json!("EventStoreInsert"));
        assert_eq!(value["params"]["primaryKey"], json!(["id"]));
        assert_eq!(value["params"]["batchSize"], json!(100));
        assert_eq!(value["params"]["pluginFlag"], json!(false));
        assert_eq!(value["params"]["trustStore"], json!("/ts.jks"));
        assert_eq!(
            value["outputSchema"],
            json!("tuple<int32 id, rstring name, boolean _Inserted_>")
        );
        assert!(!format!("{:?}", op).contains("secret"));
    }

    #[test]
    fn test_tls_omitted_without_ssl() {
        let op = OperatorInvocation::insert(&build(
            RawParams::new()
                .with("table", "T")
                .with("connection", "h:1")
                .with("database", "d")
                .with("ssl_connection", false)
                .with("keystore", "/ks.jks"),
        ));
        assert!(!op.params.contains_key("keyStore"));
        assert_eq!(op.params["sslConnection"], ParamValue::Flag(false));
    }

    #[test]
    fn test_statement_invocations() {
        let config = StatementConfig::build(
            &RawParams::new()
                .with("connection", "h:1")
                .with("database", "d")
                .with("user", "admin")
                .with("ssl_connection", false)
                .with("statement", json!(["SELECT 1", "SELECT 2"])),
            &ServiceRegistry::new(),
        )
        .unwrap();

        let ops = OperatorInvocation::statements(&config);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1].kind, STATEMENT_OPERATOR);
        assert_eq!(ops[1].params["statement"], ParamValue::from("SELECT 2"));
        assert_eq!(ops[0].params["jdbcUser"], ParamValue::from("admin"));
    }
}
