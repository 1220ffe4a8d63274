//! Ad-hoc SQL statement configuration
//!
//! Validates the parameters for running one or more SQL statements (e.g. DDL
//! to create the target table) against the JDBC endpoint of an Event Store
//! instance. The connection is resolved the same way as for inserts.

use crate::connection::{ConnectionSource, ResolvedConnection};
use crate::error::{ConfigError, ConnectorResult};
use crate::params::{parse_string, ParamSpec, RawParams};
use crate::service::{Credentials, ServiceResolver, TlsMaterial};
use serde_json::Value;

/// Parameters accepted by [`StatementConfig::build`]
pub const STATEMENT_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("statement", &["statements", "sql"]),
    ParamSpec::new("database", &["databaseName"]),
    ParamSpec::new("connection", &["connectionString"]),
    ParamSpec::new("config", &["serviceConfig"]),
    ParamSpec::new("ssl_connection", &["sslConnection"]),
    ParamSpec::new("user", &["username"]),
    ParamSpec::new("password", &[]),
    ParamSpec::new("truststore", &["trustStore"]),
    ParamSpec::new("truststore_password", &["trustStorePassword"]),
];

/// Validated configuration for running SQL statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementConfig {
    connection: ResolvedConnection,
    database: String,
    statements: Vec<String>,
    ssl_connection: bool,
    credentials: Credentials,
    tls: TlsMaterial,
}

impl StatementConfig {
    pub fn build(raw: &RawParams, resolver: &dyn ServiceResolver) -> ConnectorResult<Self> {
        let params = raw.canonicalize(STATEMENT_PARAMS)?;

        let connection = ConnectionSource::from_params(&params)?.resolve(resolver)?;
        let ssl_connection = params.flag("ssl_connection")?.unwrap_or(true);

        let statements = match params.value("statement") {
            Some(value) => parse_statements(value)?,
            None => return Err(ConfigError::missing("statement")),
        };

        let database = params
            .non_blank("database")?
            .or_else(|| connection.database.clone())
            .ok_or_else(|| ConfigError::missing("database"))?;

        let credentials = connection.credentials.clone().overridden_by(Credentials {
            username: params.non_blank("user")?,
            password: params.string("password")?,
        });
        let tls = connection.tls.clone().overridden_by(TlsMaterial {
            truststore_path: params.non_blank("truststore")?,
            truststore_password: params.string("truststore_password")?,
            ..Default::default()
        });

        tracing::debug!(
            "Statement configuration built with {} statement(s) for database '{}'",
            statements.len(),
            database
        );

        Ok(Self {
            connection,
            database,
            statements,
            ssl_connection,
            credentials,
            tls,
        })
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn ssl_connection(&self) -> bool {
        self.ssl_connection
    }

    /// JDBC URL of the instance, built from the first endpoint
    pub fn jdbc_url(&self) -> String {
        let endpoint = self.connection.jdbc_endpoint();
        let mut url = format!("jdbc:db2://{}/{}", endpoint, self.database);
        if self.ssl_connection {
            url.push_str(":sslConnection=true;");
            if let Some(path) = &self.tls.truststore_path {
                url.push_str(&format!("sslTrustStoreLocation={};", path));
            }
            if let Some(password) = &self.tls.truststore_password {
                url.push_str(&format!("sslTrustStorePassword={};", password));
            }
        }
        url
    }
}

fn parse_statements(value: &Value) -> ConnectorResult<Vec<String>> {
    let statements: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| parse_string("statement", item))
            .collect::<ConnectorResult<_>>()?,
        other => vec![parse_string("statement", other)?],
    };

    let statements: Vec<String> = statements
        .into_iter()
        .map(|s| s.trim().trim_end_matches(';').trim().to_string())
        .collect();

    if statements.is_empty() || statements.iter().any(String::is_empty) {
        return Err(ConfigError::missing("statement"));
    }
    Ok(statements)
}
