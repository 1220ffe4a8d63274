//! Connection source handling
//!
//! An Event Store connection is given either as a literal endpoint string
//! (`host:port[;host:port...]`) or by naming a service configuration. Both
//! forms are folded into a [`ConnectionSource`] once, at the builder boundary,
//! and resolved into a [`ResolvedConnection`].
//!
//! This module also renders service details as the property set of a named
//! application configuration, which the operator can read at runtime instead
//! of taking credentials as parameters.

use crate::error::{ConfigError, ConfigErrorReason, ConnectorResult};
use crate::params::{parse_string, CanonicalParams};
use crate::service::{
    resolve_service_details, Credentials, ServiceDetails, ServiceRef, ServiceResolver, TlsMaterial,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Default application configuration name
pub const DEFAULT_APP_CONFIG_NAME: &str = "eventstore";

/// Where the connection details come from; exactly one source per configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSource {
    /// Literal endpoint string
    Literal(String),
    /// Named (or inline) service configuration
    NamedService(ServiceRef),
}

impl ConnectionSource {
    /// Fold the `connection` and `config` parameters into a single source
    ///
    /// Blank values count as absent. Supplying both or neither fails with
    /// `AmbiguousConnectionSource`, before either value is interpreted.
    pub fn from_params(params: &CanonicalParams) -> ConnectorResult<Self> {
        let literal = params.value("connection").filter(|v| is_supplied(v));
        let named = params.value("config").filter(|v| is_supplied(v));

        match (literal, named) {
            (Some(value), None) => Ok(ConnectionSource::Literal(
                parse_string("connection", value)?.trim().to_string(),
            )),
            (None, Some(value)) => Ok(ConnectionSource::NamedService(ServiceRef::from_value(
                "config", value,
            )?)),
            (Some(_), Some(_)) => Err(ConfigError::ambiguous_connection(
                "'connection' and 'config' are mutually exclusive, supply only one",
            )),
            (None, None) => Err(ConfigError::ambiguous_connection(
                "either 'connection' or 'config' must be supplied",
            )),
        }
    }

    /// Resolve the source into endpoints, and for named services, database and secrets
    pub fn resolve(&self, resolver: &dyn ServiceResolver) -> ConnectorResult<ResolvedConnection> {
        match self {
            ConnectionSource::Literal(literal) => Ok(ResolvedConnection {
                source: self.clone(),
                endpoints: parse_endpoints(literal)?,
                database: None,
                credentials: Credentials::default(),
                tls: TlsMaterial::default(),
            }),
            ConnectionSource::NamedService(reference) => {
                let details = resolve_service_details(Some(reference), resolver)?;
                Ok(ResolvedConnection {
                    source: self.clone(),
                    endpoints: parse_endpoints(&details.connection_string)?,
                    database: details.database.clone().filter(|d| !d.trim().is_empty()),
                    credentials: details.credentials(),
                    tls: details.tls(),
                })
            }
        }
    }
}

fn is_supplied(value: &Value) -> bool {
    !matches!(value, Value::String(s) if s.trim().is_empty())
}

/// A single `host:port` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parse `host:port[;host:port...]`
///
/// The first endpoint is the JDBC endpoint, the second (if any) the SCALA
/// endpoint. Only the shape is checked; hosts are not resolved.
pub fn parse_endpoints(connection: &str) -> ConnectorResult<Vec<Endpoint>> {
    let invalid = |detail: String| {
        ConfigError::new(
            ConfigErrorReason::InvalidConnectionString,
            format!("'{}': {}", connection, detail),
        )
    };

    connection
        .trim()
        .split(';')
        .map(|segment| {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(invalid("empty endpoint".to_string()));
            }
            let (host, port) = segment
                .rsplit_once(':')
                .ok_or_else(|| invalid(format!("endpoint '{}' has no port", segment)))?;
            if host.is_empty() {
                return Err(invalid(format!("endpoint '{}' has no host", segment)));
            }
            let port = port
                .parse::<u16>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| invalid(format!("endpoint '{}' has an invalid port", segment)))?;
            Ok(Endpoint {
                host: host.to_string(),
                port,
            })
        })
        .collect()
}

/// Connection details after the source has been resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub source: ConnectionSource,
    pub endpoints: Vec<Endpoint>,
    /// Database implied by a named service configuration
    pub database: Option<String>,
    pub credentials: Credentials,
    pub tls: TlsMaterial,
}

impl ResolvedConnection {
    /// Normalized endpoint string handed to the operator
    pub fn connection_string(&self) -> String {
        self.endpoints
            .iter()
            .map(Endpoint::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Endpoint used for JDBC (SQL) access
    pub fn jdbc_endpoint(&self) -> &Endpoint {
        // parse_endpoints never yields an empty list
        &self.endpoints[0]
    }
}

/// Property set of a named application configuration
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationConfiguration {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl fmt::Debug for ApplicationConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let properties: BTreeMap<&str, &str> = self
            .properties
            .iter()
            .map(|(k, v)| {
                let shown = if k.ends_with("Password") { "***" } else { v.as_str() };
                (k.as_str(), shown)
            })
            .collect();
        f.debug_struct("ApplicationConfiguration")
            .field("name", &self.name)
            .field("properties", &properties)
            .finish()
    }
}

/// Build the application configuration holding the connection details of a service
///
/// `name` defaults to [`DEFAULT_APP_CONFIG_NAME`]. Registering the configuration
/// with a Streams instance is left to the caller.
pub fn configure_connection(
    details: &ServiceDetails,
    name: Option<&str>,
) -> ConnectorResult<ApplicationConfiguration> {
    let name = name.unwrap_or(DEFAULT_APP_CONFIG_NAME).trim();
    if name.is_empty() {
        return Err(ConfigError::missing("name"));
    }

    let endpoints = parse_endpoints(&details.connection_string)?;
    let connection_string = endpoints
        .iter()
        .map(Endpoint::to_string)
        .collect::<Vec<_>>()
        .join(";");

    let mut properties = BTreeMap::new();
    properties.insert("connectionString".to_string(), connection_string);

    let optional = [
        ("databaseName", &details.database),
        ("eventStoreUser", &details.username),
        ("eventStorePassword", &details.password),
        ("trustStore", &details.truststore_path),
        ("trustStorePassword", &details.truststore_password),
        ("keyStore", &details.keystore_path),
        ("keyStorePassword", &details.keystore_password),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            properties.insert(key.to_string(), value.clone());
        }
    }

    tracing::debug!(
        "Application configuration '{}' carries {} properties",
        name,
        properties.len()
    );

    Ok(ApplicationConfiguration {
        name: name.to_string(),
        properties,
    })
}
