//! Named service configurations
//!
//! A named service configuration resolves to the connection string, database,
//! credentials and TLS material of an Event Store instance, so that callers can
//! refer to an instance by name instead of repeating literal values.
//! Registries are usually populated from the `[services.<name>]` tables of the
//! connector configuration file.

use crate::error::{ConfigError, ConnectorResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Connection and credential details of an Event Store service
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDetails {
    /// Endpoint string `<JDBC host:port>;<SCALA host:port>`
    #[serde(alias = "connection", alias = "connectionString")]
    pub connection_string: String,

    #[serde(default, alias = "databaseName", skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default, alias = "user", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, alias = "truststore", skip_serializing_if = "Option::is_none")]
    pub truststore_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truststore_password: Option<String>,

    #[serde(default, alias = "keystore", skip_serializing_if = "Option::is_none")]
    pub keystore_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keystore_password: Option<String>,
}

impl ServiceDetails {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            ..Default::default()
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn tls(&self) -> TlsMaterial {
        TlsMaterial {
            truststore_path: self.truststore_path.clone(),
            truststore_password: self.truststore_password.clone(),
            keystore_path: self.keystore_path.clone(),
            keystore_password: self.keystore_password.clone(),
        }
    }

    /// Truststore used to verify the instance on SSL connections
    ///
    /// The client keystore of an Event Store instance also serves as its
    /// truststore, so the keystore path and password stand in for missing
    /// truststore values.
    pub fn truststore(&self) -> ConnectorResult<Truststore> {
        let path = non_blank(&self.truststore_path)
            .or_else(|| non_blank(&self.keystore_path))
            .ok_or_else(|| ConfigError::missing("truststore_path"))?;
        let password = self
            .truststore_password
            .clone()
            .or_else(|| self.keystore_password.clone());

        Ok(Truststore { path, password })
    }

    fn validate(&self, label: &str) -> ConnectorResult<()> {
        if self.connection_string.trim().is_empty() {
            return Err(ConfigError::service_not_found(format!(
                "service config {} has no connection string",
                label
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDetails")
            .field("connection_string", &self.connection_string)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("truststore_path", &self.truststore_path)
            .field("truststore_password", &redacted(&self.truststore_password))
            .field("keystore_path", &self.keystore_path)
            .field("keystore_password", &redacted(&self.keystore_password))
            .finish()
    }
}

/// Username and password for the Event Store connection
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Overlay explicitly supplied values on top of `self`
    pub fn overridden_by(self, other: Credentials) -> Credentials {
        Credentials {
            username: other.username.or(self.username),
            password: other.password.or(self.password),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .finish()
    }
}

/// Truststore and keystore used for SSL connections
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    pub truststore_path: Option<String>,
    pub truststore_password: Option<String>,
    pub keystore_path: Option<String>,
    pub keystore_password: Option<String>,
}

impl TlsMaterial {
    pub fn overridden_by(self, other: TlsMaterial) -> TlsMaterial {
        TlsMaterial {
            truststore_path: other.truststore_path.or(self.truststore_path),
            truststore_password: other.truststore_password.or(self.truststore_password),
            keystore_path: other.keystore_path.or(self.keystore_path),
            keystore_password: other.keystore_password.or(self.keystore_password),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.truststore_path.is_none()
            && self.truststore_password.is_none()
            && self.keystore_path.is_none()
            && self.keystore_password.is_none()
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("truststore_path", &self.truststore_path)
            .field("truststore_password", &redacted(&self.truststore_password))
            .field("keystore_path", &self.keystore_path)
            .field("keystore_password", &redacted(&self.keystore_password))
            .finish()
    }
}

/// Truststore location and password derived from a service config
#[derive(Clone, PartialEq, Eq)]
pub struct Truststore {
    pub path: String,
    pub password: Option<String>,
}

impl Truststore {
    /// TLS material that only carries this truststore
    pub fn tls(&self) -> TlsMaterial {
        TlsMaterial {
            truststore_path: Some(self.path.clone()),
            truststore_password: self.password.clone(),
            ..Default::default()
        }
    }
}

impl fmt::Debug for Truststore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Truststore")
            .field("path", &self.path)
            .field("password", &redacted(&self.password))
            .finish()
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "***")
}

/// Reference to a service configuration: by name, or given inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceRef {
    Name(String),
    Inline(ServiceDetails),
}

impl ServiceRef {
    /// Interpret a loose `config` parameter value
    pub fn from_value(name: &str, value: &Value) -> ConnectorResult<Self> {
        match value {
            Value::String(s) => Ok(ServiceRef::Name(s.trim().to_string())),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map(ServiceRef::Inline)
                .map_err(|e| {
                    ConfigError::service_not_found(format!(
                        "inline '{}' is not usable: {}",
                        name, e
                    ))
                }),
            _ => Err(ConfigError::invalid_type(
                name,
                "a service config name or a mapping of service details",
            )),
        }
    }

    /// Human-readable label for logs
    pub fn label(&self) -> String {
        match self {
            ServiceRef::Name(name) => format!("'{}'", name),
            ServiceRef::Inline(_) => "<inline>".to_string(),
        }
    }
}

/// Lookup of named service configurations
pub trait ServiceResolver {
    /// Resolve `name` to its service details, or fail with `ServiceConfigNotFound`
    fn resolve(&self, name: &str) -> ConnectorResult<ServiceDetails>;
}

/// In-memory set of named service configurations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceRegistry {
    services: BTreeMap<String, ServiceDetails>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, name: impl Into<String>, details: ServiceDetails) -> Self {
        self.insert(name, details);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, details: ServiceDetails) {
        self.services.insert(name.into(), details);
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ServiceDetails> {
        self.services.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceResolver for ServiceRegistry {
    fn resolve(&self, name: &str) -> ConnectorResult<ServiceDetails> {
        self.services.get(name).cloned().ok_or_else(|| {
            ConfigError::service_not_found(format!(
                "no service config named '{}' (known: {})",
                name,
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

/// Resolve a service reference to its connection and credential details
///
/// Fails with `ServiceConfigNotFound` when the reference is unset, names no
/// known service, or resolves to details without a connection string.
pub fn resolve_service_details(
    reference: Option<&ServiceRef>,
    resolver: &dyn ServiceResolver,
) -> ConnectorResult<ServiceDetails> {
    let details = match reference {
        None => {
            return Err(ConfigError::service_not_found(
                "no service config name was given",
            ))
        }
        Some(ServiceRef::Name(name)) if name.is_empty() => {
            return Err(ConfigError::service_not_found(
                "service config name cannot be empty",
            ))
        }
        Some(ServiceRef::Name(name)) => resolver.resolve(name)?,
        Some(ServiceRef::Inline(details)) => details.clone(),
    };

    let label = reference.map(ServiceRef::label).unwrap_or_default();
    details.validate(&label)?;
    tracing::debug!("Resolved service config {}", label);
    Ok(details)
}

/// Resolve a service reference to the truststore of its instance
///
/// Fails with `ServiceConfigNotFound` like [`resolve_service_details`], and with
/// `MissingParameter` when the service config carries no truststore or keystore.
pub fn resolve_truststore(
    reference: Option<&ServiceRef>,
    resolver: &dyn ServiceResolver,
) -> ConnectorResult<Truststore> {
    let truststore = resolve_service_details(reference, resolver)?.truststore()?;
    tracing::debug!("Using truststore '{}'", truststore.path);
    Ok(truststore)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigErrorReason;
    use serde_json::json;

    fn registry() -> ServiceRegistry {
        ServiceRegistry::new().with_service(
            "eventstore",
            ServiceDetails {
                connection_string: "10.0.0.5:18730;10.0.0.5:1101".to_string(),
                database: Some("EVENTDB".to_string()),
                username: Some("admin".to_string()),
                password: Some("secret".to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_resolve_by_name() {
        let reference = ServiceRef::Name("eventstore".to_string());
        let details = resolve_service_details(Some(&reference), &registry()).unwrap();
        assert_eq!(details.database.as_deref(), Some("EVENTDB"));
        assert_eq!(details.credentials().username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_resolve_unset_or_unknown() {
        for reference in [
            None,
            Some(ServiceRef::Name(String::new())),
            Some(ServiceRef::Name("other".to_string())),
        ] {
            let err = resolve_service_details(reference.as_ref(), &registry()).unwrap_err();
            assert_eq!(err.reason(), ConfigErrorReason::ServiceConfigNotFound);
        }
    }

    #[test]
    fn test_inline_reference_with_aliases() {
        let reference = ServiceRef::from_value(
            "config",
            &json!({
                "connection": "h:1;h:2",
                "databaseName": "db",
                "user": "u",
                "truststore": "/ts.jks"
            }),
        )
        .unwrap();
        let details = resolve_service_details(Some(&reference), &ServiceRegistry::new()).unwrap();
        assert_eq!(details.connection_string, "h:1;h:2");
        assert_eq!(details.tls().truststore_path.as_deref(), Some("/ts.jks"));
    }

    #[test]
    fn test_inline_reference_without_connection() {
        let err = ServiceRef::from_value("config", &json!({ "database": "db" })).unwrap_err();
        assert_eq!(err.reason(), ConfigErrorReason::ServiceConfigNotFound);

        let reference = ServiceRef::Inline(ServiceDetails::new("  "));
        let err = resolve_service_details(Some(&reference), &ServiceRegistry::new()).unwrap_err();
        assert_eq!(err.reason(), ConfigErrorReason::ServiceConfigNotFound);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let details = registry().resolve("eventstore").unwrap();
        let rendered = format!("{:?}", details);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_overlay_prefers_explicit_values() {
        let base = Credentials {
            username: Some("svc".to_string()),
            password: Some("svc-pw".to_string()),
        };
        let merged = base.overridden_by(Credentials {
            username: Some("me".to_string()),
            password: None,
        });
        assert_eq!(merged.username.as_deref(), Some("me"));
        assert_eq!(merged.password.as_deref(), Some("svc-pw"));
    }

    #[test]
    fn test_truststore_prefers_truststore_then_keystore() {
        let details = ServiceDetails {
            truststore_path: Some("/etc/es/truststore.jks".to_string()),
            truststore_password: Some("ts-pw".to_string()),
            keystore_path: Some("/etc/es/clientkeystore".to_string()),
            keystore_password: Some("ks-pw".to_string()),
            ..ServiceDetails::new("h:1")
        };
        let truststore = details.truststore().unwrap();
        assert_eq!(truststore.path, "/etc/es/truststore.jks");
        assert_eq!(truststore.password.as_deref(), Some("ts-pw"));
        assert!(!format!("{:?}", truststore).contains("ts-pw"));

        let keystore_only = ServiceDetails {
            truststore_path: Some(" ".to_string()),
            truststore_password: None,
            ..details
        };
        let truststore = keystore_only.truststore().unwrap();
        assert_eq!(truststore.path, "/etc/es/clientkeystore");
        assert_eq!(truststore.password.as_deref(), Some("ks-pw"));
        assert_eq!(
            truststore.tls().truststore_path.as_deref(),
            Some("/etc/es/clientkeystore")
        );
    }

    #[test]
    fn test_resolve_truststore() {
        let err = resolve_truststore(Some(&ServiceRef::Name("eventstore".to_string())), &registry())
            .unwrap_err();
        assert_eq!(err.reason(), ConfigErrorReason::MissingParameter);

        let mut registry = registry();
        if let Some(details) = registry.get_mut("eventstore") {
            details.keystore_path = Some("/etc/es/clientkeystore".to_string());
        }
        let truststore =
            resolve_truststore(Some(&ServiceRef::Name("eventstore".to_string())), &registry)
                .unwrap();
        assert_eq!(truststore.path, "/etc/es/clientkeystore");

        let err = resolve_truststore(None, &registry).unwrap_err();
        assert_eq!(err.reason(), ConfigErrorReason::ServiceConfigNotFound);
    }
}
