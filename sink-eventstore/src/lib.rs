//! Db2 Event Store Sink Connector for Danube Connect
//!
//! This connector prepares the configuration of the external Event Store
//! insert operator. It validates and normalizes the sink parameters, resolves
//! named service configurations, and renders the operator invocation. The
//! batched writes themselves are performed by the operator toolkit.
//!
//! # Features
//!
//! - **Single connection source**: literal `host:port;host:port` endpoints or a
//!   named service config
//! - **Strict flags**: booleans accepted as `true`/`false` values or case-insensitive strings
//! - **Result schemas**: per-row insert flags with schema compatibility checks
//! - **Setup statements**: JDBC statements (e.g. table DDL) run before inserting
//! - **Toolkit location**: local toolkit directory or release URL
//!
//! # Example Configuration
//!
//! ```toml
//! [core]
//! connector_name = "eventstore-sink"
//!
//! [eventstore]
//! input_schema = "tuple<int32 id, rstring name>"
//!
//! [eventstore.insert]
//! table = "SampleTable"
//! schema_name = "sample"
//! config = "eventstore"
//! primary_key = "id"
//! batch_size = 1000
//! ssl_connection = true
//!
//! [services.eventstore]
//! connection_string = "10.0.0.5:18730;10.0.0.5:1101"
//! database = "EVENTDB"
//! username = "admin"
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod insert;
pub mod operator;
pub mod params;
pub mod schema;
pub mod service;
pub mod statement;
pub mod toolkit;

pub use config::EventStoreSinkConfig;
pub use connection::{configure_connection, ApplicationConfiguration, ConnectionSource};
pub use error::{ConfigError, ConfigErrorReason, ConnectorResult};
pub use insert::{InsertConfig, InsertConfigBuilder};
pub use operator::OperatorInvocation;
pub use params::RawParams;
pub use schema::RowSchema;
pub use service::{
    resolve_service_details, resolve_truststore, ServiceDetails, ServiceRegistry, ServiceResolver,
    Truststore,
};
pub use statement::StatementConfig;
pub use toolkit::ToolkitLocation;
