//! Operator toolkit location
//!
//! The insert operator ships in an external toolkit. The job packaging step
//! needs either a local toolkit directory or a URL to fetch a release from;
//! fetching itself is not done here.

use crate::error::{ConfigError, ConfigErrorReason, ConnectorResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable naming a local toolkit directory
pub const TOOLKIT_ENV: &str = "STREAMSX_EVENTSTORE_TOOLKIT";

/// Release metadata of the most recent published toolkit
pub const LATEST_RELEASE_URL: &str =
    "https://api.github.com/repos/IBMStreams/streamsx.eventstore/releases/latest";

/// Marker file present at the root of every toolkit directory
const TOOLKIT_MARKER: &str = "toolkit.xml";

/// `[toolkit]` section of the connector configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolkitSettings {
    /// Local toolkit directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Release URL to download the toolkit from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Where the toolkit is taken from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolkitLocation {
    Local(PathBuf),
    Remote(Url),
}

impl ToolkitLocation {
    /// Resolve the toolkit location
    ///
    /// Precedence: configured path, then `STREAMSX_EVENTSTORE_TOOLKIT`, then the
    /// configured URL, then the latest release.
    pub fn resolve(
        settings: &ToolkitSettings,
        env: impl Fn(&str) -> Option<String>,
    ) -> ConnectorResult<Self> {
        if let Some(path) = &settings.path {
            return Self::local(path);
        }

        if let Some(path) = env(TOOLKIT_ENV).filter(|p| !p.trim().is_empty()) {
            tracing::info!("Using toolkit from {}", TOOLKIT_ENV);
            return Self::local(Path::new(path.trim()));
        }

        let url = settings.url.as_deref().unwrap_or(LATEST_RELEASE_URL);
        Self::remote(url)
    }

    fn local(path: &Path) -> ConnectorResult<Self> {
        if !path.join(TOOLKIT_MARKER).is_file() {
            return Err(ConfigError::new(
                ConfigErrorReason::ToolkitNotFound,
                format!("'{}' is not a toolkit directory (no {})", path.display(), TOOLKIT_MARKER),
            ));
        }
        Ok(ToolkitLocation::Local(path.to_path_buf()))
    }

    fn remote(url: &str) -> ConnectorResult<Self> {
        let parsed = Url::parse(url).map_err(|e| {
            ConfigError::new(
                ConfigErrorReason::ToolkitNotFound,
                format!("invalid toolkit URL '{}': {}", url, e),
            )
        })?;

        match parsed.scheme() {
            "http" | "https" => Ok(ToolkitLocation::Remote(parsed)),
            other => Err(ConfigError::new(
                ConfigErrorReason::ToolkitNotFound,
                format!("toolkit URL scheme '{}' is not supported", other),
            )),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ToolkitLocation::Local(_))
    }
}
