//! Configuration for LIMS input assembly
//!
//! Loaded from YAML. Values may reference environment variables as
//! `${VAR}` or `${VAR:-default}`, which keeps the LIMS password out of the
//! file:
//!
//! ```yaml
//! host: limsdb2
//! port: 5432
//! database: lims2
//! user: limsreader
//! password: ${LIMS_PASSWORD}
//! focal_plane_image_series_id: 1234567
//! image_output_root: /scratch/snap/images
//! ```

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

use lims_rdbc::connection::ConnectionConfig;

/// Pre-compiled regex for environment variable expansion
/// Pattern: ${VAR} or ${VAR:-default}
static ENV_VAR_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("env var regex pattern is invalid - this is a bug")
});

const WRITE_PROBE: &str = ".lims-snap-write-probe";

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML did not match the expected shape
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field has an unusable value
    #[error("invalid config: {0}")]
    Invalid(String),

    /// The image output root cannot be used
    #[error("image output root {} is not usable: {reason}", path.display())]
    OutputRoot { path: PathBuf, reason: String },

    /// Connection parameters could not form a connection URL
    #[error(transparent)]
    Connection(#[from] lims_rdbc::Error),
}

/// Root configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct LimsConfig {
    /// LIMS database host
    pub host: String,

    /// LIMS database port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name
    pub database: String,

    /// Database user
    pub user: String,

    /// Database password
    #[serde(default)]
    pub password: String,

    /// Image series whose inputs are assembled
    pub focal_plane_image_series_id: i64,

    /// Where image copies go; images are skipped when unset
    #[serde(default)]
    pub image_output_root: Option<PathBuf>,

    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-query timeout in milliseconds (0 = none)
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

fn default_port() -> u16 {
    5432
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_query_timeout_ms() -> u64 {
    60_000
}

impl std::fmt::Debug for LimsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimsConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field(
                "focal_plane_image_series_id",
                &self.focal_plane_image_series_id,
            )
            .field("image_output_root", &self.image_output_root)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("query_timeout_ms", &self.query_timeout_ms)
            .finish()
    }
}

impl LimsConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text, expanding environment variables
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let expanded = Self::expand_env_vars(content);
        let config: Self = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Expand environment variables in the format ${VAR} or ${VAR:-default}
    fn expand_env_vars(content: &str) -> String {
        ENV_VAR_REGEX
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                let default = caps.get(2).map(|m| m.as_str());

                std::env::var(var_name).unwrap_or_else(|_| default.unwrap_or("").to_string())
            })
            .to_string()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("'host' must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("'port' must be non-zero".into()));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::Invalid("'database' must not be empty".into()));
        }
        if self.user.trim().is_empty() {
            return Err(ConfigError::Invalid("'user' must not be empty".into()));
        }
        Ok(())
    }

    /// Connection parameters for the LIMS database
    pub fn connection_config(&self) -> Result<ConnectionConfig, ConfigError> {
        Ok(ConnectionConfig::postgres(
            &self.host,
            self.port,
            &self.database,
            &self.user,
            &self.password,
        )?
        .with_connect_timeout(self.connect_timeout_ms)
        .with_query_timeout(self.query_timeout_ms)
        .with_application_name(env!("CARGO_PKG_NAME")))
    }

    /// Create the image output root if needed and check it is writable.
    ///
    /// Returns the directory, or `None` when no output root is configured.
    pub fn prepare_output_root(&self) -> Result<Option<&Path>, ConfigError> {
        let Some(root) = self.image_output_root.as_deref() else {
            return Ok(None);
        };

        let fail = |reason: String| ConfigError::OutputRoot {
            path: root.to_path_buf(),
            reason,
        };

        if root.exists() && !root.is_dir() {
            return Err(fail("exists and is not a directory".into()));
        }
        std::fs::create_dir_all(root).map_err(|e| fail(format!("cannot create: {}", e)))?;

        let probe = root.join(WRITE_PROBE);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&probe)
            .map_err(|e| fail(format!("not writable: {}", e)))?;
        remove_write_probe(&probe);

        Ok(Some(root))
    }
}

/// Delete the writability probe; returns false if it could not be removed
fn remove_write_probe(probe: &Path) -> bool {
    match std::fs::remove_file(probe) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %probe.display(), error = %e, "failed to remove write probe");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "
host: limsdb2
database: lims2
user: limsreader
focal_plane_image_series_id: 42
";

    #[test]
    fn test_defaults() {
        let config = LimsConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.port, 5432);
        assert!(config.password.is_empty());
        assert!(config.image_output_root.is_none());
        assert_eq!(config.connect_timeout_ms, 10_000);
    }

    #[test]
    fn test_env_expansion_default() {
        let expanded = LimsConfig::expand_env_vars(
            "password: ${LIMS_SNAP_TEST_SURELY_UNSET_VAR:-fallback}",
        );
        assert_eq!(expanded, "password: fallback");
    }

    #[test]
    fn test_debug_hides_password() {
        let mut config = LimsConfig::from_yaml(MINIMAL).unwrap();
        config.password = "hunter2".into();
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_missing_series_id_is_parse_error() {
        let err = LimsConfig::from_yaml("host: h\ndatabase: d\nuser: u\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_write_probe_removal_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let probe = dir.path().join(WRITE_PROBE);
        std::fs::create_dir(&probe).unwrap();

        assert!(!remove_write_probe(&probe));
        assert!(probe.is_dir());
    }

    #[test]
    fn test_write_probe_removed() {
        let dir = tempfile::tempdir().unwrap();
        let probe = dir.path().join(WRITE_PROBE);
        std::fs::write(&probe, b"").unwrap();

        assert!(remove_write_probe(&probe));
        assert!(!probe.exists());
    }

    #[test]
    fn test_connection_config_uses_timeouts() {
        let config = LimsConfig::from_yaml(MINIMAL).unwrap();
        let conn = config.connection_config().unwrap();
        assert_eq!(conn.url, "postgres://limsreader@limsdb2:5432/lims2");
        assert_eq!(conn.query_timeout_ms, 60_000);
        assert_eq!(conn.application_name.as_deref(), Some("lims-snap"));
    }
}
