//! # Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `hoard.toml` (or the file named with `--config`)
//! 3. `HOARD_*` environment variables
//! 4. CLI flags (applied by the `cli` module)
//!
//! ```toml
//! database = "hoard.redb"
//! backend = "redb"
//! host = "127.0.0.1"
//! port = 8080
//! cors_origins = ["http://localhost:5173"]
//! api_key = "change-me"
//! max_archive_bytes = 536870912
//! ```

use clap::ValueEnum;
use hoard_core::{Catalog, HoardError};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "hoard.toml";

/// Default upper bound for an uploaded or imported archive (512 MiB).
pub const DEFAULT_MAX_ARCHIVE_BYTES: usize = 512 * 1024 * 1024;

// =============================================================================
// BACKEND
// =============================================================================

/// Where the catalog keeps its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ACID database file (redb).
    #[default]
    Redb,
    /// Process memory only; nothing survives exit.
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redb => write!(f, "redb"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HoardConfig {
    pub database: PathBuf,
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means localhost only; `["*"]` allows all.
    pub cors_origins: Vec<String>,
    /// When set, every endpoint except `/health` requires this key.
    pub api_key: Option<String>,
    pub max_archive_bytes: usize,
}

impl Default for HoardConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("hoard.redb"),
            backend: Backend::Redb,
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            api_key: None,
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
        }
    }
}

impl HoardConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, HoardError> {
        toml::from_str(text).map_err(|e| HoardError::Validation(format!("invalid config: {}", e)))
    }

    /// Load defaults, then the config file, then the process environment.
    ///
    /// A file named explicitly must exist; the implicit `hoard.toml` is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self, HoardError> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::read_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, HoardError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            HoardError::Io(format!("cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::from_toml_str(&text)
    }

    /// Overlay `HOARD_*` variables read through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), HoardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(database) = get("HOARD_DATABASE") {
            self.database = PathBuf::from(database);
        }
        if let Some(backend) = get("HOARD_BACKEND") {
            self.backend = Backend::from_str(backend.trim(), true).map_err(|_| {
                HoardError::Validation(format!("HOARD_BACKEND: unknown backend '{}'", backend))
            })?;
        }
        if let Some(host) = get("HOARD_HOST") {
            self.host = host;
        }
        if let Some(port) = get("HOARD_PORT") {
            self.port = port.trim().parse().map_err(|_| {
                HoardError::Validation(format!("HOARD_PORT: '{}' is not a port", port))
            })?;
        }
        if let Some(origins) = get("HOARD_CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(key) = get("HOARD_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(limit) = get("HOARD_MAX_ARCHIVE_BYTES") {
            self.max_archive_bytes = limit.trim().parse().map_err(|_| {
                HoardError::Validation(format!(
                    "HOARD_MAX_ARCHIVE_BYTES: '{}' is not a byte count",
                    limit
                ))
            })?;
        }
        Ok(())
    }

    /// The API key, if one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Open the catalog this config describes.
    pub fn open_catalog(&self) -> Result<Catalog, HoardError> {
        match self.backend {
            Backend::Redb => Catalog::with_redb(&self.database),
            Backend::Memory => Ok(Catalog::in_memory()),
        }
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn empty_file_keeps_defaults() {
        let config = HoardConfig::from_toml_str("").expect("parse");
        assert_eq!(config, HoardConfig::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let config = HoardConfig::from_toml_str(
            r#"
            database = "/var/lib/hoard/catalog.redb"
            backend = "memory"
            port = 9090
            cors_origins = ["http://nas.local"]
            "#,
        )
        .expect("parse");
        assert_eq!(config.database, PathBuf::from("/var/lib/hoard/catalog.redb"));
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.cors_origins, vec!["http://nas.local".to_string()]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = HoardConfig::from_toml_str("colour = \"blue\"");
        assert!(matches!(result, Err(HoardError::Validation(_))));
    }

    #[test]
    fn environment_overrides_file() {
        let env: BTreeMap<&str, &str> = [
            ("HOARD_PORT", "7000"),
            ("HOARD_BACKEND", "Memory"),
            ("HOARD_CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("HOARD_API_KEY", ""),
        ]
        .into_iter()
        .collect();

        let mut config = HoardConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| (*v).to_string()))
            .expect("env");

        assert_eq!(config.port, 7000);
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn bad_environment_values_are_errors() {
        let mut config = HoardConfig::default();
        let result = config.apply_env(|key| (key == "HOARD_PORT").then(|| "eighty".to_string()));
        assert!(matches!(result, Err(HoardError::Validation(_))));
    }

    #[test]
    fn memory_backend_opens_empty_catalog() {
        let config = HoardConfig {
            backend: Backend::Memory,
            ..HoardConfig::default()
        };
        let catalog = config.open_catalog().expect("open");
        assert!(!catalog.is_persistent());
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }
}
