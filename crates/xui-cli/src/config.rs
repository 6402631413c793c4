//! `xui.toml` configuration

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use xui_live::NotificationPolicy;
use xui_session::{SessionSchema, DEFAULT_STORAGE_KEY};

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "xui.toml";

/// Configuration loading failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid configuration
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Config file
        path: PathBuf,
        /// Parser error
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XuiConfig {
    /// Session store settings
    pub session: SessionConfig,
    /// Live set settings
    pub live: LiveConfig,
    /// Logging settings
    pub log: LogConfig,
}

impl XuiConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns the parser error for malformed input
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load a config file
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file is unreadable or malformed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `explicit` if given, else `xui.toml` in `dir` if present, else defaults
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a chosen file is unreadable or malformed
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = dir.join(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            Self::load(&fallback)
        } else {
            Ok(Self::default())
        }
    }

    /// With storage directory
    #[inline]
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session.storage_dir = dir.into();
        self
    }

    /// With storage key
    #[inline]
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.session.storage_key = key.into();
        self
    }

    /// With an extra session field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, default: impl Into<Value>) -> Self {
        self.session.defaults.insert(key.into(), default.into());
        self
    }

    /// With log level filter
    #[inline]
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log.level = level.into();
        self
    }

    /// With JSON log output
    #[inline]
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.log.json = json;
        self
    }

    /// Session schema from the configured defaults
    #[must_use]
    pub fn schema(&self) -> SessionSchema {
        SessionSchema::from_defaults(self.session.defaults.clone())
    }
}

/// Session store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory of the file side-store
    pub storage_dir: PathBuf,
    /// Side-store key of the persisted mapping
    pub storage_key: String,
    /// Field defaults; also the closed set of fields
    pub defaults: Map<String, Value>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mut defaults = Map::new();
        defaults.insert("lastAuthenticationTime".to_string(), Value::from(0));
        Self {
            storage_dir: PathBuf::from(".xui"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            defaults,
        }
    }
}

/// Live set settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Push snapshots for additions before `Ready`
    pub emit_before_ready: bool,
    /// Push snapshots for removals
    pub emit_on_removed: bool,
}

impl Default for LiveConfig {
    fn default() -> Self {
        let policy = NotificationPolicy::default();
        Self {
            emit_before_ready: policy.emit_before_ready,
            emit_on_removed: policy.emit_on_removed,
        }
    }
}

impl LiveConfig {
    /// Notification policy for new live sets
    #[must_use]
    pub fn policy(&self) -> NotificationPolicy {
        NotificationPolicy::new()
            .with_emit_before_ready(self.emit_before_ready)
            .with_emit_on_removed(self.emit_on_removed)
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(XuiConfig::from_toml("").unwrap(), XuiConfig::default());
    }

    #[test]
    fn full_file() {
        let config = XuiConfig::from_toml(
            r#"
            [session]
            storage_dir = "/var/lib/xui"
            storage_key = "app"

            [session.defaults]
            lastAuthenticationTime = 0
            theme = "light"
            recent = ["a", "b"]

            [live]
            emit_before_ready = true

            [log]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.session.storage_dir, PathBuf::from("/var/lib/xui"));
        assert_eq!(config.session.storage_key, "app");
        assert_eq!(config.session.defaults.get("recent"), Some(&json!(["a", "b"])));
        assert!(config.live.emit_before_ready);
        assert!(config.live.emit_on_removed);
        assert!(config.log.json);

        let schema = config.schema();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.default_value("theme"), Some(&json!("light")));
    }

    #[test]
    fn unknown_value_type_rejected() {
        assert!(XuiConfig::from_toml("[live]\nemit_on_removed = \"yes\"").is_err());
    }

    #[test]
    fn resolve_prefers_explicit_then_local_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(XuiConfig::resolve(None, dir.path()).unwrap(), XuiConfig::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[log]\nlevel = \"warn\"").unwrap();
        assert_eq!(XuiConfig::resolve(None, dir.path()).unwrap().log.level, "warn");

        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "[log]\njson = true").unwrap();
        let config = XuiConfig::resolve(Some(&explicit), dir.path()).unwrap();
        assert!(config.log.json);
        assert_eq!(config.log.level, "info");

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            XuiConfig::resolve(Some(&missing), dir.path()),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn builder_methods() {
        let config = XuiConfig::new()
            .with_storage_dir("/tmp/x")
            .with_storage_key("k")
            .with_field("theme", "dark")
            .with_log_level("trace")
            .with_json_logs(true);

        assert_eq!(config.session.storage_key, "k");
        assert_eq!(config.schema().default_value("theme"), Some(&json!("dark")));
        assert_eq!(config.log.level, "trace");
    }
}
