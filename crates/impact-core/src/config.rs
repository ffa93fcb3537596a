//! Configuration management for the Impact admin console

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Console HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Backend REST API configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Panel polling configuration
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the LMS REST API, without a trailing `/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/// Polling intervals for dashboard panels
///
/// The three tiers mirror how often each kind of data changes upstream:
/// counters every 30 seconds, admin rosters every two minutes, heavy
/// aggregates every five minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Interval for live counters (system stats, users, organizations)
    #[serde(default = "default_fast_seconds")]
    pub fast_seconds: u64,

    /// Interval for rosters (portal admins)
    #[serde(default = "default_standard_seconds")]
    pub standard_seconds: u64,

    /// Interval for aggregates (analytics, organization stats)
    #[serde(default = "default_slow_seconds")]
    pub slow_seconds: u64,

    /// How long a page render waits for a panel's first load
    #[serde(default = "default_first_load_timeout")]
    pub first_load_timeout_ms: u64,

    /// A console view nobody has looked at for this long stops polling
    #[serde(default = "default_view_idle_seconds")]
    pub view_idle_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json or text)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_fast_seconds() -> u64 {
    30
}

const fn default_standard_seconds() -> u64 {
    120
}

const fn default_slow_seconds() -> u64 {
    300
}

const fn default_first_load_timeout() -> u64 {
    1_500
}

const fn default_view_idle_seconds() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            fast_seconds: default_fast_seconds(),
            standard_seconds: default_standard_seconds(),
            slow_seconds: default_slow_seconds(),
            first_load_timeout_ms: default_first_load_timeout(),
            view_idle_seconds: default_view_idle_seconds(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl BackendConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl RefreshConfig {
    /// Get the fast tier as Duration
    #[must_use]
    pub const fn fast(&self) -> Duration {
        Duration::from_secs(self.fast_seconds)
    }

    /// Get the standard tier as Duration
    #[must_use]
    pub const fn standard(&self) -> Duration {
        Duration::from_secs(self.standard_seconds)
    }

    /// Get the slow tier as Duration
    #[must_use]
    pub const fn slow(&self) -> Duration {
        Duration::from_secs(self.slow_seconds)
    }

    /// Get the first-load wait as Duration
    #[must_use]
    pub const fn first_load_timeout(&self) -> Duration {
        Duration::from_millis(self.first_load_timeout_ms)
    }

    /// Get the view idle limit as Duration
    #[must_use]
    pub const fn view_idle(&self) -> Duration {
        Duration::from_secs(self.view_idle_seconds)
    }
}

impl Config {
    /// Load configuration from environment and files
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if a source cannot be parsed
    /// or the merged values fail [`Config::validate`].
    pub fn load() -> crate::Result<Self> {
        Self::load_with(None)
    }

    /// Load configuration, optionally layering an explicit file over the
    /// default `config` and `impact` files
    ///
    /// Environment variables use the `IMPACT_` prefix and `__` between
    /// nested keys, e.g. `IMPACT_BACKEND__BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if a source cannot be parsed
    /// or the merged values fail [`Config::validate`].
    pub fn load_with(file: Option<&Path>) -> crate::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name("impact").required(false));

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("IMPACT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check values that deserialize fine but cannot work at runtime
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] naming the offending key.
    pub fn validate(&self) -> crate::Result<()> {
        let base = self.backend.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(crate::Error::Configuration {
                message: format!("backend.base_url must be an http(s) URL, got '{base}'"),
            });
        }

        let intervals = [
            ("refresh.fast_seconds", self.refresh.fast_seconds),
            ("refresh.standard_seconds", self.refresh.standard_seconds),
            ("refresh.slow_seconds", self.refresh.slow_seconds),
            ("refresh.view_idle_seconds", self.refresh.view_idle_seconds),
        ];
        if let Some((key, _)) = intervals.iter().find(|(_, secs)| *secs == 0) {
            return Err(crate::Error::Configuration {
                message: format!("{key} must be greater than zero"),
            });
        }

        Ok(())
    }

    /// Address the console server binds to
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
#[allow(
    clippy::missing_panics_doc,
    clippy::unwrap_used,
    clippy::field_reassign_with_default
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.backend.base_url, "http://localhost:5000");
        assert_eq!(config.backend.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.refresh.fast(), Duration::from_secs(30));
        assert_eq!(config.refresh.standard(), Duration::from_secs(120));
        assert_eq!(config.refresh.slow(), Duration::from_secs(300));
        assert_eq!(config.refresh.view_idle(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_deserialization() {
        let json = r#"{"backend": {"base_url": "https://lms.example.com"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.backend.base_url, "https://lms.example.com");
        assert_eq!(config.backend.request_timeout_seconds, 30);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.refresh.slow_seconds, 300);
    }

    #[test]
    fn test_validate_rejects_non_http_base_url() {
        let mut config = Config::default();
        config.backend.base_url = "ftp://lms".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backend.base_url"));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.refresh.standard_seconds = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("refresh.standard_seconds"));
    }

    #[test]
    fn test_load_with_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 8088\n\n[backend]\nbase_url = \"https://api.lms.test\"\n\n[refresh]\nfast_seconds = 10"
        )
        .unwrap();

        let config = Config::load_with(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.backend.base_url, "https://api.lms.test");
        assert_eq!(config.refresh.fast_seconds, 10);
        assert_eq!(config.refresh.standard_seconds, 120);
    }

    #[test]
    fn test_bind_address() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9000;
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }
}
