//! Gateway process configuration.
//!
//! Values come from an optional file named by `PORTICO_CONFIG` (TOML, JSON or
//! YAML, detected by extension) overlaid with `PORTICO_*` environment
//! variables, e.g. `PORTICO_PORT=8080`. Every field has a default.

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "PORTICO_CONFIG";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "PORTICO";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("config parsing error: {0}")]
    Parse(String),
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Runtime configuration for [`GatewayServer`](crate::server::GatewayServer).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayServerConfig {
    /// TCP port to listen on (default: 3000).
    pub port: u16,
    pub bind_address: String,
    /// JWK set document with the token verification keys. Without one every
    /// token is rejected.
    pub jwks_path: Option<PathBuf>,
    /// Sustained per-route rate for paths without their own policy.
    pub default_rate_per_second: u32,
    /// Per-route burst capacity for paths without their own policy.
    pub default_burst: u32,
    /// Timeout for upstream calls and descriptor fetches.
    pub upstream_timeout_secs: u64,
    pub log_format: LogFormat,
}

impl Default for GatewayServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_address: "0.0.0.0".to_string(),
            jwks_path: None,
            default_rate_per_second: 100,
            default_burst: 200,
            upstream_timeout_secs: 30,
            log_format: LogFormat::Text,
        }
    }
}

impl GatewayServerConfig {
    /// Load from the file named by [`CONFIG_PATH_VAR`], if set, and the
    /// process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
        Self::load_with(file.as_deref(), Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from an optional file overlaid with `env`.
    pub fn load_with(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            let format = detect_format(path)?;
            builder = builder.add_source(File::from(path).format(format));
        }
        builder
            .add_source(env.try_parsing(true))
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn detect_format(path: &Path) -> Result<FileFormat, ConfigError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

    match ext.to_lowercase().as_str() {
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn defaults_without_sources() {
        let cfg = GatewayServerConfig::load_with(None, env(&[])).unwrap();
        assert_eq!(cfg, GatewayServerConfig::default());
        assert_eq!(cfg.listen_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("portico.toml");
        fs::write(
            &path,
            "port = 8081\njwks_path = \"/etc/portico/jwks.json\"\nlog_format = \"json\"\n",
        )
        .unwrap();

        let cfg = GatewayServerConfig::load_with(Some(&path), env(&[])).unwrap();
        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.jwks_path, Some(PathBuf::from("/etc/portico/jwks.json")));
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.default_burst, 200);
    }

    #[test]
    fn environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("portico.json");
        fs::write(&path, r#"{ "port": 8081, "default_burst": 5 }"#).unwrap();

        let cfg = GatewayServerConfig::load_with(
            Some(&path),
            env(&[("PORTICO_PORT", "9090"), ("PORTICO_DEFAULT_RATE_PER_SECOND", "7")]),
        )
        .unwrap();
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.default_rate_per_second, 7);
        assert_eq!(cfg.default_burst, 5);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = GatewayServerConfig::load_with(Some(Path::new("portico.ini")), env(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == "ini"));
    }

    #[test]
    fn bad_value_is_a_parse_error() {
        let cfg = GatewayServerConfig::load_with(None, env(&[("PORTICO_PORT", "not-a-port")]));
        assert!(matches!(cfg, Err(ConfigError::Parse(_))));
    }
}
