//! Gatehouse configuration file handling
//!
//! Operator settings only: where to listen, where to keep state, the shared
//! PINs, heuristic markers and log level. Files are TOML; environment
//! variables override whatever the file says.

use gatehouse::access::heuristic::{DEFAULT_DESKTOP_MARKERS, DEFAULT_MOBILE_MARKERS};
use gatehouse::access::{DesktopHeuristic, DeviceHeuristic, Disabled};
use gatehouse::http::Secrets;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Default listen address
const DEFAULT_BIND: &str = "0.0.0.0:8787";

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidOverride { key: &'static str, value: String },

    #[error("invalid bind address '{0}'")]
    InvalidBind(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatehouseConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Shared PINs. Any that is unset makes its gate always refuse.
    #[serde(default)]
    pub secrets: Secrets,

    #[serde(default)]
    pub heuristic: HeuristicConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Take the client address from `X-Forwarded-For`. Only enable behind
    /// a proxy that sets the header.
    #[serde(default)]
    pub trust_proxy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_desktop_markers")]
    pub desktop_markers: Vec<String>,

    #[serde(default = "default_mobile_markers")]
    pub mobile_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive. `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_desktop_markers() -> Vec<String> {
    DEFAULT_DESKTOP_MARKERS.iter().map(|m| m.to_string()).collect()
}

fn default_mobile_markers() -> Vec<String> {
    DEFAULT_MOBILE_MARKERS.iter().map(|m| m.to_string()).collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            trust_proxy: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            desktop_markers: default_desktop_markers(),
            mobile_markers: default_mobile_markers(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl HeuristicConfig {
    pub fn build(&self) -> Arc<dyn DeviceHeuristic> {
        if self.enabled {
            Arc::new(DesktopHeuristic::new(
                &self.desktop_markers,
                &self.mobile_markers,
            ))
        } else {
            Arc::new(Disabled)
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.bind.clone()))
    }
}

impl GatehouseConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `GATEHOUSE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("GATEHOUSE_BIND") {
            self.server.bind = bind;
        }
        if let Some(value) = lookup("GATEHOUSE_TRUST_PROXY") {
            self.server.trust_proxy = parse_bool("GATEHOUSE_TRUST_PROXY", &value)?;
        }
        if let Some(dir) = lookup("GATEHOUSE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(pin) = lookup("GATEHOUSE_ADMIN_PIN") {
            self.secrets.admin_pin = Some(pin);
        }
        if let Some(pin) = lookup("GATEHOUSE_AUTH_PIN") {
            self.secrets.auth_pin = Some(pin);
        }
        if let Some(pin) = lookup("GATEHOUSE_UNBAN_PIN") {
            self.secrets.unban_pin = Some(pin);
        }
        if let Some(level) = lookup("GATEHOUSE_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(data_dir: &Path) -> String {
        let quoted = |markers: &[&str]| {
            markers
                .iter()
                .map(|m| format!("\"{m}\""))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            r#"# Gatehouse Configuration
#
# Every value here can be overridden with a GATEHOUSE_* environment
# variable (GATEHOUSE_BIND, GATEHOUSE_DATA_DIR, GATEHOUSE_ADMIN_PIN, ...).

[server]
# Listen address
bind = "{bind}"

# Read the client address from X-Forwarded-For.
# Only enable behind a reverse proxy that sets the header.
trust_proxy = false

[storage]
# Directory holding access_store.json and site_state.json
data_dir = "{data_dir}"

[secrets]
# Shared PINs. A PIN left unset disables its gate:
# admin routes answer 401, auth and self-unban always refuse.
# admin_pin = "..."
# auth_pin = "..."
# unban_pin = "..."

[heuristic]
# Quarantine unverified clients whose telemetry looks like a desktop browser
enabled = true
desktop_markers = [{desktop}]
mobile_markers = [{mobile}]

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG wins if set)
level = "{level}"
"#,
            bind = DEFAULT_BIND,
            data_dir = data_dir.display(),
            desktop = quoted(DEFAULT_DESKTOP_MARKERS),
            mobile = quoted(DEFAULT_MOBILE_MARKERS),
            level = DEFAULT_LOG_LEVEL,
        )
    }

    /// Write the default configuration file
    pub fn create_default(config_path: &Path, data_dir: &Path) -> Result<(), ConfigError> {
        let contents = Self::generate_default_toml(data_dir);
        let write_err = |source| ConfigError::Write {
            path: config_path.to_path_buf(),
            source,
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(config_path, contents).map_err(write_err)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidOverride {
            key,
            value: value.to_string(),
        }),
    }
}

/// Default data directory: `~/.local/share/gatehouse` on Linux.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gatehouse")
}

/// Default config path, inside the default data directory.
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}
