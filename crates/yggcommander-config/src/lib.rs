#![deny(unsafe_code)]

//! Configuration for YggCommander.
//!
//! Two kinds of configuration live here:
//!
//! - [`AppConfig`]: YggCommander's own settings, loaded from a TOML file
//!   (socket and config paths, bootstrap directory, reload command, logging).
//! - [`daemon`]: the store for the Yggdrasil daemon's configuration file,
//!   which YggCommander edits on the operator's behalf.

/// Load/save and typed accessors for the Yggdrasil daemon config file.
pub mod daemon;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use daemon::{ConfigSource, ConfigStore, DaemonConfig, StoreError, TunnelRouting};

/// Environment variable overriding [`DaemonSettings::socket_path`].
pub const SOCKET_ENV: &str = "YGGDRASIL_SOCKET";

/// Environment variable overriding [`DaemonSettings::config_path`].
pub const CONFIG_ENV: &str = "YGGDRASIL_CONFIG";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// How to reach the Yggdrasil daemon and its config file.
    #[serde(default)]
    pub daemon: DaemonSettings,

    /// Peer bootstrap policy.
    #[serde(default)]
    pub bootstrap: BootstrapSettings,

    /// Daemon reload trigger.
    #[serde(default)]
    pub reload: ReloadSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Location of the daemon's admin socket and configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSettings {
    /// Path of the admin Unix socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Path of the daemon configuration file.
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    /// Upper bound for a complete admin RPC exchange, in seconds.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// TCP port advertised in invite peering strings.
    #[serde(default = "default_peering_port")]
    pub peering_port: u16,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            config_path: default_config_path(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            peering_port: default_peering_port(),
        }
    }
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/var/run/yggdrasil/yggdrasil.sock")
}

fn default_config_path() -> PathBuf {
    PathBuf::from("/etc/yggdrasil/yggdrasil.conf")
}

fn default_rpc_timeout_secs() -> u64 {
    5
}

fn default_peering_port() -> u16 {
    9001
}

/// Public-peer bootstrap configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSettings {
    /// URL of the public peer directory (`{region: [uri, ...]}` JSON).
    #[serde(default = "default_directory_url")]
    pub directory_url: String,

    /// Region-name substrings preferred when picking peers (case-insensitive).
    #[serde(default = "default_preferred_regions")]
    pub preferred_regions: Vec<String>,

    /// How many peers a bootstrap run picks, at most [`MAX_BOOTSTRAP_PEERS`].
    #[serde(default = "default_peer_count")]
    pub peer_count: usize,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            directory_url: default_directory_url(),
            preferred_regions: default_preferred_regions(),
            peer_count: default_peer_count(),
        }
    }
}

fn default_directory_url() -> String {
    "https://publicpeers.neilalexander.dev/publicnodes.json".to_string()
}

fn default_preferred_regions() -> Vec<String> {
    ["united states", "canada", "germany"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Upper bound on peers added by one bootstrap run.
pub const MAX_BOOTSTRAP_PEERS: usize = 3;

fn default_peer_count() -> usize {
    MAX_BOOTSTRAP_PEERS
}

/// How to ask the daemon to reread its configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadSettings {
    /// Command and arguments to run after every config write.
    /// An empty list disables reloading.
    #[serde(default = "default_reload_command")]
    pub command: Vec<String>,

    /// How long the reload command may run, in seconds.
    #[serde(default = "default_reload_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReloadSettings {
    fn default() -> Self {
        Self {
            command: default_reload_command(),
            timeout_secs: default_reload_timeout_secs(),
        }
    }
}

fn default_reload_command() -> Vec<String> {
    ["systemctl", "reload", "yggdrasil"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_reload_timeout_secs() -> u64 {
    10
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `YGGDRASIL_SOCKET` / `YGGDRASIL_CONFIG` overrides from a lookup
    /// function (normally `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(socket) = lookup(SOCKET_ENV).filter(|s| !s.is_empty()) {
            self.daemon.socket_path = PathBuf::from(socket);
        }
        if let Some(config) = lookup(CONFIG_ENV).filter(|s| !s.is_empty()) {
            self.daemon.config_path = PathBuf::from(config);
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.socket_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "daemon.socket_path must not be empty".to_string(),
            ));
        }
        if self.daemon.config_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "daemon.config_path must not be empty".to_string(),
            ));
        }
        if self.daemon.rpc_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "daemon.rpc_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.daemon.peering_port == 0 {
            return Err(ConfigError::Validation(
                "daemon.peering_port must be non-zero".to_string(),
            ));
        }

        let url = &self.bootstrap.directory_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "bootstrap.directory_url must be an http(s) URL, got {url:?}"
            )));
        }
        if self.bootstrap.peer_count == 0 {
            return Err(ConfigError::Validation(
                "bootstrap.peer_count must be at least 1".to_string(),
            ));
        }
        if self.bootstrap.peer_count > MAX_BOOTSTRAP_PEERS {
            return Err(ConfigError::Validation(format!(
                "bootstrap.peer_count must be at most {MAX_BOOTSTRAP_PEERS}, got {}",
                self.bootstrap.peer_count
            )));
        }
        for (i, region) in self.bootstrap.preferred_regions.iter().enumerate() {
            if region.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "bootstrap.preferred_regions[{i}] must not be empty"
                )));
            }
        }

        if !self.reload.command.is_empty() && self.reload.command[0].trim().is_empty() {
            return Err(ConfigError::Validation(
                "reload.command program must not be empty".to_string(),
            ));
        }
        if self.reload.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "reload.timeout_secs must be non-zero".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}
