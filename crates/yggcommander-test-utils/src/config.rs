//! Settings builders for tests.
//!
//! Use [`TestConfigBuilder`] to point [`AppConfig`] at temp paths and short
//! timeouts without repeating boilerplate across crate boundaries.

use std::path::Path;

use yggcommander_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// Defaults differ from production: reloading is disabled and the RPC
/// timeout is one second.
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .socket_path(mock.path())
///     .config_path(daemon_config.path())
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.reload.command = Vec::new();
        config.daemon.rpc_timeout_secs = 1;
        Self { config }
    }

    pub fn socket_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.daemon.socket_path = path.as_ref().to_path_buf();
        self
    }

    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.daemon.config_path = path.as_ref().to_path_buf();
        self
    }

    pub fn rpc_timeout_secs(mut self, secs: u64) -> Self {
        self.config.daemon.rpc_timeout_secs = secs;
        self
    }

    pub fn peering_port(mut self, port: u16) -> Self {
        self.config.daemon.peering_port = port;
        self
    }

    pub fn preferred_regions(mut self, regions: &[&str]) -> Self {
        self.config.bootstrap.preferred_regions = regions.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn peer_count(mut self, count: usize) -> Self {
        self.config.bootstrap.peer_count = count;
        self
    }

    pub fn reload_command(mut self, argv: &[&str]) -> Self {
        self.config.reload.command = argv.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
