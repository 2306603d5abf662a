#![deny(unsafe_code)]

//! Shared test utilities for the YggCommander workspace.
//!
//! Provides a scripted mock admin socket, temporary daemon config files,
//! a recording reloader, settings builders, and tracing helpers so that
//! individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! yggcommander-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod daemon_config;
pub mod mock_socket;
pub mod reloader;
pub mod tracing_setup;

pub use config::TestConfigBuilder;
pub use daemon_config::TempDaemonConfig;
pub use mock_socket::{MockAdminSocket, Reply};
pub use reloader::RecordingReloader;
