#![deny(unsafe_code)]

//! YggCommander core — management of a running Yggdrasil daemon.
//!
//! Talks to the daemon's admin socket for live state, and edits the
//! daemon's configuration file to change peering and routing. Front ends
//! (the CLI, an HTTP layer) drive everything through [`Commander`].

use std::future::Future;
use std::pin::Pin;

/// Boxed `Send` future returned by async trait methods used through
/// `dyn Trait`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Admin socket JSON-RPC client.
pub mod admin;
/// Peer bootstrap selection and merge.
pub mod bootstrap;
/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Operation façade used by front ends.
pub mod commander;
/// Public peer directory sources.
pub mod directory;
/// Exit-node (default route) toggle.
pub mod exit_node;
/// Peering strings for invites.
pub mod invite;
/// Daemon reload trigger.
pub mod reload;
/// Backend health report.
pub mod status;

pub use admin::{AdminClient, AdminError};
pub use commander::{Commander, CommanderError};
pub use directory::{PeerDirectory, PeerDirectorySource};
pub use reload::{ReloadOutcome, Reloader};
