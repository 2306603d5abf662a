//! Commander — the operations exposed to front ends (CLI, HTTP handlers).
//!
//! Read-only operations go straight to the admin socket. Mutations follow
//! one sequence: load the daemon config fresh from disk, change it in
//! memory, save it, and only then ask the daemon to reload. Nothing is
//! cached between operations, so concurrent mutations are last-writer-wins.

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use yggcommander_config::{
    AppConfig, BootstrapSettings, ConfigSource, ConfigStore, DaemonConfig, StoreError,
};

use crate::admin::{AdminClient, AdminError, PeerInfo, SelfInfo};
use crate::bootstrap::{self, PoolKind};
use crate::directory::{DirectoryError, HttpPeerDirectory, PeerDirectorySource};
use crate::exit_node::{self, ExitNodeState};
use crate::invite::Invite;
use crate::reload::{self, ReloadOutcome, Reloader};
use crate::status::{self, StatusReport};

/// Errors from a commander operation.
#[derive(Debug, thiserror::Error)]
pub enum CommanderError {
    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl CommanderError {
    /// Short machine-readable failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Admin(e) => e.kind(),
            Self::Store(_) => "io_failure",
            Self::Directory(_) => "directory",
        }
    }
}

/// Result of a bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapOutcome {
    pub status: &'static str,
    pub pool: PoolKind,
    pub peers_added: Vec<String>,
    /// `None` when nothing was added and so nothing was written.
    pub reload: Option<ReloadOutcome>,
}

/// Result of toggling the exit node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitNodeOutcome {
    pub enabled: bool,
    pub state: ExitNodeState,
    pub routing_enabled: bool,
    pub advertised_routes: Vec<String>,
    pub changed: bool,
    /// `None` when the config already matched and was not rewritten.
    pub reload: Option<ReloadOutcome>,
}

/// Result of a persistent peer edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerEditOutcome {
    pub changed: bool,
    pub peers: Vec<String>,
    pub reload: Option<ReloadOutcome>,
}

/// Stateless façade over the admin client, config store, peer directory and
/// reload trigger.
pub struct Commander {
    admin: AdminClient,
    store: ConfigStore,
    directory: Arc<dyn PeerDirectorySource>,
    reloader: Arc<dyn Reloader>,
    bootstrap: BootstrapSettings,
    peering_port: u16,
}

impl Commander {
    pub fn new(
        admin: AdminClient,
        store: ConfigStore,
        directory: Arc<dyn PeerDirectorySource>,
        reloader: Arc<dyn Reloader>,
    ) -> Self {
        let defaults = AppConfig::default();
        Self {
            admin,
            store,
            directory,
            reloader,
            bootstrap: defaults.bootstrap,
            peering_port: defaults.daemon.peering_port,
        }
    }

    /// Wire everything from application settings.
    pub fn from_config(config: &AppConfig) -> Result<Self, CommanderError> {
        let directory = HttpPeerDirectory::new(config.bootstrap.directory_url.clone())?;
        let reloader: Arc<dyn Reloader> = Arc::from(reload::reloader_from_settings(&config.reload));
        Ok(Self::new(
            AdminClient::from_config(config),
            ConfigStore::new(&config.daemon.config_path),
            Arc::new(directory),
            reloader,
        )
        .with_bootstrap_settings(config.bootstrap.clone())
        .with_peering_port(config.daemon.peering_port))
    }

    pub fn with_bootstrap_settings(mut self, settings: BootstrapSettings) -> Self {
        self.bootstrap = settings;
        self
    }

    pub fn with_peering_port(mut self, port: u16) -> Self {
        self.peering_port = port;
        self
    }

    /// Replace the peer directory source (e.g. a file loaded up front).
    pub fn with_directory(mut self, directory: Arc<dyn PeerDirectorySource>) -> Self {
        self.directory = directory;
        self
    }

    pub fn admin(&self) -> &AdminClient {
        &self.admin
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    // ── Live daemon state ──────────────────────────────────────────────

    pub fn status(&self) -> StatusReport {
        status::status_report(self.admin.socket_path())
    }

    pub async fn node_info(&self) -> Result<SelfInfo, CommanderError> {
        Ok(self.admin.get_self().await?)
    }

    pub async fn peers(&self) -> Result<Vec<PeerInfo>, CommanderError> {
        Ok(self.admin.get_peers().await?)
    }

    pub async fn invite(&self) -> Result<Invite, CommanderError> {
        let info = self.admin.get_self().await?;
        Ok(Invite::new(info.address, self.peering_port))
    }

    pub async fn call_raw(
        &self,
        method: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<Value, CommanderError> {
        Ok(self.admin.call(method, params).await?)
    }

    // ── Config mutations ───────────────────────────────────────────────

    pub async fn daemon_config(&self) -> Result<(DaemonConfig, ConfigSource), CommanderError> {
        Ok(self.store.load_with_source().await?)
    }

    /// Bootstrap with the configured regions and a freshly seeded RNG.
    pub async fn bootstrap(&self) -> Result<BootstrapOutcome, CommanderError> {
        let regions = self.bootstrap.preferred_regions.clone();
        let mut rng = StdRng::from_entropy();
        self.bootstrap_with(&regions, &mut rng).await
    }

    /// Fetch the directory, pick peers, and persist the new ones.
    pub async fn bootstrap_with<R>(
        &self,
        preferred_regions: &[String],
        rng: &mut R,
    ) -> Result<BootstrapOutcome, CommanderError>
    where
        R: Rng + Send,
    {
        let directory = self.directory.fetch().await?;
        debug!(peers = directory.peer_count(), "peer directory fetched");

        let mut config = self.store.load().await?;
        let selection = bootstrap::bootstrap_peers(
            &mut config,
            &directory,
            preferred_regions,
            self.bootstrap.peer_count,
            rng,
        );

        let reload = if selection.added.is_empty() {
            info!("bootstrap added no new peers, config left untouched");
            None
        } else {
            Some(self.persist(&config).await?)
        };

        Ok(BootstrapOutcome {
            status: "bootstrapped",
            pool: selection.pool,
            peers_added: selection.added,
            reload,
        })
    }

    /// Turn the exit-node role on or off.
    pub async fn set_exit_node(&self, enabled: bool) -> Result<ExitNodeOutcome, CommanderError> {
        let before = self.store.load().await?;
        let after = exit_node::set_enabled(before.clone(), enabled)?;
        let changed = after != before;

        let reload = if changed {
            Some(self.persist(&after).await?)
        } else {
            info!(enabled, "exit node already in requested state");
            None
        };

        let routing = after.tunnel_routing()?;
        Ok(ExitNodeOutcome {
            enabled,
            state: ExitNodeState::of(&routing),
            routing_enabled: routing.enable,
            advertised_routes: routing.advertised_routes(),
            changed,
            reload,
        })
    }

    /// Persistently add a peer to the daemon config.
    pub async fn add_configured_peer(&self, uri: &str) -> Result<PeerEditOutcome, CommanderError> {
        self.edit_peers(|config| config.add_peer(uri)).await
    }

    /// Persistently remove a peer from the daemon config.
    pub async fn remove_configured_peer(
        &self,
        uri: &str,
    ) -> Result<PeerEditOutcome, CommanderError> {
        self.edit_peers(|config| config.remove_peer(uri)).await
    }

    async fn edit_peers<F>(&self, edit: F) -> Result<PeerEditOutcome, CommanderError>
    where
        F: FnOnce(&mut DaemonConfig) -> bool,
    {
        let mut config = self.store.load().await?;
        let changed = edit(&mut config);
        let reload = if changed {
            Some(self.persist(&config).await?)
        } else {
            None
        };
        Ok(PeerEditOutcome {
            changed,
            peers: config.peers(),
            reload,
        })
    }

    /// Save, then signal. A failed save never reaches the reloader.
    async fn persist(&self, config: &DaemonConfig) -> Result<ReloadOutcome, CommanderError> {
        self.store.save(config).await?;
        Ok(self.reloader.reload().await)
    }
}
