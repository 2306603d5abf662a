//! Config store for the Yggdrasil daemon's own configuration file.
//!
//! The daemon config is treated as an ordered, dynamically-shaped JSON
//! document. Only the two sections this crate reasons about (`Peers` and
//! `TunnelRouting`) get typed accessors; every other key is carried through
//! load and save untouched, in its original position.
//!
//! The store never caches a document between operations: callers load,
//! mutate in memory, and save again for every change.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Top-level key holding the list of peering URIs.
pub const PEERS_KEY: &str = "Peers";

/// Top-level key holding the tunnel routing section.
pub const TUNNEL_ROUTING_KEY: &str = "TunnelRouting";

/// Errors from reading or writing the daemon config file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read daemon config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write daemon config at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize daemon config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("daemon config section {section} is malformed: {source}")]
    Malformed {
        section: &'static str,
        source: serde_json::Error,
    },
}

/// Which parser accepted the file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Strict JSON.
    Json,
    /// TOML, converted into the JSON document model.
    Toml,
    /// File absent or unparseable; the default skeleton was used.
    Skeleton,
}

/// Typed view of the `TunnelRouting` section.
///
/// Route lists that are absent from the file stay `None` so that writing the
/// view back does not invent keys the operator never had.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelRouting {
    #[serde(rename = "Enable", default)]
    pub enable: bool,

    #[serde(
        rename = "IPv6Sources",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ipv6_sources: Option<Vec<String>>,

    #[serde(
        rename = "IPv6Destinations",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ipv6_destinations: Option<Vec<String>>,

    #[serde(
        rename = "IPv4Sources",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ipv4_sources: Option<Vec<String>>,

    #[serde(
        rename = "IPv4Destinations",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ipv4_destinations: Option<Vec<String>>,
}

impl TunnelRouting {
    /// A disabled section with all four route lists present and empty.
    pub fn disabled() -> Self {
        Self {
            enable: false,
            ipv6_sources: Some(Vec::new()),
            ipv6_destinations: Some(Vec::new()),
            ipv4_sources: Some(Vec::new()),
            ipv4_destinations: Some(Vec::new()),
        }
    }

    /// Whether any of the four route lists has at least one entry.
    pub fn has_routes(&self) -> bool {
        [
            &self.ipv6_sources,
            &self.ipv6_destinations,
            &self.ipv4_sources,
            &self.ipv4_destinations,
        ]
        .iter()
        .any(|list| list.as_ref().is_some_and(|l| !l.is_empty()))
    }

    /// Destination routes this node advertises (IPv6 first, then IPv4).
    pub fn advertised_routes(&self) -> Vec<String> {
        self.ipv6_destinations
            .iter()
            .chain(self.ipv4_destinations.iter())
            .flatten()
            .cloned()
            .collect()
    }

    fn write_into(&self, section: &mut Map<String, Value>) {
        section.insert("Enable".to_string(), Value::Bool(self.enable));
        let lists = [
            ("IPv6Sources", &self.ipv6_sources),
            ("IPv6Destinations", &self.ipv6_destinations),
            ("IPv4Sources", &self.ipv4_sources),
            ("IPv4Destinations", &self.ipv4_destinations),
        ];
        for (key, list) in lists {
            if let Some(routes) = list {
                let routes = routes.iter().cloned().map(Value::String).collect();
                section.insert(key.to_string(), Value::Array(routes));
            }
        }
    }
}

/// The daemon configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DaemonConfig {
    doc: Map<String, Value>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::skeleton()
    }
}

impl DaemonConfig {
    /// The document used when no usable file exists: no peers, routing off.
    pub fn skeleton() -> Self {
        let mut doc = Map::new();
        doc.insert(PEERS_KEY.to_string(), Value::Array(Vec::new()));
        let mut routing = Map::new();
        TunnelRouting::disabled().write_into(&mut routing);
        doc.insert(TUNNEL_ROUTING_KEY.to_string(), Value::Object(routing));
        Self { doc }
    }

    /// Wrap an existing JSON object.
    pub fn from_map(doc: Map<String, Value>) -> Self {
        Self { doc }
    }

    /// Parse file contents: strict JSON first, then TOML.
    ///
    /// Returns `None` when neither parser yields a top-level object.
    pub fn parse(text: &str) -> Option<(Self, ConfigSource)> {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(doc)) => return Some((Self { doc }, ConfigSource::Json)),
            Ok(_) => debug!("daemon config is JSON but not an object"),
            Err(e) => debug!(error = %e, "daemon config is not strict JSON"),
        }

        match toml::from_str::<toml::Table>(text) {
            Ok(table) => {
                let doc = table
                    .into_iter()
                    .map(|(k, v)| (k, toml_to_json(v)))
                    .collect();
                Some((Self { doc }, ConfigSource::Toml))
            }
            Err(e) => {
                debug!(error = %e, "daemon config is not TOML");
                None
            }
        }
    }

    /// The underlying document.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.doc
    }

    /// Consume into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.doc)
    }

    /// Look up any top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    /// Configured peering URIs, in file order. Non-string entries are skipped.
    pub fn peers(&self) -> Vec<String> {
        match self.doc.get(PEERS_KEY) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether `uri` is already listed under `Peers`.
    pub fn contains_peer(&self, uri: &str) -> bool {
        match self.doc.get(PEERS_KEY) {
            Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(uri)),
            _ => false,
        }
    }

    /// Append `uri` to `Peers` unless it is already present.
    ///
    /// Returns whether the document changed.
    pub fn add_peer(&mut self, uri: &str) -> bool {
        if self.contains_peer(uri) {
            return false;
        }
        self.ensure_peer_list();
        match self.doc.get_mut(PEERS_KEY) {
            Some(Value::Array(items)) => {
                items.push(Value::String(uri.to_string()));
                true
            }
            _ => false,
        }
    }

    /// Remove every occurrence of `uri` from `Peers`.
    ///
    /// Returns whether the document changed.
    pub fn remove_peer(&mut self, uri: &str) -> bool {
        match self.doc.get_mut(PEERS_KEY) {
            Some(Value::Array(items)) => {
                let before = items.len();
                items.retain(|v| v.as_str() != Some(uri));
                items.len() != before
            }
            _ => false,
        }
    }

    fn ensure_peer_list(&mut self) {
        match self.doc.get(PEERS_KEY) {
            Some(Value::Array(_)) => return,
            Some(other) => warn!(found = %other, "replacing non-list Peers entry"),
            None => {}
        }
        let empty = Value::Array(Vec::new());
        self.doc.insert(PEERS_KEY.to_string(), empty);
    }

    /// Typed view of `TunnelRouting`; a missing section reads as disabled
    /// with no route lists.
    pub fn tunnel_routing(&self) -> Result<TunnelRouting, StoreError> {
        match self.doc.get(TUNNEL_ROUTING_KEY) {
            None | Some(Value::Null) => Ok(TunnelRouting::default()),
            Some(section) => {
                let malformed = |source| StoreError::Malformed {
                    section: TUNNEL_ROUTING_KEY,
                    source,
                };
                serde_json::from_value(section.clone()).map_err(malformed)
            }
        }
    }

    /// Write a routing view back, keeping unknown keys of the section and
    /// the position of keys that already existed.
    pub fn set_tunnel_routing(&mut self, routing: &TunnelRouting) {
        let slot = self
            .doc
            .entry(TUNNEL_ROUTING_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(section) = slot {
            routing.write_into(section);
        }
    }

    /// Pretty-printed JSON, newline-terminated.
    pub fn to_pretty_json(&self) -> Result<String, StoreError> {
        let mut text = serde_json::to_string_pretty(&self.doc)?;
        text.push('\n');
        Ok(text)
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Reads and writes the daemon config file at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document fresh from disk.
    pub async fn load(&self) -> Result<DaemonConfig, StoreError> {
        self.load_with_source().await.map(|(config, _)| config)
    }

    /// Load the document and report which parser accepted it.
    ///
    /// A missing or unparseable file yields the skeleton. Other read
    /// failures (permissions, I/O) are errors.
    pub async fn load_with_source(&self) -> Result<(DaemonConfig, ConfigSource), StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "daemon config not found, using skeleton");
                return Ok((DaemonConfig::skeleton(), ConfigSource::Skeleton));
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let parsed = std::str::from_utf8(&bytes)
            .ok()
            .and_then(DaemonConfig::parse);
        match parsed {
            Some((config, source)) => {
                debug!(path = %self.path.display(), ?source, "loaded daemon config");
                Ok((config, source))
            }
            None => {
                warn!(
                    path = %self.path.display(),
                    "daemon config is neither JSON nor TOML (HJSON comments?), using skeleton; \
                     the next save replaces every key in it, PrivateKey included"
                );
                Ok((DaemonConfig::skeleton(), ConfigSource::Skeleton))
            }
        }
    }

    /// Write the document as pretty JSON, creating parent directories.
    ///
    /// The contents go to a uniquely named sibling temp file first and are
    /// renamed over the target, so readers never observe a half-written file
    /// and concurrent saves never collide. The last rename wins.
    pub async fn save(&self, config: &DaemonConfig) -> Result<(), StoreError> {
        let text = config.to_pretty_json()?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, text.as_bytes()))
            .await
            .map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: std::io::Error::other(e),
            })??;

        info!(path = %self.path.display(), "daemon config written");
        Ok(())
    }
}

/// Atomically replace `path` with `contents`, keeping the old file's mode.
fn replace_file(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(write_err)?;
            parent
        }
        None => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".yggdrasil-conf.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(write_err)?;
    }
    tmp.write_all(contents).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
