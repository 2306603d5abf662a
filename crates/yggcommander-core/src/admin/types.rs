//! Typed views of admin-socket results.
//!
//! The daemon's result objects vary between releases, so every type keeps
//! fields it does not model in `extra` rather than rejecting them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of `getSelf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfInfo {
    /// The node's Yggdrasil IPv6 address.
    pub address: String,
    /// Hex-encoded public key.
    pub key: String,
    /// Routed /64 subnet.
    #[serde(default)]
    pub subnet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of `getPeers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub inbound: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `getPeers` results come either wrapped (`{"peers": [...]}`) or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PeersResult {
    Wrapped { peers: Vec<PeerInfo> },
    Bare(Vec<PeerInfo>),
}

impl PeersResult {
    pub(crate) fn into_peers(self) -> Vec<PeerInfo> {
        match self {
            Self::Wrapped { peers } | Self::Bare(peers) => peers,
        }
    }
}
