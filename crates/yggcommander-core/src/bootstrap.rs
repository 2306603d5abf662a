//! Peer bootstrap. Pick a handful of public peers and merge them into the
//! daemon config.
//!
//! Peers from preferred regions are used when there are any; otherwise the
//! whole directory is the pool. Selection never fails for lack of peers: a
//! short pool is taken whole.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info};

use yggcommander_config::DaemonConfig;

use crate::directory::PeerDirectory;

/// Peers picked per bootstrap run unless configured otherwise. Also the
/// ceiling: a larger requested count is clamped to it.
pub const DEFAULT_BOOTSTRAP_PEERS: usize = yggcommander_config::MAX_BOOTSTRAP_PEERS;

/// Which part of the directory the candidates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    /// Regions matching a preferred name.
    Preferred,
    /// Every region (no preferred region had peers).
    Fallback,
}

/// Distinct candidate URIs plus where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePool {
    pub kind: PoolKind,
    pub uris: Vec<String>,
}

/// Outcome of selecting and merging peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapSelection {
    pub pool: PoolKind,
    pub pool_size: usize,
    pub selected: Vec<String>,
    /// Selected peers that were not already configured.
    pub added: Vec<String>,
}

/// Build the candidate pool for the given preferred region substrings.
pub fn candidate_pool(directory: &PeerDirectory, preferred: &[String]) -> CandidatePool {
    let needles: Vec<String> = preferred.iter().map(|p| p.to_lowercase()).collect();
    let preferred_uris = distinct_uris(directory.regions().filter(|(region, _)| {
        let region = region.to_lowercase();
        needles.iter().any(|n| region.contains(n.as_str()))
    }));

    if !preferred_uris.is_empty() {
        return CandidatePool {
            kind: PoolKind::Preferred,
            uris: preferred_uris,
        };
    }

    debug!("no peers in preferred regions, falling back to the full directory");
    CandidatePool {
        kind: PoolKind::Fallback,
        uris: distinct_uris(directory.regions()),
    }
}

fn distinct_uris<'a>(regions: impl Iterator<Item = (&'a str, &'a [String])>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut distinct = Vec::new();
    for (_, uris) in regions {
        for uri in uris {
            if seen.insert(uri.as_str()) {
                distinct.push(uri.clone());
            }
        }
    }
    distinct
}

/// Pick `count` URIs uniformly at random without replacement, or the whole
/// pool when it is not larger than `count`.
pub fn select_peers<R: Rng + ?Sized>(pool: &[String], count: usize, rng: &mut R) -> Vec<String> {
    if pool.len() <= count {
        return pool.to_vec();
    }
    pool.choose_multiple(rng, count).cloned().collect()
}

/// Append each selected URI that is not already configured; returns those
/// actually added.
pub fn merge_peers(config: &mut DaemonConfig, selected: &[String]) -> Vec<String> {
    selected
        .iter()
        .filter(|uri| config.add_peer(uri))
        .cloned()
        .collect()
}

/// Select up to `count` peers (never more than [`DEFAULT_BOOTSTRAP_PEERS`])
/// from `directory` and merge them into `config`.
pub fn bootstrap_peers<R: Rng + ?Sized>(
    config: &mut DaemonConfig,
    directory: &PeerDirectory,
    preferred: &[String],
    count: usize,
    rng: &mut R,
) -> BootstrapSelection {
    let count = count.min(DEFAULT_BOOTSTRAP_PEERS);
    let pool = candidate_pool(directory, preferred);
    let selected = select_peers(&pool.uris, count, rng);
    let added = merge_peers(config, &selected);
    info!(
        pool = ?pool.kind,
        pool_size = pool.uris.len(),
        selected = selected.len(),
        added = added.len(),
        "bootstrap selection"
    );
    BootstrapSelection {
        pool: pool.kind,
        pool_size: pool.uris.len(),
        selected,
        added,
    }
}
