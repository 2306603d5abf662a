//! Public peer directory, the source of bootstrap peers.
//!
//! The directory is fetched over HTTP and treated as untrusted input: a
//! region's entry may be a list of URIs or an object keyed by URI (the
//! public-peers JSON layout), and anything else is ignored.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::BoxFuture;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from obtaining the peer directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("peer directory request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("peer directory is invalid: {0}")]
    Invalid(String),
}

/// Region name to peering URIs, in document order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PeerDirectory {
    regions: Vec<(String, Vec<String>)>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(region, uris)` pairs.
    pub fn from_regions<I, R, U>(regions: I) -> Self
    where
        I: IntoIterator<Item = (R, Vec<U>)>,
        R: Into<String>,
        U: Into<String>,
    {
        Self {
            regions: regions
                .into_iter()
                .map(|(r, uris)| (r.into(), uris.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// Interpret a fetched JSON document.
    pub fn from_json(doc: &Value) -> Result<Self, DirectoryError> {
        let Value::Object(map) = doc else {
            return Err(DirectoryError::Invalid(
                "expected an object of region name to peers".to_string(),
            ));
        };

        let regions = map
            .iter()
            .map(|(region, entry)| {
                let uris: Vec<String> = match entry {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .filter(|uri| !uri.trim().is_empty())
                        .map(str::to_string)
                        .collect(),
                    Value::Object(by_uri) => by_uri
                        .keys()
                        .filter(|uri| !uri.trim().is_empty())
                        .cloned()
                        .collect(),
                    other => {
                        debug!(region = %region, kind = ?other, "ignoring region entry");
                        Vec::new()
                    }
                };
                (region.clone(), uris)
            })
            .collect();

        Ok(Self { regions })
    }

    /// Iterate `(region, uris)` pairs.
    pub fn regions(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.regions
            .iter()
            .map(|(region, uris)| (region.as_str(), uris.as_slice()))
    }

    /// Total number of URI entries across all regions.
    pub fn peer_count(&self) -> usize {
        self.regions.iter().map(|(_, uris)| uris.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.peer_count() == 0
    }
}

/// Anything that can produce a [`PeerDirectory`].
pub trait PeerDirectorySource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<PeerDirectory, DirectoryError>>;
}

/// Fetches the directory with an HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpPeerDirectory {
    url: String,
    client: reqwest::Client,
}

impl HttpPeerDirectory {
    pub fn new(url: impl Into<String>) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PeerDirectorySource for HttpPeerDirectory {
    fn fetch(&self) -> BoxFuture<'_, Result<PeerDirectory, DirectoryError>> {
        Box::pin(async move {
            debug!(url = %self.url, "fetching public peer directory");
            let doc: Value = self
                .client
                .get(&self.url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let directory = PeerDirectory::from_json(&doc)?;
            if directory.is_empty() {
                warn!(url = %self.url, "public peer directory lists no peers");
            }
            Ok(directory)
        })
    }
}

/// A directory already in memory (loaded from a file, or in tests).
#[derive(Debug, Clone, Default)]
pub struct StaticPeerDirectory {
    directory: PeerDirectory,
}

impl StaticPeerDirectory {
    pub fn new(directory: PeerDirectory) -> Self {
        Self { directory }
    }
}

impl PeerDirectorySource for StaticPeerDirectory {
    fn fetch(&self) -> BoxFuture<'_, Result<PeerDirectory, DirectoryError>> {
        Box::pin(async move { Ok(self.directory.clone()) })
    }
}
