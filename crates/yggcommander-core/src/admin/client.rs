//! Admin socket client: one short-lived Unix socket connection per call.
//!
//! Every call connects, writes a newline-terminated JSON-RPC request, reads
//! until a complete response object has arrived, and drops the connection.
//! No state is carried between calls, so a client can be shared freely.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, warn};

use yggcommander_config::AppConfig;

use super::protocol::{Frame, RpcOutcome, RpcRequest, RpcResponse, decode_response};
use super::types::{PeerInfo, PeersResult, SelfInfo};

/// Bound on a whole exchange (connect, write, read) when none is configured.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Each connection carries exactly one request, so the id never varies.
const REQUEST_ID: u64 = 1;

const READ_CHUNK: usize = 4096;

/// Errors from an admin RPC call.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("admin socket not found at {0}")]
    NotFound(PathBuf),

    #[error("no complete response from {path} within {timeout:?}")]
    Timeout { path: PathBuf, timeout: Duration },

    #[error("transport error on {path}: {reason}")]
    Transport { path: PathBuf, reason: String },

    #[error("daemon returned error: {0}")]
    Protocol(Value),

    #[error("unexpected result for {method}: {reason}")]
    Decode { method: String, reason: String },
}

impl AdminError {
    /// Short machine-readable failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport",
            Self::Protocol(_) => "protocol",
            Self::Decode { .. } => "decode",
        }
    }
}

/// Client for the Yggdrasil admin socket.
#[derive(Debug, Clone)]
pub struct AdminClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl AdminClient {
    /// Create a client targeting the given socket path.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    /// Create a client from application settings.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.daemon.socket_path)
            .with_timeout(Duration::from_secs(config.daemon.rpc_timeout_secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check if the admin socket exists (daemon is likely running).
    pub fn daemon_available(&self) -> bool {
        self.socket_path.exists()
    }

    /// Call `method` and return its `result` payload unchanged.
    pub async fn call(
        &self,
        method: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<Value, AdminError> {
        if !self.daemon_available() {
            return Err(AdminError::NotFound(self.socket_path.clone()));
        }

        let request = RpcRequest::new(REQUEST_ID, method, params);
        let exchange = tokio::time::timeout(self.timeout, self.exchange(&request));
        let Ok(response) = exchange.await else {
            return Err(AdminError::Timeout {
                path: self.socket_path.clone(),
                timeout: self.timeout,
            });
        };
        let response = response?;

        if response.id != Value::from(request.id()) {
            warn!(method, id = %response.id, "admin response id does not match request");
        }

        match response.outcome {
            RpcOutcome::Result(result) => Ok(result),
            RpcOutcome::Error(error) => {
                debug!(method, %error, "daemon reported error");
                Err(AdminError::Protocol(error))
            }
        }
    }

    /// One connection: send the request, read until a full response parses.
    /// The stream is dropped on every return path.
    async fn exchange(&self, request: &RpcRequest) -> Result<RpcResponse, AdminError> {
        let mut stream = match UnixStream::connect(&self.socket_path).await {
            Ok(stream) => stream,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AdminError::NotFound(self.socket_path.clone()));
            }
            Err(e) => return Err(self.transport(format!("connect failed: {e}"))),
        };

        let payload = request
            .encode()
            .map_err(|e| self.transport(format!("failed to encode request: {e}")))?;
        debug!(method = request.method(), bytes = payload.len(), "admin request");

        stream
            .write_all(&payload)
            .await
            .map_err(|e| self.transport(format!("write failed: {e}")))?;
        stream
            .flush()
            .await
            .map_err(|e| self.transport(format!("flush failed: {e}")))?;

        let mut buf = Vec::with_capacity(READ_CHUNK);
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = stream
                .read(&mut chunk)
                .await
                .map_err(|e| self.transport(format!("read failed: {e}")))?;
            if n == 0 {
                return Err(self.transport(format!(
                    "connection closed after {} bytes without a complete response",
                    buf.len()
                )));
            }
            buf.extend_from_slice(&chunk[..n]);

            match decode_response(&buf) {
                Ok(Frame::Complete(response)) => {
                    debug!(method = request.method(), bytes = buf.len(), "admin response");
                    return Ok(response);
                }
                Ok(Frame::Incomplete) => continue,
                Err(e) => return Err(self.transport(e.to_string())),
            }
        }
    }

    fn transport(&self, reason: String) -> AdminError {
        AdminError::Transport {
            path: self.socket_path.clone(),
            reason,
        }
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<T, AdminError> {
        let result = self.call(method, params).await?;
        serde_json::from_value(result).map_err(|e| AdminError::Decode {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }

    // ── Typed API methods ──────────────────────────────────────────────

    /// This node's address, key and subnet.
    pub async fn get_self(&self) -> Result<SelfInfo, AdminError> {
        self.call_typed("getSelf", None).await
    }

    /// Currently connected peers.
    pub async fn get_peers(&self) -> Result<Vec<PeerInfo>, AdminError> {
        self.call_typed::<PeersResult>("getPeers", None)
            .await
            .map(PeersResult::into_peers)
    }

    /// Ask the running daemon to connect to `uri` (not persisted).
    pub async fn add_peer(&self, uri: &str) -> Result<Value, AdminError> {
        self.call("addPeer", Some(uri_params(uri))).await
    }

    /// Ask the running daemon to drop the peer at `uri` (not persisted).
    pub async fn remove_peer(&self, uri: &str) -> Result<Value, AdminError> {
        self.call("removePeer", Some(uri_params(uri))).await
    }
}

fn uri_params(uri: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("uri".to_string(), Value::String(uri.to_string()));
    params
}

/// Single-shot form of [`AdminClient::call`] with the default timeout.
pub async fn call(
    socket_path: &Path,
    method: &str,
    params: Option<Map<String, Value>>,
) -> Result<Value, AdminError> {
    AdminClient::new(socket_path).call(method, params).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = AdminClient::new("/tmp/test-yggcommander.sock");
        assert_eq!(client.timeout(), DEFAULT_RPC_TIMEOUT);
        assert!(!client.daemon_available());
    }

    #[test]
    fn test_client_from_config() {
        let mut config = AppConfig::default();
        config.daemon.socket_path = PathBuf::from("/run/ygg.sock");
        config.daemon.rpc_timeout_secs = 2;
        let client = AdminClient::from_config(&config);
        assert_eq!(client.socket_path(), Path::new("/run/ygg.sock"));
        assert_eq!(client.timeout(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_missing_socket_is_not_found() {
        let client = AdminClient::new("/tmp/nonexistent-yggcommander.sock");
        let result = client.call("getSelf", None).await;
        assert!(matches!(result, Err(AdminError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_free_function_missing_socket() {
        let result = call(Path::new("/nonexistent/dir/ygg.sock"), "getPeers", None).await;
        assert_eq!(result.unwrap_err().kind(), "not_found");
    }

    #[tokio::test]
    async fn test_regular_file_is_transport_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("not-a-socket");
        std::fs::write(&path, b"").unwrap();

        let result = AdminClient::new(&path).call("getSelf", None).await;
        assert!(matches!(result, Err(AdminError::Transport { .. })));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(AdminError::Protocol(Value::Null).kind(), "protocol");
        assert_eq!(
            AdminError::Timeout {
                path: PathBuf::from("/x"),
                timeout: DEFAULT_RPC_TIMEOUT
            }
            .kind(),
            "timeout"
        );
    }
}
