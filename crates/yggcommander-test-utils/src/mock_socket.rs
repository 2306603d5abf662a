//! A scripted stand-in for the Yggdrasil admin socket.
//!
//! [`MockAdminSocket`] binds a Unix listener inside a temp directory, reads
//! one newline-terminated request per connection, records it, and answers
//! with whatever the test's handler returns. After answering it keeps the
//! connection open until the client hangs up, so clients cannot rely on EOF
//! to find the end of a response.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tracing::debug;

/// How the mock answers one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Write this value as compact JSON, without a trailing newline.
    Json(Value),
    /// Write these bytes verbatim.
    Raw(Vec<u8>),
    /// Write `bytes` in `chunk_size` pieces, pausing between pieces.
    Chunked {
        bytes: Vec<u8>,
        chunk_size: usize,
        pause: Duration,
    },
    /// Hold the connection open and never answer.
    Silent,
    /// Hang up without answering.
    Close,
}

impl Reply {
    /// A success response echoing the request's id.
    pub fn result(request: &Value, result: Value) -> Self {
        Self::Json(json!({
            "jsonrpc": "2.0",
            "id": request.get("id").cloned().unwrap_or(Value::Null),
            "result": result,
        }))
    }

    /// An error response echoing the request's id.
    pub fn error(request: &Value, error: Value) -> Self {
        Self::Json(json!({
            "jsonrpc": "2.0",
            "id": request.get("id").cloned().unwrap_or(Value::Null),
            "error": error,
        }))
    }
}

type Handler = dyn Fn(&Value) -> Reply + Send + Sync;

/// A listening mock admin socket. Stops accepting when dropped.
pub struct MockAdminSocket {
    path: PathBuf,
    requests: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
    _temp_dir: TempDir,
}

impl MockAdminSocket {
    /// Start serving, answering each request with `handler(request)`.
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("yggdrasil.sock");
        let listener = UnixListener::bind(&path).expect("failed to bind mock admin socket");

        let handler: Arc<Handler> = Arc::new(handler);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let requests = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve_connection(
                        stream,
                        Arc::clone(&handler),
                        Arc::clone(&requests),
                    ));
                }
            })
        };

        Self {
            path,
            requests,
            task,
            _temp_dir: temp_dir,
        }
    }

    /// Answer every request with the same result payload.
    pub async fn replying(result: Value) -> Self {
        Self::start(move |request| Reply::result(request, result.clone())).await
    }

    /// Answer every request with the same JSON-RPC error object.
    pub async fn failing(error: Value) -> Self {
        Self::start(move |request| Reply::error(request, error.clone())).await
    }

    /// Answer every request with the same scripted reply.
    pub async fn fixed(reply: Reply) -> Self {
        Self::start(move |_| reply.clone()).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every request received so far, parsed as JSON (`null` if unparseable).
    pub fn requests(&self) -> Vec<Value> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .clone()
    }
}

impl Drop for MockAdminSocket {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(
    stream: UnixStream,
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<Value>>>,
) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) | Err(_) => return,
        Ok(_) => {}
    }
    let request: Value = serde_json::from_str(line.trim_end()).unwrap_or(Value::Null);
    debug!(%request, "mock admin socket request");
    requests
        .lock()
        .expect("request log poisoned")
        .push(request.clone());

    match handler(&request) {
        Reply::Json(value) => {
            let bytes = serde_json::to_vec(&value).expect("failed to serialize reply");
            if writer.write_all(&bytes).await.is_err() {
                return;
            }
        }
        Reply::Raw(bytes) => {
            if writer.write_all(&bytes).await.is_err() {
                return;
            }
        }
        Reply::Chunked {
            bytes,
            chunk_size,
            pause,
        } => {
            for piece in bytes.chunks(chunk_size.max(1)) {
                if writer.write_all(piece).await.is_err() || writer.flush().await.is_err() {
                    return;
                }
                tokio::time::sleep(pause).await;
            }
        }
        Reply::Silent => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return;
        }
        Reply::Close => return,
    }
    let _ = writer.flush().await;

    // Wait for the client to hang up.
    let mut rest = String::new();
    let _ = reader.read_line(&mut rest).await;
}
