//! Backend health report.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::build_info;

/// Whether the admin socket is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketState {
    Connected,
    Disconnected,
}

/// Health report; checks the socket path only, no RPC is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: String,
    pub yggdrasil_socket: SocketState,
    pub socket_path: PathBuf,
    pub backend_version: String,
    pub build: String,
}

pub fn status_report(socket_path: &Path) -> StatusReport {
    let yggdrasil_socket = if socket_path.exists() {
        SocketState::Connected
    } else {
        SocketState::Disconnected
    };
    StatusReport {
        status: "ok".to_string(),
        yggdrasil_socket,
        socket_path: socket_path.to_path_buf(),
        backend_version: build_info::VERSION.to_string(),
        build: build_info::version_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_disconnected() {
        let report = status_report(Path::new("/nonexistent/yggdrasil.sock"));
        assert_eq!(report.status, "ok");
        assert_eq!(report.yggdrasil_socket, SocketState::Disconnected);
        assert_eq!(report.backend_version, build_info::VERSION);
    }

    #[test]
    fn test_status_connected_when_path_exists() {
        let tmp = tempfile::TempDir::new().unwrap();
        let report = status_report(tmp.path());
        assert_eq!(report.yggdrasil_socket, SocketState::Connected);
    }

    #[test]
    fn test_status_serialization() {
        let report = status_report(Path::new("/nonexistent.sock"));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["yggdrasil_socket"], json!("disconnected"));
        assert_eq!(value["socket_path"], json!("/nonexistent.sock"));
    }
}
