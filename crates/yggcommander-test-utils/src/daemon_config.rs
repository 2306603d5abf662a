//! Temporary daemon config files.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;
use yggcommander_config::ConfigStore;

/// A daemon config path inside an owned temp directory.
///
/// The directory is deleted when this value is dropped, guaranteeing
/// cleanup even on panic.
pub struct TempDaemonConfig {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TempDaemonConfig {
    /// A path whose file does not exist yet.
    pub fn absent() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("yggdrasil.conf");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// A file containing `value` as JSON.
    pub async fn with_json(value: &Value) -> Self {
        let text = serde_json::to_string_pretty(value).expect("failed to serialize fixture");
        Self::with_text(&text).await
    }

    /// A file containing arbitrary text (TOML, HJSON, garbage...).
    pub async fn with_text(text: &str) -> Self {
        let fixture = Self::absent();
        fixture.write_text(text).await;
        fixture
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(&self.path)
    }

    /// Overwrite the file with new content.
    pub async fn write_text(&self, text: &str) {
        tokio::fs::write(&self.path, text)
            .await
            .expect("failed to write daemon config fixture");
    }

    /// Current file contents parsed as JSON.
    pub async fn read_json(&self) -> Value {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .expect("failed to read daemon config fixture");
        serde_json::from_str(&text).expect("daemon config fixture is not JSON")
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
