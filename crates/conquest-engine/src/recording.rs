//! Recording capability: where recording bytes come from and go to.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

/// Platform save/load surface, e.g. a file dialog.
#[async_trait]
pub trait RecordingFilePicker: Send + Sync {
    /// Persist `bytes`; `false` if the user cancelled or the write failed.
    async fn save_recording(&self, bytes: Vec<u8>) -> bool;

    /// Bytes of a recording, or `None` if nothing was chosen or it could not be read.
    async fn load_recording(&self) -> Option<Vec<u8>>;
}

/// Reads and writes one fixed path.
#[derive(Clone, Debug)]
pub struct FileRecordingPicker {
    path: PathBuf,
}

impl FileRecordingPicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordingFilePicker for FileRecordingPicker {
    async fn save_recording(&self, bytes: Vec<u8>) -> bool {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                warn!(path = %parent.display(), error = %err, "cannot create recording directory");
                return false;
            }
        }
        match tokio::fs::write(&self.path, &bytes).await {
            Ok(()) => {
                info!(path = %self.path.display(), bytes = bytes.len(), "recording saved");
                true
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "recording save failed");
                false
            }
        }
    }

    async fn load_recording(&self) -> Option<Vec<u8>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "recording load failed");
                None
            }
        }
    }
}
