//! Local thumbnail cache: write-once files named after the remote file

use super::files::FileSet;
use crate::error::Result;
use base64::Engine;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Files marked saved in this pass
    pub saved: usize,
    /// Of those, files actually written (the rest already existed)
    pub written: usize,
    /// Files excluded because their thumbnail could not be stored
    pub failed: usize,
    /// Loaded files still waiting for a later pass
    pub remaining: usize,
}

/// Cache path for a remote file name; only the final component is used
pub fn cache_file_path(dir: &Path, name: &str) -> Option<PathBuf> {
    let file_name = Path::new(name).file_name()?;
    Some(dir.join(file_name))
}

/// Sibling the bytes are written to before being renamed into place
fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

enum WriteResult {
    Written,
    Exists,
    Invalid,
}

pub struct ThumbnailCache {
    dir: PathBuf,
    dir_ready: bool,
}

impl ThumbnailCache {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            dir_ready: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        cache_file_path(&self.dir, name)
    }

    async fn ensure_dir(&mut self) -> Result<()> {
        if !self.dir_ready {
            tokio::fs::create_dir_all(&self.dir).await?;
            debug!(path = %self.dir.display(), "Cache directory ready");
            self.dir_ready = true;
        }
        Ok(())
    }

    async fn write_partial(path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// Write `payload` to `path` unless it already exists.
    ///
    /// The final name only ever holds a complete file; an interrupted write
    /// leaves at most the `.part` sibling, which the next attempt replaces.
    async fn write_once(path: &Path, payload: Option<&str>) -> io::Result<WriteResult> {
        if tokio::fs::try_exists(path).await? {
            return Ok(WriteResult::Exists);
        }
        let Some(bytes) = payload.and_then(|p| base64::engine::general_purpose::STANDARD.decode(p).ok())
        else {
            return Ok(WriteResult::Invalid);
        };

        let partial = partial_path(path);
        if let Err(e) = Self::write_partial(&partial, &bytes).await {
            tokio::fs::remove_file(&partial).await.ok();
            return Err(e);
        }
        tokio::fs::rename(&partial, path).await?;
        Ok(WriteResult::Written)
    }

    /// Persist up to `cap` loaded-but-unsaved thumbnails, in set order.
    ///
    /// Existing cache files are never overwritten. A file whose thumbnail
    /// cannot be decoded or written is excluded without stopping the pass.
    /// Only a missing cache directory fails the whole pass.
    pub async fn save_pending(&mut self, files: &mut FileSet, cap: usize) -> Result<SaveOutcome> {
        self.ensure_dir().await?;
        let mut outcome = SaveOutcome::default();

        for file in files.iter_mut() {
            if !file.loaded || file.saved {
                continue;
            }
            if outcome.saved >= cap {
                outcome.remaining += 1;
                continue;
            }

            let result = match self.path_for(&file.name) {
                Some(path) => Self::write_once(&path, file.thumbnail.as_deref()).await,
                None => Ok(WriteResult::Invalid),
            };

            match result {
                Ok(WriteResult::Written) => outcome.written += 1,
                Ok(WriteResult::Exists) => {}
                Ok(WriteResult::Invalid) => {
                    warn!(name = %file.name, "Unusable thumbnail, excluding file");
                    file.exclude();
                    outcome.failed += 1;
                    continue;
                }
                Err(e) => {
                    warn!(name = %file.name, error = %e, "Failed to write thumbnail, excluding file");
                    file.exclude();
                    outcome.failed += 1;
                    continue;
                }
            }
            file.thumbnail = None;
            file.saved = true;
            outcome.saved += 1;
        }

        info!(
            saved = outcome.saved,
            written = outcome.written,
            failed = outcome.failed,
            remaining = outcome.remaining,
            "Thumbnails saved"
        );
        Ok(outcome)
    }
}
