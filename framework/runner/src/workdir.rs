use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::ConfigError;

/// Name of the directory under the system temp directory that released working directories are
/// moved into when no trash directory is configured.
const DEFAULT_TRASH_DIR_NAME: &str = "render-tunnel-trash";

/// A working directory exclusively owned by one run.
///
/// The directory is created when the guard is created and released when the guard is released or
/// dropped, whichever comes first. Releasing moves the directory into a trash location so that
/// artifacts can still be recovered after the run.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    keep: bool,
    trash_dir: PathBuf,
    run_id: String,
    released: bool,
}

impl WorkDir {
    /// Create the directory, failing if it already exists.
    ///
    /// Only the final path component is created. The parent must already exist.
    pub fn create(
        path: &Path,
        keep: bool,
        trash_dir: Option<&Path>,
        run_id: &str,
    ) -> anyhow::Result<Self> {
        match std::fs::create_dir(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ConfigError::WorkingDirExists(path.to_path_buf()).into());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to create working directory {}", path.display())
                });
            }
        }

        log::debug!("Created working directory {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            keep,
            trash_dir: trash_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_TRASH_DIR_NAME)),
            run_id: run_id.to_string(),
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the directory now rather than on drop.
    ///
    /// Returns where the directory was moved to, or `None` if it was kept or had to be deleted
    /// permanently.
    pub fn release(mut self) -> anyhow::Result<Option<PathBuf>> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> anyhow::Result<Option<PathBuf>> {
        if self.released {
            return Ok(None);
        }
        self.released = true;

        if self.keep {
            log::info!("Keeping working directory {}", self.path.display());
            return Ok(None);
        }

        if !self.path.exists() {
            log::warn!(
                "Working directory {} was removed before the run finished",
                self.path.display()
            );
            return Ok(None);
        }

        let dir_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workdir".to_string());
        let trash_path = self.trash_dir.join(format!("{dir_name}-{}", self.run_id));

        let moved = std::fs::create_dir_all(&self.trash_dir)
            .and_then(|_| std::fs::rename(&self.path, &trash_path));
        match moved {
            Ok(()) => {
                log::info!(
                    "Moved working directory {} to {}",
                    self.path.display(),
                    trash_path.display()
                );
                Ok(Some(trash_path))
            }
            Err(e) => {
                log::warn!(
                    "Could not move working directory {} to trash, deleting it instead: {e}",
                    self.path.display()
                );
                std::fs::remove_dir_all(&self.path).with_context(|| {
                    format!("Failed to remove working directory {}", self.path.display())
                })?;
                Ok(None)
            }
        }
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            log::error!("Failed to release working directory: {e:?}");
        }
    }
}
