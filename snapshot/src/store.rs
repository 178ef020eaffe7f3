use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
};

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

/// Loads and saves one JSON-encoded snapshot at a fixed path.
pub struct SnapshotStore<T> {
    path: PathBuf,
    phantom: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> SnapshotStore<T> {
    pub fn new(directory: impl AsRef<Path>, file_name: &str) -> Self {
        Self {
            path: directory.as_ref().join(file_name),
            phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            debug!("no snapshot at {}", self.path.display());
            return Ok(None);
        }

        let bytes = fs_err::read(&self.path)?;
        let snapshot = serde_json::from_slice(&bytes)?;

        Ok(Some(snapshot))
    }

    pub fn save(&self, snapshot: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec(snapshot)?;
        fs_err::write(&self.path, bytes)?;

        debug!("saved snapshot to {}", self.path.display());

        Ok(())
    }

    /// Removes the snapshot if it exists.
    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            fs_err::remove_file(&self.path)?;
        }

        Ok(())
    }
}
