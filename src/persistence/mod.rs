//! Checkpoint persistence
//!
//! A tiny key/value store of integers. The world writes the player's respawn
//! point when a checkpoint is touched, reads it back when the level loads,
//! and erases it when the exit is reached.
//!
//! Stores:
//! - `MemoryStore`: in-process map, for tests and throwaway runs
//! - `FileStore`: JSON file, rewritten on every change

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Respawn x key
pub const CHECKPOINT_X: &str = "checkpoint_x";
/// Respawn y key
pub const CHECKPOINT_Y: &str = "checkpoint_y";

pub trait CheckpointStore {
    fn read(&self, key: &str) -> Option<i32>;
    fn write(&mut self, key: &str, value: i32) -> Result<(), StoreError>;
    fn erase(&mut self) -> Result<(), StoreError>;

    /// Both respawn coordinates, if a checkpoint was saved
    fn respawn_point(&self) -> Option<(i32, i32)> {
        Some((self.read(CHECKPOINT_X)?, self.read(CHECKPOINT_Y)?))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, i32>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes since creation
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl CheckpointStore for MemoryStore {
    fn read(&self, key: &str) -> Option<i32> {
        self.values.get(key).copied()
    }

    fn write(&mut self, key: &str, value: i32) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        self.writes += 1;
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        self.values.clear();
        Ok(())
    }
}

/// JSON-backed store
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, i32>,
}

impl FileStore {
    /// Open a store, starting empty if the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        log::info!("Opened checkpoint store {} ({} keys)", path.display(), values.len());
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl CheckpointStore for FileStore {
    fn read(&self, key: &str) -> Option<i32> {
        self.values.get(key).copied()
    }

    fn write(&mut self, key: &str, value: i32) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        self.values.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }
}
