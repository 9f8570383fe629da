//! Persisted sync state: one bookmark per incremental stream
//!
//! The bookmark is a Pacific wall-clock timestamp (`YYYY-MM-DD HH:MM:SS`)
//! marking the end of the most recently fully-processed window. State is
//! flushed durably after every window, so a crash loses at most one window
//! of progress. Writes are atomic (temp file + rename + fsync) and guarded
//! with an advisory lock.

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Bookmark entry for one stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bookmark {
    /// End timestamp of the last fully-processed window
    #[serde(rename = "modifyDate")]
    pub modify_date: String,
}

/// Persisted mapping from stream identifier to bookmark
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    bookmarks: BTreeMap<String, Bookmark>,
}

impl SyncState {
    /// Empty state with no bookmarks
    pub fn new() -> Self {
        Self::default()
    }

    /// Load state from a file; an absent file yields empty state
    pub fn load_or_default(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            debug!(path = %path.display(), "no state file, starting with empty state");
            return Ok(Self::new());
        }
        Self::load(path)
    }

    /// Load state from an existing file, holding a shared lock while reading
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let lock_file = open_lock_file(path)?;
        let lock = RwLock::new(lock_file);
        let _guard = lock
            .read()
            .map_err(|e| StateError::Lock(format!("failed to acquire read lock: {e}")))?;

        let contents =
            std::fs::read_to_string(path).map_err(|e| StateError::Io(e.to_string()))?;
        let state: SyncState = serde_json::from_str(&contents)
            .map_err(|e| StateError::Deserialization(e.to_string()))?;

        info!(
            path = %path.display(),
            bookmarks = state.bookmarks.len(),
            "sync state loaded"
        );
        Ok(state)
    }

    /// Look up the bookmark for a stream
    pub fn bookmark(&self, stream_id: &str) -> Option<&str> {
        self.bookmarks
            .get(stream_id)
            .map(|b| b.modify_date.as_str())
    }

    /// Record a new bookmark for a stream
    pub fn set_bookmark(&mut self, stream_id: &str, value: String) {
        debug!(stream_id, bookmark = %value, "updating bookmark");
        self.bookmarks
            .insert(stream_id.to_string(), Bookmark { modify_date: value });
    }

    /// Durably flush state to `path`
    ///
    /// Writes to a temp file in the same directory, fsyncs it, atomically
    /// renames over the target, then fsyncs the parent directory so the
    /// rename itself is durable.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StateError::Io(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        let lock_file = open_lock_file(path)?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| StateError::Lock(format!("failed to acquire write lock: {e}")))?;

        let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| StateError::Io(format!("failed to create temp file: {e}")))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| StateError::Io(format!("failed to write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| StateError::Io(format!("failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| StateError::Io(format!("failed to sync temp file: {e}")))?;
        temp_file
            .persist(path)
            .map_err(|e| StateError::Io(format!("failed to persist temp file: {e}")))?;

        if let Some(parent) = path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        debug!(
            path = %path.display(),
            bookmarks = self.bookmarks.len(),
            "sync state flushed"
        );
        Ok(())
    }
}

fn open_lock_file(path: &Path) -> Result<std::fs::File, StateError> {
    let lock_path = path.with_extension("lock");
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| StateError::Lock(format!("failed to open lock file: {e}")))
}

/// State store errors
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Lock error
    #[error("lock error: {0}")]
    Lock(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_file_yields_empty_state() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = SyncState::load_or_default(&dir.path().join("state.json")).unwrap();
        assert!(state.bookmark("orders").is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut state = SyncState::new();
        state.set_bookmark("orders", "2023-01-02 00:00:00".to_string());
        state.set_bookmark("shipments", "2023-01-01 00:00:00".to_string());
        state.save(&path).unwrap();

        let loaded = SyncState::load_or_default(&path).unwrap();
        assert_eq!(loaded.bookmark("orders"), Some("2023-01-02 00:00:00"));
        assert_eq!(loaded.bookmark("shipments"), Some("2023-01-01 00:00:00"));
        assert_eq!(loaded.bookmark("stores"), None);
    }

    #[test]
    fn test_bookmark_overwrite_keeps_latest() {
        let mut state = SyncState::new();
        state.set_bookmark("orders", "2023-01-01 00:00:00".to_string());
        state.set_bookmark("orders", "2023-01-02 00:00:00".to_string());
        assert_eq!(state.bookmark("orders"), Some("2023-01-02 00:00:00"));
    }

    #[test]
    fn test_state_file_uses_singer_bookmark_shape() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut state = SyncState::new();
        state.set_bookmark("orders", "2023-01-02 00:00:00".to_string());
        state.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            raw["bookmarks"]["orders"]["modifyDate"],
            "2023-01-02 00:00:00"
        );
    }

    #[test]
    fn test_corrupt_state_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let result = SyncState::load_or_default(&path);
        assert!(matches!(result, Err(StateError::Deserialization(_))));
    }

    #[test]
    fn test_save_overwrites_atomically() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut state = SyncState::new();
        state.set_bookmark("orders", "2023-01-01 00:00:00".to_string());
        state.save(&path).unwrap();
        state.set_bookmark("orders", "2023-01-02 00:00:00".to_string());
        state.save(&path).unwrap();

        let loaded = SyncState::load(&path).unwrap();
        assert_eq!(loaded.bookmark("orders"), Some("2023-01-02 00:00:00"));
    }
}
