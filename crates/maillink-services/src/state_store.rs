//! Durable processing state (`state.json`).
//!
//! Loading never fails: a missing or unreadable file yields the zero state.
//! Saving writes a temporary sibling and renames it over the old file, so
//! a crash mid-write leaves the previous state intact.

use std::path::{Path, PathBuf};

use maillink_types::ProcessingState;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;

/// File-backed [`ProcessingState`] with a read-modify-write lock.
pub struct StateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state, or the zero state if the file is missing or corrupt.
    pub async fn load(&self) -> ProcessingState {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ProcessingState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read state, starting from zero");
                return ProcessingState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt state file, starting from zero");
                ProcessingState::default()
            }
        }
    }

    /// Replace the stored state.
    pub async fn save(&self, state: &ProcessingState) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write(state).await
    }

    /// Load, apply `f`, and save, all under the store's lock. Returns the
    /// state that was written.
    pub async fn update<F>(&self, f: F) -> Result<ProcessingState>
    where
        F: FnOnce(&mut ProcessingState),
    {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await;
        f(&mut state);
        self.write(&state).await?;
        Ok(state)
    }

    async fn write(&self, state: &ProcessingState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string(state)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!(last_uid = state.last_uid, "state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        store.save(&ProcessingState { last_uid: 4242 }).await.unwrap();
        assert_eq!(store.load().await, ProcessingState { last_uid: 4242 });

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"{"last_uid":4242}"#);
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_is_zero_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().await, ProcessingState::default());
    }

    #[tokio::test]
    async fn corrupt_file_is_zero_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{\"last_uid\": \"many\"").unwrap();
        let store = StateStore::new(path);
        assert_eq!(store.load().await, ProcessingState::default());
    }

    #[tokio::test]
    async fn reads_state_written_by_older_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{\"last_uid\": 17, \"note\": \"x\"}").unwrap();
        assert_eq!(StateStore::new(path).load().await.last_uid, 17);
    }

    #[tokio::test]
    async fn concurrent_updates_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::new(dir.path().join("state.json")));

        let mut handles = Vec::new();
        for uid in 1..=20u32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.update(|s| {
                    s.advance(uid);
                })
                .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(store.load().await.last_uid, 20);
    }
}
