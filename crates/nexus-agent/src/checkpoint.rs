//! Durable per-thread checkpoints
//!
//! Every committed transition of a thread is appended as a
//! [`ThreadCheckpoint`]. Sequences are per thread, start at 1 and only grow.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::state::ConversationState;

/// Checkpoint persistence failures
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid thread id: '{0}'")]
    InvalidThreadId(String),
}

/// One committed state of a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadCheckpoint {
    pub thread_id: String,
    pub sequence: u64,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    pub state: ConversationState,
}

impl ThreadCheckpoint {
    /// Format the created_at timestamp for display
    pub fn created_at_display(&self) -> String {
        use chrono::{TimeZone, Utc};
        Utc.timestamp_millis_opt(self.created_at)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Storage for thread checkpoints
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Commit a state, returning its sequence. The state counts as committed
    /// only once this returns `Ok`.
    async fn append(&self, thread_id: &str, state: &ConversationState)
    -> Result<u64, CheckpointError>;

    /// All checkpoints of a thread, newest first
    async fn list(&self, thread_id: &str) -> Result<Vec<ThreadCheckpoint>, CheckpointError>;

    /// Most recent checkpoint, if any
    async fn latest_checkpoint(
        &self,
        thread_id: &str,
    ) -> Result<Option<ThreadCheckpoint>, CheckpointError> {
        Ok(self.list(thread_id).await?.into_iter().next())
    }

    /// Most recent state, or an empty state for an unknown thread
    async fn latest(&self, thread_id: &str) -> Result<ConversationState, CheckpointError> {
        Ok(self
            .latest_checkpoint(thread_id)
            .await?
            .map(|checkpoint| checkpoint.state)
            .unwrap_or_default())
    }

    /// Remove every checkpoint of a thread
    async fn clear(&self, thread_id: &str) -> Result<(), CheckpointError>;

    /// Ids of threads with at least one checkpoint, sorted
    async fn threads(&self) -> Result<Vec<String>, CheckpointError>;
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    threads: Mutex<HashMap<String, Vec<ThreadCheckpoint>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn append(
        &self,
        thread_id: &str,
        state: &ConversationState,
    ) -> Result<u64, CheckpointError> {
        let mut threads = self.threads.lock();
        let checkpoints = threads.entry(thread_id.to_string()).or_default();
        let sequence = checkpoints.last().map(|c| c.sequence).unwrap_or(0) + 1;
        checkpoints.push(ThreadCheckpoint {
            thread_id: thread_id.to_string(),
            sequence,
            created_at: now_millis(),
            state: state.clone(),
        });
        Ok(sequence)
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<ThreadCheckpoint>, CheckpointError> {
        Ok(self
            .threads
            .lock()
            .get(thread_id)
            .map(|checkpoints| checkpoints.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn latest_checkpoint(
        &self,
        thread_id: &str,
    ) -> Result<Option<ThreadCheckpoint>, CheckpointError> {
        Ok(self
            .threads
            .lock()
            .get(thread_id)
            .and_then(|checkpoints| checkpoints.last().cloned()))
    }

    async fn clear(&self, thread_id: &str) -> Result<(), CheckpointError> {
        self.threads.lock().remove(thread_id);
        Ok(())
    }

    async fn threads(&self) -> Result<Vec<String>, CheckpointError> {
        let mut ids: Vec<String> = self
            .threads
            .lock()
            .iter()
            .filter(|(_, checkpoints)| !checkpoints.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// One JSON Lines file per thread under a directory.
///
/// Each append is flushed and synced to disk before it returns.
#[derive(Debug)]
pub struct JsonlCheckpointStore {
    dir: PathBuf,
    /// Last written sequence per thread; also serializes appends
    sequences: tokio::sync::Mutex<HashMap<String, u64>>,
}

impl JsonlCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sequences: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Get the checkpoint directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Thread ids become file names, so only a safe character set is allowed
    fn path_for(&self, thread_id: &str) -> Result<PathBuf, CheckpointError> {
        let valid = !thread_id.is_empty()
            && !thread_id.starts_with('.')
            && thread_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(CheckpointError::InvalidThreadId(thread_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.jsonl", thread_id)))
    }

    /// Parse a thread file, skipping lines that fail to decode
    async fn read_file(path: &Path) -> Result<Vec<ThreadCheckpoint>, CheckpointError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut checkpoints = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ThreadCheckpoint>(line) {
                Ok(checkpoint) => checkpoints.push(checkpoint),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    line = line_no + 1,
                    "Skipping corrupt checkpoint line: {}",
                    e
                ),
            }
        }
        Ok(checkpoints)
    }
}

#[async_trait]
impl CheckpointStore for JsonlCheckpointStore {
    async fn append(
        &self,
        thread_id: &str,
        state: &ConversationState,
    ) -> Result<u64, CheckpointError> {
        let path = self.path_for(thread_id)?;
        let mut sequences = self.sequences.lock().await;

        let last = match sequences.get(thread_id) {
            Some(last) => *last,
            None => Self::read_file(&path)
                .await?
                .iter()
                .map(|c| c.sequence)
                .max()
                .unwrap_or(0),
        };

        let checkpoint = ThreadCheckpoint {
            thread_id: thread_id.to_string(),
            sequence: last + 1,
            created_at: now_millis(),
            state: state.clone(),
        };
        let mut line = serde_json::to_string(&checkpoint)?;
        line.push('\n');

        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .await?;

        // A write torn by a crash leaves a fragment with no newline. Close it
        // off so the new record starts on its own line.
        if file.metadata().await?.len() > 0 {
            file.seek(SeekFrom::End(-1)).await?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                tracing::warn!(path = %path.display(), "Terminating torn checkpoint line");
                line.insert(0, '\n');
            }
        }
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;

        sequences.insert(thread_id.to_string(), checkpoint.sequence);
        tracing::debug!(thread_id, sequence = checkpoint.sequence, "Checkpoint written");
        Ok(checkpoint.sequence)
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<ThreadCheckpoint>, CheckpointError> {
        let path = self.path_for(thread_id)?;
        let mut checkpoints = Self::read_file(&path).await?;
        checkpoints.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(checkpoints)
    }

    async fn clear(&self, thread_id: &str) -> Result<(), CheckpointError> {
        let path = self.path_for(thread_id)?;
        let mut sequences = self.sequences.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        sequences.remove(thread_id);
        Ok(())
    }

    async fn threads(&self) -> Result<Vec<String>, CheckpointError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Mode;
    use nexus_ai::{Message, ToolCall};
    use serde_json::json;

    fn sample_state() -> ConversationState {
        let mut state = ConversationState::new("/work");
        state.messages.push(Message::user("hi"));
        state.messages.push(Message::assistant_with_tools(
            "checking",
            vec![ToolCall::new("c1", "read_file", json!({"path": "Cargo.toml"}))],
        ));
        state.iteration_count = 2;
        state.approval_granted = Some(false);
        state.pending_approval = true;
        state.current_mode = Mode::Architect;
        state.files_modified.push(PathBuf::from("src/main.rs"));
        state
    }

    async fn exercise_store(store: &dyn CheckpointStore) {
        assert!(store.list("t1").await.unwrap().is_empty());
        assert_eq!(store.latest("t1").await.unwrap(), ConversationState::default());

        let state = sample_state();
        assert_eq!(store.append("t1", &ConversationState::default()).await.unwrap(), 1);
        assert_eq!(store.append("t1", &state).await.unwrap(), 2);
        assert_eq!(store.append("t2", &state).await.unwrap(), 1);

        let restored = store.latest("t1").await.unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.iteration_count, 2);
        assert_eq!(restored.current_mode, Mode::Architect);
        assert_eq!(restored.approval_granted, Some(false));
        assert!(restored.pending_approval);

        let sequences: Vec<u64> = store
            .list("t1")
            .await
            .unwrap()
            .iter()
            .map(|c| c.sequence)
            .collect();
        assert_eq!(sequences, vec![2, 1]);
        assert_eq!(store.threads().await.unwrap(), vec!["t1", "t2"]);

        store.clear("t1").await.unwrap();
        assert!(store.latest_checkpoint("t1").await.unwrap().is_none());
        assert_eq!(store.threads().await.unwrap(), vec!["t2"]);
        assert_eq!(store.append("t1", &state).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_store() {
        exercise_store(&MemoryCheckpointStore::new()).await;
    }

    #[tokio::test]
    async fn test_jsonl_store() {
        let dir = tempfile::tempdir().unwrap();
        exercise_store(&JsonlCheckpointStore::new(dir.path().join("checkpoints"))).await;
    }

    #[tokio::test]
    async fn test_jsonl_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let state = sample_state();
        {
            let store = JsonlCheckpointStore::new(dir.path());
            store.append("proj", &state).await.unwrap();
            store.append("proj", &state).await.unwrap();
        }

        let reopened = JsonlCheckpointStore::new(dir.path());
        assert_eq!(reopened.latest("proj").await.unwrap(), state);
        // sequence continues from the file, not from zero
        assert_eq!(reopened.append("proj", &state).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_jsonl_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlCheckpointStore::new(dir.path());
        store.append("t", &sample_state()).await.unwrap();

        let path = dir.path().join("t.jsonl");
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{not json\n");
        std::fs::write(&path, contents).unwrap();

        let checkpoints = store.list("t").await.unwrap();
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].sequence, 1);
    }

    #[tokio::test]
    async fn test_jsonl_append_after_torn_line() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlCheckpointStore::new(dir.path());
            store.append("t", &ConversationState::default()).await.unwrap();
        }

        let path = dir.path().join("t.jsonl");
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        std::io::Write::write_all(&mut file, br#"{"thread_id":"t","seq"#).unwrap();
        drop(file);

        let reopened = JsonlCheckpointStore::new(dir.path());
        let state = sample_state();
        assert_eq!(reopened.append("t", &state).await.unwrap(), 2);
        assert_eq!(reopened.latest("t").await.unwrap(), state);

        let sequences: Vec<u64> = reopened
            .list("t")
            .await
            .unwrap()
            .iter()
            .map(|c| c.sequence)
            .collect();
        assert_eq!(sequences, vec![2, 1]);

        // the next append lands on a clean line without another repair
        assert_eq!(reopened.append("t", &state).await.unwrap(), 3);
        assert_eq!(reopened.list("t").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_jsonl_rejects_unsafe_thread_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlCheckpointStore::new(dir.path());
        for bad in ["", "../escape", ".hidden", "a/b", "sp ace"] {
            let err = store.append(bad, &ConversationState::default()).await.unwrap_err();
            assert!(matches!(err, CheckpointError::InvalidThreadId(_)), "{}", bad);
        }
        assert!(store.append("my-project_1.0", &ConversationState::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_jsonl_threads_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlCheckpointStore::new(dir.path().join("absent"));
        assert!(store.threads().await.unwrap().is_empty());
    }

    #[test]
    fn test_created_at_display() {
        let checkpoint = ThreadCheckpoint {
            thread_id: "t".into(),
            sequence: 1,
            created_at: 0,
            state: ConversationState::default(),
        };
        assert_eq!(checkpoint.created_at_display(), "1970-01-01 00:00:00");
    }
}
