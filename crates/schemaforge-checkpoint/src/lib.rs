//! C13: the checkpoint registry. A mapping `(job_id, phase) -> JSON blob`,
//! atomically replaced on save and serialized behind a single in-process
//! lock, so the materialization runner can resume a crashed job from its
//! last flushed block.

use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Stores checkpoint payloads as one JSON file per `(job_id, phase)`.
pub struct CheckpointRegistry {
    base_dir: Utf8PathBuf,
    lock: Mutex<()>,
}

impl CheckpointRegistry {
    #[must_use]
    pub fn new(base_dir: Utf8PathBuf) -> Self {
        Self {
            base_dir,
            lock: Mutex::new(()),
        }
    }

    /// Loads the raw JSON blob for `(job_id, phase)`. Returns an empty
    /// object if the file is missing or unparsable as JSON — a checkpoint
    /// is advisory, never a hard dependency for correctness.
    #[must_use]
    pub fn load(&self, job_id: &str, phase: &str) -> Value {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let path = self.path_for(job_id, phase);
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return Value::Object(serde_json::Map::new());
        };
        serde_json::from_str(&raw).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
    }

    /// Loads and deserializes the checkpoint into `T`, or `None` if absent,
    /// corrupt, or shaped differently than `T` expects.
    #[must_use]
    pub fn load_typed<T: DeserializeOwned>(&self, job_id: &str, phase: &str) -> Option<T> {
        let blob = self.load(job_id, phase);
        if blob.as_object().is_some_and(serde_json::Map::is_empty) {
            return None;
        }
        serde_json::from_value(blob).ok()
    }

    /// Serializes `payload` and atomically replaces the checkpoint file for
    /// `(job_id, phase)` via a write-then-rename into the same directory.
    ///
    /// # Panics
    /// Panics if `payload` cannot be serialized to JSON or the checkpoint
    /// directory cannot be created/written — both indicate a misconfigured
    /// scratch directory rather than a recoverable runtime condition.
    pub fn save<T: Serialize>(&self, job_id: &str, phase: &str, payload: &T) {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let path = self.path_for(job_id, phase);
        let dir = path.parent().expect("checkpoint path always has a parent");
        std::fs::create_dir_all(dir).expect("checkpoint directory is writable");

        let body = serde_json::to_vec_pretty(payload).expect("checkpoint payload is serializable");
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, body).expect("checkpoint scratch write succeeds");
        std::fs::rename(&tmp_path, &path).expect("checkpoint rename succeeds");
    }

    /// Deletes the checkpoint file for `(job_id, phase)`; a no-op if it
    /// doesn't exist.
    pub fn clear(&self, job_id: &str, phase: &str) {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let path = self.path_for(job_id, phase);
        match std::fs::remove_file(&path) {
            Ok(()) | Err(_) if !path.exists() => {}
            Err(source) => tracing::warn!(%path, %source, "failed to clear checkpoint"),
        }
    }

    fn path_for(&self, job_id: &str, phase: &str) -> Utf8PathBuf {
        let safe_phase = phase.replace('/', "_");
        let safe_job = job_id.replace(std::path::MAIN_SEPARATOR, "_");
        self.base_dir.join(safe_phase).join(format!("{safe_job}.json"))
    }
}
