//! C16: centralized resource budgeting for materialization jobs.
//!
//! Tracks in-use memory/disk/worker counts against optional ceilings, hands
//! out [`ResourceLease`]s that release their reservation on drop, and owns
//! the scratch-directory tree jobs write spill/checkpoint files into.

use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use schemaforge_types::SchemaforgeError;

/// Optional ceilings; a `None` field means unbounded.
#[derive(Debug, Clone, Default)]
pub struct ResourceLimits {
    pub memory_mb: Option<u64>,
    pub spill_mb: Option<u64>,
    pub max_workers: Option<u32>,
    pub temp_dir: Utf8PathBuf,
}

#[derive(Debug, Default)]
struct Usage {
    memory_mb: u64,
    disk_mb: u64,
    workers: u32,
}

/// Tracks RAM/disk/worker budgets and temp directories for jobs.
#[derive(Clone)]
pub struct ResourceManager {
    limits: ResourceLimits,
    usage: Arc<Mutex<Usage>>,
    temp_root: Utf8PathBuf,
}

impl ResourceManager {
    /// Creates the manager and ensures its scratch-root directory exists.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] if the root cannot be created.
    pub fn new(limits: ResourceLimits) -> Result<Self, SchemaforgeError> {
        let temp_root = if limits.temp_dir.as_str().is_empty() {
            Utf8PathBuf::from(std::env::temp_dir().to_string_lossy().into_owned()).join("schemaforge")
        } else {
            limits.temp_dir.clone()
        };
        std::fs::create_dir_all(&temp_root).map_err(|source| SchemaforgeError::Io {
            path: temp_root.to_string(),
            source,
        })?;
        Ok(Self {
            limits,
            usage: Arc::new(Mutex::new(Usage::default())),
            temp_root,
        })
    }

    /// Clamps a requested worker count into `[1, max_workers]`.
    #[must_use]
    pub fn plan_workers(&self, requested: u32) -> u32 {
        let requested = requested.max(1);
        match self.limits.max_workers {
            Some(limit) if limit > 0 => requested.clamp(1, limit),
            _ => requested,
        }
    }

    /// Reserves memory/disk/worker budget, returning a lease that releases
    /// on drop.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::ResourceLimit`] naming the exhausted
    /// resource if any ceiling would be exceeded.
    pub fn reserve(&self, memory_mb: u64, disk_mb: u64, workers: u32) -> Result<ResourceLease, SchemaforgeError> {
        let mut usage = self.usage.lock().expect("resource usage lock poisoned");
        self.ensure_capacity(&usage, memory_mb, disk_mb, workers)?;
        usage.memory_mb += memory_mb;
        usage.disk_mb += disk_mb;
        usage.workers += workers;
        drop(usage);
        Ok(ResourceLease {
            manager: self.clone(),
            memory_mb,
            disk_mb,
            workers,
            released: false,
        })
    }

    fn ensure_capacity(&self, usage: &Usage, memory_mb: u64, disk_mb: u64, workers: u32) -> Result<(), SchemaforgeError> {
        if let Some(limit) = self.limits.memory_mb {
            if usage.memory_mb + memory_mb > limit {
                return Err(SchemaforgeError::ResourceLimit {
                    resource: "memory_mb".to_string(),
                    requested: memory_mb,
                    available: limit.saturating_sub(usage.memory_mb),
                    limit,
                });
            }
        }
        if let Some(limit) = self.limits.spill_mb {
            if usage.disk_mb + disk_mb > limit {
                return Err(SchemaforgeError::ResourceLimit {
                    resource: "spill_mb".to_string(),
                    requested: disk_mb,
                    available: limit.saturating_sub(usage.disk_mb),
                    limit,
                });
            }
        }
        if let Some(limit) = self.limits.max_workers {
            if usage.workers + workers > limit {
                return Err(SchemaforgeError::ResourceLimit {
                    resource: "workers".to_string(),
                    requested: u64::from(workers),
                    available: u64::from(limit.saturating_sub(usage.workers)),
                    limit: u64::from(limit),
                });
            }
        }
        Ok(())
    }

    fn release(&self, memory_mb: u64, disk_mb: u64, workers: u32) {
        let mut usage = self.usage.lock().expect("resource usage lock poisoned");
        usage.memory_mb = usage.memory_mb.saturating_sub(memory_mb);
        usage.disk_mb = usage.disk_mb.saturating_sub(disk_mb);
        usage.workers = usage.workers.saturating_sub(workers);
    }

    /// Returns (creating if needed) a stable scratch subdirectory for
    /// `job_id`, appending sanitized path segments.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] if the directory cannot be created.
    pub fn scratch_dir(&self, job_id: &str, segments: &[&str]) -> Result<Utf8PathBuf, SchemaforgeError> {
        let mut path = self.temp_root.join(sanitize_segment(job_id));
        for segment in segments {
            if segment.is_empty() {
                continue;
            }
            path = path.join(sanitize_segment(segment));
        }
        std::fs::create_dir_all(&path).map_err(|source| SchemaforgeError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(path)
    }

    /// Removes the entire scratch subtree for `job_id`.
    pub fn cleanup(&self, job_id: &str) {
        let target = self.temp_root.join(sanitize_segment(job_id));
        if target.exists() {
            let _ = std::fs::remove_dir_all(&target);
        }
    }

    #[must_use]
    pub fn available_memory_mb(&self) -> Option<u64> {
        let usage = self.usage.lock().expect("resource usage lock poisoned");
        self.limits.memory_mb.map(|limit| limit.saturating_sub(usage.memory_mb))
    }

    /// Converts a byte count into rounded-up megabytes for spill budgeting.
    #[must_use]
    pub fn disk_mb_from_bytes(byte_count: u64) -> u64 {
        if byte_count == 0 {
            return 0;
        }
        byte_count.div_ceil(1024 * 1024).max(1)
    }
}

/// Returns the sandbox-rooted path for `relative`, rejecting any attempt to
/// escape `root` via `..` segments or an absolute path.
///
/// # Errors
/// Returns [`SchemaforgeError::SandboxEscape`] on an escape attempt.
pub fn resolve_within_sandbox(root: &Utf8Path, relative: &Utf8Path) -> Result<Utf8PathBuf, SchemaforgeError> {
    if relative.is_absolute() {
        return Err(SchemaforgeError::SandboxEscape {
            attempted: relative.to_string(),
        });
    }
    let joined = root.join(relative);
    let mut depth: i64 = 0;
    for component in relative.components() {
        match component {
            camino::Utf8Component::ParentDir => depth -= 1,
            camino::Utf8Component::Normal(_) => depth += 1,
            _ => {}
        }
        if depth < 0 {
            return Err(SchemaforgeError::SandboxEscape {
                attempted: relative.to_string(),
            });
        }
    }
    Ok(joined)
}

/// A granted reservation. Releasing is idempotent and also happens on drop.
pub struct ResourceLease {
    manager: ResourceManager,
    memory_mb: u64,
    disk_mb: u64,
    workers: u32,
    released: bool,
}

impl ResourceLease {
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.manager.release(self.memory_mb, self.disk_mb, self.workers);
        self.released = true;
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        self.release();
    }
}

fn sanitize_segment(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = cleaned.trim_matches('-');
    if slug.is_empty() {
        "segment".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_limits(temp_dir: &Utf8Path) -> ResourceManager {
        ResourceManager::new(ResourceLimits {
            memory_mb: Some(100),
            spill_mb: Some(50),
            max_workers: Some(2),
            temp_dir: temp_dir.to_path_buf(),
        })
        .unwrap()
    }

    #[test]
    fn reservation_exceeding_ceiling_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_limits(Utf8Path::from_path(dir.path()).unwrap());
        let _lease = manager.reserve(80, 0, 0).unwrap();
        let err = manager.reserve(30, 0, 0).unwrap_err();
        assert_eq!(err.category(), schemaforge_types::ErrorCategory::ResourceLimit);
    }

    #[test]
    fn release_on_drop_frees_budget_for_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_limits(Utf8Path::from_path(dir.path()).unwrap());
        {
            let _lease = manager.reserve(90, 0, 0).unwrap();
        }
        assert!(manager.reserve(90, 0, 0).is_ok());
    }

    #[test]
    fn scratch_dir_sanitizes_segments() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_limits(Utf8Path::from_path(dir.path()).unwrap());
        let scratch = manager.scratch_dir("Job ABC!", &["Spill Dir"]).unwrap();
        assert!(scratch.as_str().contains("job-abc"));
        assert!(scratch.as_str().contains("spill-dir"));
        assert!(scratch.exists());
    }

    #[test]
    fn sandbox_escape_via_parent_dir_is_rejected() {
        let root = Utf8PathBuf::from("/sandbox");
        let escape = Utf8PathBuf::from("../../etc/passwd");
        assert!(resolve_within_sandbox(&root, &escape).is_err());
    }

    #[test]
    fn sandbox_allows_ordinary_relative_paths() {
        let root = Utf8PathBuf::from("/sandbox");
        let ok = Utf8PathBuf::from("data/file.csv");
        assert_eq!(resolve_within_sandbox(&root, &ok).unwrap(), Utf8PathBuf::from("/sandbox/data/file.csv"));
    }
}
