//! C6: drives C1–C5 across many files with an adaptive-concurrency
//! scheduler, preserving input order regardless of completion order.

use std::collections::VecDeque;
use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use schemaforge_types::{FileBlock, SchemaforgeError};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::block_planner::BlockPlanner;
use crate::line_counter::LineCounter;
use crate::signature_builder::build_signature;

/// Encoding candidates tried in order against the first 4 KiB of a file,
/// and the same pair a block decode retries across on failure.
const ENCODING_CANDIDATES: [&str; 2] = ["utf-8", "windows-1251"];

fn encoding_for_name(name: &str) -> &'static encoding_rs::Encoding {
    if name.eq_ignore_ascii_case("windows-1251") {
        encoding_rs::WINDOWS_1251
    } else {
        encoding_rs::UTF_8
    }
}

/// Attempts UTF-8, then CP1251, on the first 4 KiB of `path`; falls back to
/// `default` if neither decodes cleanly.
pub fn detect_file_encoding(path: &Utf8Path, default: &str) -> Result<String, SchemaforgeError> {
    let mut file = std::fs::File::open(path).map_err(|source| SchemaforgeError::Io {
        path: path.to_string(),
        source,
    })?;
    let mut buf = vec![0u8; 4096];
    let read = file.read(&mut buf).map_err(|source| SchemaforgeError::Io {
        path: path.to_string(),
        source,
    })?;
    if read == 0 {
        return Ok(default.to_string());
    }
    let raw = &buf[..read];

    for candidate in ENCODING_CANDIDATES {
        let (_, _, had_errors) = encoding_for_name(candidate).decode(raw);
        if !had_errors {
            return Ok(candidate.to_string());
        }
    }
    Ok(default.to_string())
}

/// Decodes `raw` as `encoding`. If that decode reports errors, retries once
/// under the other candidate in [`ENCODING_CANDIDATES`] and uses whichever
/// of the two produced fewer replacement characters, without chaining
/// further (per the single-retry encoding fallback policy).
fn decode_block_bytes(raw: &[u8], encoding: &str) -> String {
    let (primary, _, primary_had_errors) = encoding_for_name(encoding).decode(raw);
    if !primary_had_errors {
        return primary.into_owned();
    }

    let fallback_name = ENCODING_CANDIDATES.iter().find(|c| !c.eq_ignore_ascii_case(encoding)).copied().unwrap_or("utf-8");
    let (fallback, _, fallback_had_errors) = encoding_for_name(fallback_name).decode(raw);
    if !fallback_had_errors {
        fallback.into_owned()
    } else {
        primary.into_owned()
    }
}

/// A bounded moving-average throttle that adjusts worker concurrency based
/// on recent per-task durations.
#[derive(Debug)]
pub struct AdaptiveThrottle {
    max_workers: usize,
    min_workers: usize,
    slow_threshold: Duration,
    fast_threshold: Duration,
    samples: VecDeque<Duration>,
    window: usize,
    limit: usize,
}

impl AdaptiveThrottle {
    #[must_use]
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            min_workers: 1,
            slow_threshold: Duration::from_secs_f64(4.0),
            fast_threshold: Duration::from_secs_f64(1.5),
            samples: VecDeque::with_capacity(8),
            window: 8,
            limit: max_workers.max(1),
        }
    }

    /// Records a task duration and adjusts `limit` up or down by one step
    /// based on the moving average against the slow/fast thresholds.
    pub fn report(&mut self, duration: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
        let total: Duration = self.samples.iter().sum();
        let avg = total / self.samples.len() as u32;

        if avg > self.slow_threshold && self.limit > self.min_workers {
            self.limit -= 1;
        } else if avg < self.fast_threshold && self.limit < self.max_workers {
            self.limit += 1;
        }
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.clamp(self.min_workers, self.max_workers)
    }
}

/// Per-file output of the analysis pass.
#[derive(Debug, Clone)]
pub struct FileAnalysisResult {
    pub file_path: Utf8PathBuf,
    pub total_lines: u64,
    pub blocks: Vec<FileBlock>,
}

/// Tuning parameters threaded from the active profile into every file task.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub encoding: String,
    pub block_size: u64,
    pub min_gap_lines: u64,
    pub sample_values_cap: usize,
    pub max_parallel_files: usize,
}

fn analyze_one_file(path: &Utf8Path, settings: &AnalysisSettings) -> Result<FileAnalysisResult, SchemaforgeError> {
    let detected_encoding = detect_file_encoding(path, &settings.encoding)?;
    let total_lines = LineCounter::default().count(path)?;
    let planner = BlockPlanner::new(settings.block_size, settings.min_gap_lines);
    let plan = planner.plan(total_lines);
    if plan.is_empty() {
        return Ok(FileAnalysisResult {
            file_path: path.to_path_buf(),
            total_lines,
            blocks: Vec::new(),
        });
    }

    let streamed = planner.iter_block_buffers(path, &plan)?;
    let mut blocks = Vec::with_capacity(streamed.len());
    for (planned, raw_lines) in streamed {
        let lines: Vec<String> = raw_lines.into_iter().map(|bytes| decode_block_bytes(&bytes, &detected_encoding)).collect();
        let signature = build_signature(&lines, settings.sample_values_cap, &detected_encoding);
        blocks.push(FileBlock {
            file_path: path.to_path_buf(),
            block_id: planned.block_id,
            start_line: planned.start_line,
            end_line: planned.end_line,
            signature,
            schema_id: None,
        });
    }

    Ok(FileAnalysisResult {
        file_path: path.to_path_buf(),
        total_lines,
        blocks,
    })
}

/// Coordinates the analysis pass across multiple files.
///
/// Sequential mode (`max_parallel_files == 1`) bypasses the throttle
/// entirely. Otherwise files are dispatched to `spawn_blocking` tasks
/// gated by a semaphore whose permit count the throttle adjusts after
/// every completion; input order is preserved in the returned vector
/// regardless of completion order.
pub struct AnalysisEngine {
    settings: AnalysisSettings,
}

impl AnalysisEngine {
    #[must_use]
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    /// Runs the analysis pass over `files`.
    ///
    /// # Errors
    /// Propagates the first file-level I/O error encountered; per spec,
    /// an I/O failure is fatal only for the affected file and callers that
    /// want "mark failed, continue" semantics should catch at the call site
    /// per-file rather than batch all files through one `?`.
    pub async fn analyze_files(&self, files: &[Utf8PathBuf]) -> Vec<(Utf8PathBuf, Result<FileAnalysisResult, SchemaforgeError>)> {
        if files.is_empty() {
            return Vec::new();
        }

        let max_workers = self.settings.max_parallel_files.max(1);
        if max_workers == 1 {
            let mut results = Vec::with_capacity(files.len());
            for path in files {
                let result = analyze_one_file(path, &self.settings);
                if let Ok(r) = &result {
                    debug!(file = %path, total_lines = r.total_lines, "analysis-complete");
                }
                results.push((path.clone(), result));
            }
            return results;
        }

        let throttle = Arc::new(tokio::sync::Mutex::new(AdaptiveThrottle::new(max_workers)));
        let semaphore = Arc::new(Semaphore::new(max_workers));
        let mut handles = Vec::with_capacity(files.len());

        for path in files.iter().cloned() {
            let settings = self.settings.clone();
            let throttle = Arc::clone(&throttle);
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
                let start = Instant::now();
                let task_path = path.clone();
                let result = tokio::task::spawn_blocking(move || analyze_one_file(&task_path, &settings))
                    .await
                    .expect("analysis task panicked");
                let duration = start.elapsed();

                let mut guard = throttle.lock().await;
                let before = guard.limit();
                guard.report(duration);
                let after = guard.limit();
                drop(guard);
                match after.cmp(&before) {
                    std::cmp::Ordering::Greater => semaphore.add_permits(after - before),
                    std::cmp::Ordering::Less => permit.forget(),
                    std::cmp::Ordering::Equal => drop(permit),
                }
                (path, result)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.expect("analysis task panicked"));
        }

        info!(file_count = results.len(), "analysis pass complete");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AnalysisSettings {
        AnalysisSettings {
            encoding: "utf-8".to_string(),
            block_size: 10,
            min_gap_lines: 5,
            sample_values_cap: 8,
            max_parallel_files: 1,
        }
    }

    #[test]
    fn decode_block_bytes_retries_under_cp1251_when_utf8_fails() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode("Фамилия,Имя");
        let decoded = decode_block_bytes(&bytes, "utf-8");
        assert_eq!(decoded, "Фамилия,Имя");
    }

    #[test]
    fn decode_block_bytes_uses_detected_encoding_directly() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode("Фамилия,Имя");
        let decoded = decode_block_bytes(&bytes, "windows-1251");
        assert_eq!(decoded, "Фамилия,Имя");
    }

    #[test]
    fn detect_file_encoding_recognizes_cp1251_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("cyrillic.csv");
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode("Фамилия,Имя\n");
        std::fs::write(&path, &*bytes).unwrap();
        let detected = detect_file_encoding(&path, "utf-8").unwrap();
        assert_eq!(detected, "windows-1251");
    }

    #[test]
    fn throttle_decrements_on_sustained_slow_durations() {
        let mut throttle = AdaptiveThrottle::new(4);
        for _ in 0..8 {
            throttle.report(Duration::from_secs_f64(5.0));
        }
        assert!(throttle.limit() < 4);
    }

    #[test]
    fn throttle_increments_on_sustained_fast_durations() {
        let mut throttle = AdaptiveThrottle::new(4);
        throttle.limit = 1;
        for _ in 0..8 {
            throttle.report(Duration::from_secs_f64(0.2));
        }
        assert!(throttle.limit() > 1);
    }

    #[test]
    fn throttle_never_leaves_its_bounds() {
        let mut throttle = AdaptiveThrottle::new(2);
        for _ in 0..50 {
            throttle.report(Duration::from_secs_f64(10.0));
        }
        assert!(throttle.limit() >= 1);
        for _ in 0..50 {
            throttle.report(Duration::from_secs_f64(0.1));
        }
        assert!(throttle.limit() <= 2);
    }

    #[tokio::test]
    async fn sequential_mode_preserves_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let mut files = Vec::new();
        for name in ["a.csv", "b.csv", "c.csv"] {
            let path = root.join(name);
            std::fs::write(&path, "x,y\n1,2\n").unwrap();
            files.push(path);
        }

        let engine = AnalysisEngine::new(settings());
        let results = engine.analyze_files(&files).await;
        let ordered: Vec<&Utf8PathBuf> = results.iter().map(|(path, _)| path).collect();
        assert_eq!(ordered, files.iter().collect::<Vec<_>>());
        for (_, result) in &results {
            assert!(result.is_ok());
        }
    }

    #[test]
    fn empty_file_yields_no_blocks_and_no_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("empty.csv");
        std::fs::write(&path, "").unwrap();
        let result = analyze_one_file(&path, &settings()).unwrap();
        assert_eq!(result.total_lines, 0);
        assert!(result.blocks.is_empty());
    }
}
