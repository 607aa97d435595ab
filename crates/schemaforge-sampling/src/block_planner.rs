//! C2: deterministic sample-index selection and bounded-memory block
//! buffer streaming.

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use schemaforge_types::SchemaforgeError;

const DEFAULT_BUFFER_LIMIT_BYTES: usize = 1_048_576;

/// One planned line range, before its buffer has been streamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedBlock {
    pub block_id: usize,
    pub start_line: u64,
    pub end_line: u64,
}

/// Builds sampling plans and streams block buffers within a memory cap.
#[derive(Debug, Clone, Copy)]
pub struct BlockPlanner {
    block_size: u64,
    min_gap_lines: u64,
    buffer_limit_bytes: usize,
}

impl BlockPlanner {
    #[must_use]
    pub fn new(block_size: u64, min_gap_lines: u64) -> Self {
        Self {
            block_size: block_size.max(1),
            min_gap_lines: min_gap_lines.max(1),
            buffer_limit_bytes: DEFAULT_BUFFER_LIMIT_BYTES,
        }
    }

    #[must_use]
    pub fn with_buffer_limit(mut self, bytes: usize) -> Self {
        self.buffer_limit_bytes = bytes.max(1);
        self
    }

    /// Produces deterministic, approximately-uniform block coverage over a
    /// file of `total_lines` lines.
    #[must_use]
    pub fn plan(&self, total_lines: u64) -> Vec<PlannedBlock> {
        let indices = self.build_sample_indices(total_lines);
        let mut seen = BTreeSet::new();
        let mut planned = Vec::new();
        for (block_id, idx) in indices.into_iter().enumerate() {
            let (start, end) = self.to_block(idx, total_lines);
            if !seen.insert((start, end)) {
                continue;
            }
            planned.push(PlannedBlock {
                block_id,
                start_line: start,
                end_line: end,
            });
        }
        planned.sort_by_key(|b| b.start_line);
        planned
    }

    /// Single streaming pass over `path`: for each planned block, returns
    /// its (possibly byte-capped, possibly empty) line buffer.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] on read failure.
    pub fn iter_block_buffers(
        &self,
        path: &Utf8Path,
        plan: &[PlannedBlock],
    ) -> Result<Vec<(PlannedBlock, Vec<Vec<u8>>)>, SchemaforgeError> {
        if plan.is_empty() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(path).map_err(|source| SchemaforgeError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let mut results = Vec::with_capacity(plan.len());
        let mut plan_iter = plan.iter().copied().peekable();
        let Some(mut current) = plan_iter.next() else {
            return Ok(results);
        };

        let mut buffer: Vec<Vec<u8>> = Vec::new();
        let mut buffer_bytes = 0usize;
        let mut line_number: u64 = 0;
        let mut raw_line = Vec::new();
        let mut current_flushed = false;
        let mut exhausted = false;

        'outer: loop {
            raw_line.clear();
            let read = reader
                .read_until(b'\n', &mut raw_line)
                .map_err(|source| SchemaforgeError::Io {
                    path: path.to_string(),
                    source,
                })?;
            if read == 0 {
                break;
            }

            while line_number > current.end_line {
                results.push((current, std::mem::take(&mut buffer)));
                buffer_bytes = 0;
                current_flushed = true;
                match plan_iter.next() {
                    Some(next) => {
                        current = next;
                        current_flushed = false;
                    }
                    None => {
                        exhausted = true;
                        break 'outer;
                    }
                }
            }

            if current.start_line <= line_number
                && line_number <= current.end_line
                && buffer_bytes + raw_line.len() <= self.buffer_limit_bytes
            {
                buffer.push(raw_line.clone());
                buffer_bytes += raw_line.len();
            }

            if line_number == current.end_line {
                results.push((current, std::mem::take(&mut buffer)));
                buffer_bytes = 0;
                current_flushed = true;
                match plan_iter.next() {
                    Some(next) => {
                        current = next;
                        current_flushed = false;
                    }
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }

            line_number += 1;
        }

        if !exhausted && !current_flushed {
            results.push((current, buffer));
        }
        for remaining in plan_iter {
            results.push((remaining, Vec::new()));
        }
        Ok(results)
    }

    /// Starts with `{0, total_lines-1}` and repeatedly bisects any gap
    /// exceeding `min_gap_lines` until fixpoint.
    fn build_sample_indices(&self, total_lines: u64) -> Vec<u64> {
        if total_lines == 0 {
            return Vec::new();
        }
        let mut samples: BTreeSet<u64> = BTreeSet::from([0, total_lines.saturating_sub(1)]);
        loop {
            let ordered: Vec<u64> = samples.iter().copied().collect();
            let mut changed = false;
            for pair in ordered.windows(2) {
                let (left, right) = (pair[0], pair[1]);
                if right - left > self.min_gap_lines {
                    let mid = left + (right - left) / 2;
                    if samples.insert(mid) {
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        samples.into_iter().collect()
    }

    /// Expands a sample index into a `[start, end]` range of length
    /// `block_size`, centered on `idx` and clamped to `[0, total_lines-1]`.
    fn to_block(&self, idx: u64, total_lines: u64) -> (u64, u64) {
        let half = self.block_size / 2;
        let total_lines = total_lines.max(1);
        let start = idx.saturating_sub(half);
        let end = (start + self.block_size - 1).min(total_lines - 1);
        let start = end.saturating_sub(self.block_size - 1).max(0);
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_no_blocks() {
        let planner = BlockPlanner::new(10, 5);
        assert!(planner.plan(0).is_empty());
    }

    #[test]
    fn blocks_respect_bounds_and_size() {
        let planner = BlockPlanner::new(20, 3);
        let plan = planner.plan(1000);
        for block in &plan {
            assert!(block.start_line <= block.end_line);
            assert!(block.end_line < 1000);
            assert!(block.end_line - block.start_line + 1 <= 20);
        }
    }

    #[test]
    fn plan_is_deduplicated_and_sorted_by_start() {
        let planner = BlockPlanner::new(5, 2);
        let plan = planner.plan(50);
        let starts: Vec<u64> = plan.iter().map(|b| b.start_line).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);

        let ranges: std::collections::BTreeSet<(u64, u64)> =
            plan.iter().map(|b| (b.start_line, b.end_line)).collect();
        assert_eq!(ranges.len(), plan.len(), "no duplicate (start,end) ranges");
    }

    #[test]
    fn streams_line_buffers_for_each_planned_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8Path::from_path(dir.path()).unwrap().join("f.csv");
        let content: String = (0..100).map(|i| format!("row{i}\n")).collect();
        std::fs::write(&path, content).unwrap();

        let planner = BlockPlanner::new(10, 5);
        let plan = planner.plan(100);
        let streamed = planner.iter_block_buffers(&path, &plan).unwrap();
        assert_eq!(streamed.len(), plan.len());
        for (block, lines) in &streamed {
            assert!(lines.len() as u64 <= block.end_line - block.start_line + 1);
        }
    }
}
