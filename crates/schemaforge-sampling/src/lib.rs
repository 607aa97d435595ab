//! Bounded-memory sampling and full-file profiling: line counting, block
//! planning, type classification, signature building, column profiling, and
//! the adaptive-concurrency analysis engine that drives them across files.

pub mod analysis_engine;
pub mod block_planner;
pub mod column_profiler;
pub mod hll;
pub mod line_counter;
pub mod signature_builder;
pub mod type_classifier;

pub use analysis_engine::{AdaptiveThrottle, AnalysisEngine, AnalysisSettings, FileAnalysisResult, detect_file_encoding};
pub use block_planner::{BlockPlanner, PlannedBlock};
pub use column_profiler::profile_file_columns;
pub use hll::HyperLogLogLite;
pub use line_counter::LineCounter;
pub use signature_builder::{build_signature, detect_delimiter};
pub use type_classifier::classify_value;
