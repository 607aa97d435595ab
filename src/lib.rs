//! schemaforge: bounded-memory sampling, header clustering, offset
//! resolution, and chunked/resumable materialization for heterogeneous
//! CSV/TSV files.

pub mod cli;
pub mod error;
pub mod logging;
