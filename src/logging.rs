//! Structured logging setup for the `schemaforge` binary.
//!
//! Grounded on the teacher's `logging` module: an `EnvFilter` that defaults
//! to `info`/`warn` (or `debug`/`info` when `--verbose`), with `RUST_LOG`
//! always taking precedence, and a compact `fmt` layer that hides
//! target/file/line unless verbose.

use std::io::IsTerminal;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Whether to emit ANSI color: only when stdout is a TTY and `NO_COLOR` is
/// unset, matching the teacher's `use_color()` heuristic.
#[must_use]
pub fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Installs the global `tracing` subscriber. Safe to call once per process;
/// a second call returns `Ok(())` without replacing the existing subscriber.
pub fn init_tracing(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("schemaforge=debug,info")
            } else {
                EnvFilter::try_new("schemaforge=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_target(verbose)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_ansi(use_color())
        .compact();

    let _ = tracing_subscriber::registry().with(env_filter).with(layer).try_init();
}
