//! CLI-boundary error reporting.
//!
//! Library code returns `Result<_, SchemaforgeError>` and never calls
//! `std::process::exit`; only this boundary (grounded on the teacher's
//! `exit_codes.rs`) maps a final `anyhow::Error` to a process exit code.

use schemaforge_types::SchemaforgeError;

/// Generic CLI failures (bad arguments, missing files) that don't originate
/// from a pipeline crate.
pub const EXIT_CLI_ARGS: i32 = 1;

/// Maps `err` to a process exit code: if it (or one of its sources) is a
/// [`SchemaforgeError`], use `category().exit_code()`; otherwise the
/// generic CLI-args code.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(sf_err) = cause.downcast_ref::<SchemaforgeError>() {
            return sf_err.to_exit_code();
        }
    }
    EXIT_CLI_ARGS
}

/// Renders `err` the way the teacher's `error_reporter` prints a contextual
/// report: top-level message, then each `.context(...)` frame indented.
pub fn render(err: &anyhow::Error) -> String {
    let mut out = format!("error: {err}");
    for cause in err.chain().skip(1) {
        out.push_str(&format!("\n  caused by: {cause}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrelated_errors_map_to_generic_cli_args_code() {
        let err = anyhow::anyhow!("bad flag");
        assert_eq!(exit_code_for(&err), EXIT_CLI_ARGS);
    }

    #[test]
    fn schemaforge_error_maps_through_its_category() {
        let err = anyhow::Error::new(SchemaforgeError::Config {
            path: "x".to_string(),
            reason: "bad".to_string(),
        });
        assert_eq!(exit_code_for(&err), 2);
    }
}
