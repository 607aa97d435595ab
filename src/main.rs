//! schemaforge CLI binary.
//!
//! This is the minimal entrypoint; all logic lives in the library crate.

fn main() {
    std::process::exit(schemaforge::cli::run());
}
