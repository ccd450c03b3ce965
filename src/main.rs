//! aasregistry CLI entry point
//!
//! Delegates everything to [`aasregistry::cli::run`]. The error envelope has
//! already been written to stdout; the error is repeated on stderr and the
//! process exits non-zero.

use aasregistry::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
