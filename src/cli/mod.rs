//! Command line interface
//!
//! - search: run a search request against the configured storage
//! - list: cursor-paged shell listing
//! - explain: show the compiled database query of a search request

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{explain, list, run, run_command, search};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{decode_cursor, encode_cursor, read_request, write_error, write_response};
