//! JSON I/O handling for CLI
//!
//! - Input: one JSON document on stdin
//! - Output: one JSON envelope per command on stdout
//! - UTF-8 only

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::{json, Value};

use super::errors::{CliError, CliResult};
use crate::model::ShellDescriptor;

/// Read the whole of stdin as one JSON document
pub fn read_request() -> CliResult<Value> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    parse_request(&input)
}

pub fn parse_request(input: &str) -> CliResult<Value> {
    if input.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    Ok(serde_json::from_str(input)?)
}

/// Read a JSON array of shell descriptors
pub fn read_descriptors(path: &Path) -> CliResult<Vec<ShellDescriptor>> {
    let content = fs::read_to_string(path).map_err(|e| {
        CliError::io_error(format!("Failed to read descriptors {:?}: {}", path, e))
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Cursors leave the registry as URL-safe base64 of the next page's first id
pub fn encode_cursor(cursor: &str) -> String {
    URL_SAFE_NO_PAD.encode(cursor)
}

pub fn decode_cursor(encoded: &str) -> CliResult<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CliError::invalid_argument(format!("Invalid cursor: {}", e)))?;
    String::from_utf8(bytes).map_err(|_| CliError::invalid_argument("Invalid cursor: not UTF-8"))
}

pub fn success_envelope(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

pub fn error_envelope(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_json(&success_envelope(data))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_json(&error_envelope(code, message))
}

fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_input_rejected() {
        assert!(parse_request("  \n").is_err());
        assert_eq!(parse_request("{\n\"page\": null\n}").unwrap(), json!({"page": null}));
    }

    #[test]
    fn test_cursor_encoding() {
        let encoded = encode_cursor("https://example.com/aas/1");
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('='));
        assert_eq!(decode_cursor(&encoded).unwrap(), "https://example.com/aas/1");
        assert!(decode_cursor("not base64!").is_err());
    }

    #[test]
    fn test_envelopes() {
        assert_eq!(success_envelope(json!(1)), json!({"status": "ok", "data": 1}));
        assert_eq!(
            error_envelope("AAS_CLI_IO_ERROR", "boom")["status"],
            json!("error")
        );
    }

    #[test]
    fn test_read_descriptors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shells.json");
        fs::write(&path, json!([{"id": "d1", "assetKind": "Type"}]).to_string()).unwrap();

        let descriptors = read_descriptors(&path).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].id, "d1");
    }
}
