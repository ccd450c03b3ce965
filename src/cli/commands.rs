//! CLI command implementations
//!
//! Each command loads the configuration, opens the configured storage, runs
//! one registry operation and returns the `data` of the response envelope.
//! Storage lives only as long as the command, so descriptors passed with
//! `--descriptors` are registered first.

use std::path::Path;

use serde_json::{json, Value};
use tracing::debug;

use crate::config::RegistryConfig;
use crate::document::compile_search;
use crate::logging::{self, LoggingConfig};
use crate::model::AssetKind;
use crate::query::ShellDescriptorSearchRequest;
use crate::storage::{DescriptorFilter, PaginationInfo, RegistryStorage};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{
    decode_cursor, encode_cursor, read_descriptors, read_request, write_error, write_response,
};

/// Main CLI entry point
///
/// Parses arguments, runs the command and writes exactly one envelope.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    match run_command(cli.command) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

pub fn run_command(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Search {
            config,
            descriptors,
        } => search(&config, descriptors.as_deref(), read_request()?),
        Command::List {
            config,
            descriptors,
            limit,
            cursor,
            asset_kind,
            asset_type,
        } => {
            let cursor = cursor.as_deref().map(decode_cursor).transpose()?;
            let asset_kind = asset_kind.as_deref().map(parse_asset_kind).transpose()?;
            let pagination = PaginationInfo::new(limit, cursor);
            let filter = DescriptorFilter::new(asset_kind, asset_type);
            list(&config, descriptors.as_deref(), &pagination, &filter)
        }
        Command::Explain => {
            logging::init(&LoggingConfig::default());
            explain(read_request()?)
        }
    }
}

/// Run one search request against the configured storage
pub fn search(config_path: &Path, descriptors: Option<&Path>, request: Value) -> CliResult<Value> {
    let storage = open_storage(config_path, descriptors)?;
    let request: ShellDescriptorSearchRequest = serde_json::from_value(request)?;

    let response = storage.search_aas_descriptors(&request)?;
    Ok(serde_json::to_value(response)?)
}

/// One page of shells; the returned cursor is passed back with `--cursor`
pub fn list(
    config_path: &Path,
    descriptors: Option<&Path>,
    pagination: &PaginationInfo,
    filter: &DescriptorFilter,
) -> CliResult<Value> {
    let storage = open_storage(config_path, descriptors)?;
    let page = storage.get_all_aas_descriptors(pagination, filter)?;

    Ok(json!({
        "cursor": page.cursor.as_deref().map(encode_cursor),
        "result": page.result,
    }))
}

/// Compile a search request without touching any storage
pub fn explain(request: Value) -> CliResult<Value> {
    let request: ShellDescriptorSearchRequest = serde_json::from_value(request)?;
    let compiled = compile_search(&request)?;

    Ok(json!({
        "filter": compiled.filter,
        "pipeline": compiled.pipeline,
    }))
}

fn parse_asset_kind(value: &str) -> CliResult<AssetKind> {
    AssetKind::parse(value).ok_or_else(|| {
        CliError::invalid_argument(format!(
            "Invalid asset kind '{}'. Expected Instance, Type or NotApplicable.",
            value
        ))
    })
}

fn open_storage(
    config_path: &Path,
    descriptors: Option<&Path>,
) -> CliResult<Box<dyn RegistryStorage>> {
    let config = RegistryConfig::load(config_path)?;
    logging::init(&config.logging);

    let storage = config.build_storage()?;
    if let Some(path) = descriptors {
        let shells = read_descriptors(path)?;
        debug!(count = shells.len(), "DESCRIPTORS_LOADED");
        storage.insert_aas_descriptors_bulk(shells)?;
    }
    Ok(storage)
}
