//! # seqmeta CLI
//!
//! Command-line access to entity metadata: pure merges and diffs of JSON
//! files, and atomic patching of documents stored in a seqmeta database.

use anyhow::{Context, Result};
use seqmeta_core::{codec, diff, merge, EntityKind, EntityRef, JsonValue};
use seqmeta_store::SqliteStore;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;

use config::CliConfig;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "merge" => {
            let [target, patch] = required::<2>(&args, "merge <target-file> <patch-file>");
            let result = merge(&read_document(target)?, &read_document(patch)?);
            println!("{}", codec::to_string_pretty(&result));
        }
        "diff" => {
            let [source, target] = required::<2>(&args, "diff <source-file> <target-file>");
            let patch = diff(&read_document(source)?, &read_document(target)?);
            println!("{}", codec::to_string_pretty(&patch));
        }
        "create" => {
            let [kind] = required::<1>(&args, "create <kind> [initial-json]");
            let kind: EntityKind = kind.parse()?;
            let initial = match args.get(3) {
                Some(text) => codec::parse(text).context("Invalid initial metadata")?,
                None => JsonValue::object(),
            };
            let entity = open_store()?.create_entity(kind, &initial)?;
            println!("{entity}");
        }
        "get" => {
            let [kind, id] = required::<2>(&args, "get <kind> <id>");
            let entity = entity_ref(kind, id)?;
            let document = open_store()?.get_metadata(&entity)?;
            println!("{}", codec::to_string_pretty(&document));
        }
        "patch" => {
            let [kind, id, body] = required::<3>(&args, "patch <kind> <id> <patch-json | @file>");
            let entity = entity_ref(kind, id)?;
            let body = match body.strip_prefix('@') {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read patch file {path}"))?,
                None => body.clone(),
            };
            let document = open_store()?.apply_patch_text(&entity, &body)?;
            tracing::info!(entity = %entity, "Patched metadata");
            println!("{}", codec::to_string_pretty(&document));
        }
        "delete" => {
            let [kind, id] = required::<2>(&args, "delete <kind> <id>");
            let entity = entity_ref(kind, id)?;
            if !open_store()?.delete_entity(&entity)? {
                anyhow::bail!("entity not found: {entity}");
            }
            println!("deleted {entity}");
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

/// The `N` arguments after the command name, or exit with usage.
fn required<'a, const N: usize>(args: &'a [String], usage: &str) -> [&'a String; N] {
    match args.get(2..2 + N) {
        Some(values) => std::array::from_fn(|i| &values[i]),
        None => {
            eprintln!("Usage: seqmeta {usage}");
            std::process::exit(1);
        }
    }
}

fn open_store() -> Result<SqliteStore> {
    let config = CliConfig::from_env()?;
    tracing::debug!(
        db_path = %config.db_path.display(),
        strategy = %config.store.strategy,
        "Opening metadata store"
    );
    SqliteStore::open(&config.db_path, config.store).with_context(|| {
        format!(
            "Failed to open metadata store {}",
            config.db_path.display()
        )
    })
}

fn entity_ref(kind: &str, id: &str) -> Result<EntityRef> {
    let kind: EntityKind = kind.parse()?;
    let id = Uuid::parse_str(id).with_context(|| format!("Invalid entity id {id}"))?;
    Ok(EntityRef::new(kind, id))
}

fn read_document(path: &str) -> Result<JsonValue> {
    let text = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("Failed to read {path}"))?;
    codec::parse(&text).with_context(|| format!("Invalid JSON in {path}"))
}

fn print_help() {
    println!(
        r#"seqmeta CLI

USAGE:
    seqmeta <COMMAND> [OPTIONS]

COMMANDS:
    merge <target-file> <patch-file>        Apply a JSON merge patch to a document
    diff <source-file> <target-file>        Derive the merge patch between two documents
    create <kind> [initial-json]            Create an entity (sample, sequence, assay, analysis)
    get <kind> <id>                         Print an entity's metadata
    patch <kind> <id> <patch-json | @file>  Atomically merge a patch into an entity's metadata
    delete <kind> <id>                      Delete an entity and its metadata
    help                                    Show this help message

ENVIRONMENT:
    SEQMETA_DB_PATH           Database path (default ./seqmeta.db)
    SEQMETA_APPLY_STRATEGY    transactional | in-engine
    SEQMETA_BUSY_TIMEOUT_MS   Lock wait before reporting the store busy
    SEQMETA_MAX_ATTEMPTS      Attempts for a patch on transient failures
    SEQMETA_RETRY_BACKOFF_MS  Base delay between attempts
    RUST_LOG                  Log filter (default warn)

EXAMPLES:
    seqmeta create sample '{{"organism":"Homo sapiens"}}'
    seqmeta patch sample 6f1c2a8e-0d4b-4c1e-9a57-3b8f2e1d9c40 '{{"qc":{{"passed":true}}}}'
"#
    );
}
