use anyhow::{Result, anyhow};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::db;

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!(
            "wikitree_hub={level},wikitree_core={level},wikitree_sidebar={level},wikitree_server={level}"
        ))
    })
}

/// Log to stderr. Used by non-interactive commands.
pub fn init_stderr_logging(verbose: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
}

/// Log to `wikitree.log` in the data directory. The terminal UI owns the
/// screen, so interactive sessions cannot log to stderr.
pub fn init_file_logging(verbose: bool) -> Result<PathBuf> {
    let path = db::data_dir()?.join("wikitree.log");
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!(e))?;

    Ok(path)
}
