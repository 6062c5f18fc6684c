use anyhow::{Context, Result};
use directories::ProjectDirs;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Returns the wikitree data directory, creating it if needed.
/// Location: `~/.local/share/wikitree` (XDG-compliant)
pub fn data_dir() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "wikitree").context("Could not determine data directory")?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.to_path_buf())
}

/// Returns the path to the shared wikitree database.
pub fn db_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("wikitree.db"))
}

/// Opens (or creates) the shared SQLite database at its default location.
pub fn open_db() -> Result<Connection> {
    open_db_at(&db_path()?)
}

/// Opens (or creates) a SQLite database at an explicit path.
/// Enables WAL mode so the server and the browser can share one file.
pub fn open_db_at(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(conn)
}

/// Open an in-memory database for testing.
pub fn open_memory_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}
