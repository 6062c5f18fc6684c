use crate::state::{DEFAULT_WIDTH, clamp_width};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

const ENABLED_KEY: &str = "enabled";
const DEFAULT_WIDTH_KEY: &str = "default_width";

/// Administrator settings for the wiki sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    pub default_width: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_width: DEFAULT_WIDTH,
        }
    }
}

/// Initialize the settings table.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS plugin_settings (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn get_value(conn: &Connection, name: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM plugin_settings WHERE name = ?1",
            rusqlite::params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn set_value(conn: &Connection, name: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO plugin_settings (name, value) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET value = excluded.value",
        rusqlite::params![name, value],
    )?;
    Ok(())
}

/// Load settings; unset or unparseable values keep their defaults.
pub fn load(conn: &Connection) -> Result<Settings> {
    let mut settings = Settings::default();

    if let Some(enabled) = get_value(conn, ENABLED_KEY)? {
        settings.enabled = enabled.trim() != "0";
    }
    if let Some(width) = get_value(conn, DEFAULT_WIDTH_KEY)? {
        if let Ok(width) = width.trim().parse::<i64>() {
            settings.default_width = clamp_width(width);
        }
    }

    Ok(settings)
}

/// Persist settings.
pub fn save(conn: &Connection, settings: &Settings) -> Result<()> {
    set_value(conn, ENABLED_KEY, if settings.enabled { "1" } else { "0" })?;
    set_value(
        conn,
        DEFAULT_WIDTH_KEY,
        &clamp_width(settings.default_width as i64).to_string(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_db;

    fn setup_db() -> Connection {
        let conn = open_memory_db().unwrap();
        init_db(&conn).unwrap();
        conn
    }

    #[test]
    fn test_defaults() {
        let conn = setup_db();
        assert_eq!(load(&conn).unwrap(), Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let conn = setup_db();
        let settings = Settings {
            enabled: false,
            default_width: 320,
        };
        save(&conn, &settings).unwrap();
        assert_eq!(load(&conn).unwrap(), settings);
    }

    #[test]
    fn test_bad_width_keeps_default() {
        let conn = setup_db();
        set_value(&conn, DEFAULT_WIDTH_KEY, "wide").unwrap();
        assert_eq!(load(&conn).unwrap().default_width, DEFAULT_WIDTH);

        set_value(&conn, DEFAULT_WIDTH_KEY, "1200").unwrap();
        assert_eq!(load(&conn).unwrap().default_width, 500);
    }
}
