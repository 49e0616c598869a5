// ==========================================
// Fuel Dispatch - SQLite connection setup
// ==========================================
// Every connection gets the same PRAGMAs (foreign keys, busy timeout);
// the schema is created idempotently by init_schema.
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// Default busy_timeout (ms)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Schema version written by init_schema
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Per-connection PRAGMAs
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Opens a connection with the unified PRAGMAs applied
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Creates every table the crate uses (idempotent)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS truck (
            truck_id TEXT PRIMARY KEY,
            plate_number TEXT NOT NULL,
            fuel_type TEXT NOT NULL,
            capacity_l REAL NOT NULL CHECK (capacity_l > 0),
            driver TEXT NOT NULL,
            retired INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS station (
            station_id TEXT PRIMARY KEY,
            seq INTEGER NOT NULL,
            name TEXT NOT NULL,
            address TEXT NOT NULL,
            lat REAL NOT NULL,
            lon REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fuel_level (
            station_id TEXT NOT NULL REFERENCES station(station_id) ON DELETE CASCADE,
            seq INTEGER NOT NULL,
            fuel_type TEXT NOT NULL,
            current_l REAL NOT NULL,
            min_l REAL NOT NULL,
            max_l REAL NOT NULL,
            PRIMARY KEY (station_id, fuel_type)
        );

        CREATE TABLE IF NOT EXISTS delivery_log (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            log_id TEXT NOT NULL UNIQUE,
            logged_at TEXT NOT NULL,
            truck_id TEXT NOT NULL,
            driver TEXT NOT NULL,
            fuel_type TEXT NOT NULL,
            total_volume_l REAL NOT NULL,
            delivered_volume_l REAL NOT NULL,
            total_cost REAL NOT NULL,
            route_json TEXT NOT NULL,
            skipped_json TEXT NOT NULL DEFAULT '[]'
        );

        CREATE INDEX IF NOT EXISTS idx_delivery_log_truck ON delivery_log(truck_id);

        CREATE TABLE IF NOT EXISTS snapshot_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            taken_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Reads schema_version (None when the table does not exist)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
