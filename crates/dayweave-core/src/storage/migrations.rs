//! Database schema migrations for dayweave.
//!
//! Migrations are versioned and applied automatically when opening the store.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (fresh database).
pub(crate) fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: users, events, tasks and travel segments.
///
/// Timestamps are RFC 3339 UTC text with second precision so that
/// lexicographic comparison matches chronological order.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            uid             TEXT NOT NULL UNIQUE,
            user_id         INTEGER NOT NULL REFERENCES users(id),
            summary         TEXT NOT NULL,
            start_at        TEXT NOT NULL,
            end_at          TEXT NOT NULL,
            location_label  TEXT,
            address         TEXT,
            latitude        REAL,
            longitude       REAL,
            status          TEXT NOT NULL DEFAULT 'PLANNED',
            category        TEXT NOT NULL DEFAULT 'other',
            subcategory     TEXT,
            transport_mode  TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id           INTEGER NOT NULL REFERENCES users(id),
            assignee_id       INTEGER REFERENCES users(id),
            name              TEXT NOT NULL,
            estimated_minutes INTEGER NOT NULL,
            priority          INTEGER NOT NULL DEFAULT 0,
            status            TEXT NOT NULL DEFAULT 'PENDING_CREATION',
            event_id          INTEGER REFERENCES events(id),
            created_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS travel_times (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id           INTEGER NOT NULL REFERENCES users(id),
            from_event_id     INTEGER NOT NULL REFERENCES events(id),
            to_event_id       INTEGER NOT NULL REFERENCES events(id),
            start_at          TEXT NOT NULL,
            end_at            TEXT NOT NULL,
            duration_minutes  INTEGER NOT NULL,
            distance_km       REAL,
            mode              TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_events_user_start ON events(user_id, start_at);
        CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_travel_times_pair
            ON travel_times(from_event_id, to_event_id);
        CREATE INDEX IF NOT EXISTS idx_travel_times_user_start ON travel_times(user_id, start_at);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: link reshuffled events to the event they replace.
///
/// The unique index makes a second materialization for the same cancelled
/// event fail at commit time.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE events ADD COLUMN origin_event_id INTEGER REFERENCES events(id);
         CREATE UNIQUE INDEX IF NOT EXISTS idx_events_origin
            ON events(origin_event_id) WHERE origin_event_id IS NOT NULL;",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

/// Migration v3: per-user focus preferences. NULL columns defer to config.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_preferences (
            user_id             INTEGER PRIMARY KEY REFERENCES users(id),
            min_focus_minutes   INTEGER,
            max_events_per_day  INTEGER,
            preferred_period    TEXT
        );",
    )?;

    set_schema_version(&tx, 3)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        let origin_column: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('events') WHERE name = 'origin_event_id'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(origin_column, 1);

        let preferences: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'user_preferences'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(preferences, 1);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn incremental_migration_from_v1() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 1);

        conn.execute(
            "INSERT INTO users (name, created_at) VALUES ('ada', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 3);
        let users: i32 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 1);
    }

    #[test]
    fn duplicate_travel_pair_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let insert = "INSERT INTO travel_times
            (user_id, from_event_id, to_event_id, start_at, end_at, duration_minutes, mode)
            VALUES (1, 1, 2, 'a', 'b', 5, 'WALKING')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
