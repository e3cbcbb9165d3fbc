//! Schema migrations for the pubman database.
//!
//! Version 1 creates `users`, `projects` and the `file_attributes` cache.
//! The applied version lives in `PRAGMA user_version`; a database written by
//! a newer build is refused instead of being downgraded.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

/// Ordered `(schema version, SQL)` steps.
const SCHEMA_STEPS: &[(u32, &str)] = &[(1, include_str!("0001_init.sql"))];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |(version, _)| *version)
}

/// Brings the schema up to `latest_version()` inside one transaction.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let on_disk: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = latest_version();
    if on_disk > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: on_disk,
            latest_supported: latest,
        });
    }

    let pending = SCHEMA_STEPS
        .iter()
        .filter(|(version, _)| *version > on_disk)
        .collect::<Vec<_>>();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", *version)?;
    }
    tx.commit()?;
    Ok(())
}
