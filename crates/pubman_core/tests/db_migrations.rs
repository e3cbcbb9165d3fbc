use pubman_core::db::migrations::latest_version;
use pubman_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_schema() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "users");
    assert_table_exists(&conn, "projects");
    assert_table_exists(&conn, "file_attributes");
}

#[test]
fn reopening_a_database_file_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pubman.sqlite3");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO users (username, password_hash) VALUES ('ana', 'x');",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(users, 1);
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 42);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn attribute_statuses_are_constrained_to_booleans() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO users (username, password_hash) VALUES ('admin', 'x');
         INSERT INTO projects (name, master_path, client_name, delivery_path, created_by)
         VALUES ('Show', '/prod/show', 'ACME', '/prod/show/Deliveries', 1);",
    )
    .unwrap();

    let result = conn.execute(
        "INSERT INTO file_attributes (project_id, file_path, publish_status, to_client_status, last_updated)
         VALUES (1, 'a.exr', 2, 0, 'now');",
        [],
    );
    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
