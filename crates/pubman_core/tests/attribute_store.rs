use pubman_core::db::open_db_in_memory;
use pubman_core::repo::attribute_repo::SqliteAttributeCacheRepository;
use pubman_core::repo::project_repo::{NewProject, Project, ProjectRepository, SqliteProjectRepository};
use pubman_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use pubman_core::sidecar::sidecar_path;
use pubman_core::{attribute_service_for, AttributeError, AttributeKind, AttributeService};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

fn register_project(conn: &Connection, master: &Path) -> Project {
    let owner = SqliteUserRepository::new(conn)
        .create_user("admin", "hash")
        .unwrap();
    SqliteProjectRepository::new(conn)
        .create_project(&NewProject {
            name: "Show".to_string(),
            master_path: master.to_path_buf(),
            client_name: "ACME".to_string(),
            delivery_path: master.join("Deliveries"),
            comment: String::new(),
            delivery_date: String::new(),
            created_by: owner.id,
        })
        .unwrap()
}

#[test]
fn each_update_appends_one_entry_and_cache_mirrors_it() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("show");
    fs::create_dir_all(master.join("renders")).unwrap();
    let file = master.join("renders/a001.png");
    fs::write(&file, b"png").unwrap();

    let conn = open_db_in_memory().unwrap();
    let project = register_project(&conn, &master);
    let store = AttributeService::for_project(SqliteAttributeCacheRepository::new(&conn), &project);

    let first = store
        .update_attribute(&file, AttributeKind::Publish, true, "ana")
        .unwrap();
    let second = store
        .update_attribute(&file, AttributeKind::Publish, false, "bo")
        .unwrap();

    let history = store.history(&file, AttributeKind::Publish);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].timestamp, first);
    assert_eq!(history[1].timestamp, second);
    assert_eq!(history[1].user, "bo");
    assert!(store.history(&file, AttributeKind::ToClient).is_empty());
    assert!(!store.is_marked(&file, AttributeKind::Publish));

    let row = store.cached_row(&file).unwrap().unwrap();
    assert_eq!(row.file_path, "renders/a001.png");
    assert!(!row.publish_status);
    assert!(!row.to_client_status);
    assert_eq!(row.last_updated, second);
}

#[test]
fn cache_keeps_other_attribute_when_one_changes() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("show");
    fs::create_dir_all(&master).unwrap();
    let file = master.join("cut.mov");
    fs::write(&file, b"mov").unwrap();

    let conn = open_db_in_memory().unwrap();
    let project = register_project(&conn, &master);
    let store = attribute_service_for(&conn, &master).unwrap();
    assert_eq!(store.project_id(), Some(project.id));

    store
        .update_attribute(&file, AttributeKind::ToClient, true, "ana")
        .unwrap();
    store
        .update_attribute(&file, AttributeKind::Publish, true, "ana")
        .unwrap();

    let row = store.cached_row(&file).unwrap().unwrap();
    assert!(row.publish_status);
    assert!(row.to_client_status);
    assert_eq!(
        store.cached_marked(AttributeKind::ToClient).unwrap(),
        vec!["cut.mov".to_string()]
    );
    assert_eq!(store.status_label(&file), "Published | To Client");
}

#[test]
fn unregistered_master_path_writes_sidecar_only() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("loose.exr");
    fs::write(&file, b"exr").unwrap();

    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, dir.path()).unwrap();
    assert_eq!(store.project_id(), None);

    store
        .update_attribute(&file, AttributeKind::Publish, true, "ana")
        .unwrap();

    assert!(sidecar_path(&file).exists());
    assert!(store.is_marked(&file, AttributeKind::Publish));
    assert_eq!(store.cached_row(&file).unwrap(), None);
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM file_attributes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn corrupt_sidecar_reads_as_empty_and_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("broken.exr");
    fs::write(&file, b"exr").unwrap();
    fs::write(sidecar_path(&file), "{ nope").unwrap();

    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, dir.path()).unwrap();

    assert!(!store.is_marked(&file, AttributeKind::Publish));
    assert_eq!(store.status_label(&file), "No Status");

    let err = store
        .update_attribute(&file, AttributeKind::Publish, true, "ana")
        .unwrap_err();
    assert!(matches!(err, AttributeError::Sidecar(_)));
    assert_eq!(fs::read_to_string(sidecar_path(&file)).unwrap(), "{ nope");
}

#[test]
fn details_keep_only_recent_history() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("take.wav");
    fs::write(&file, b"wav").unwrap();

    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, dir.path()).unwrap();
    for round in 0..7 {
        store
            .update_attribute(&file, AttributeKind::Publish, round % 2 == 0, "ana")
            .unwrap();
    }

    let details = store.details(&file);
    assert!(details.publish.status);
    assert_eq!(details.publish.user, "ana");
    assert_eq!(details.recent_history(AttributeKind::Publish).len(), 5);
    assert_eq!(store.history(&file, AttributeKind::Publish).len(), 7);
    assert!(!details.to_client.status);
    assert_eq!(details.to_client.user, "Unknown");
}

#[test]
fn sidecar_without_user_field_reads_as_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("old.exr");
    fs::write(&file, b"exr").unwrap();
    fs::write(
        sidecar_path(&file),
        r#"{ "publish": [ { "status": true, "timestamp": "2024-05-01T10:00:00.000000" } ] }"#,
    )
    .unwrap();

    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, dir.path()).unwrap();

    let current = store.current_status(&file, AttributeKind::Publish);
    assert!(current.status);
    assert_eq!(current.user, "Unknown");
    assert_eq!(current.timestamp, "2024-05-01T10:00:00.000000");
}

#[test]
fn paths_climbing_out_of_master_never_reach_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("show");
    fs::create_dir_all(master.join("other")).unwrap();
    fs::create_dir_all(dir.path().join("other")).unwrap();
    let inside = master.join("other/secret.mov");
    fs::write(&inside, b"inside").unwrap();
    fs::write(dir.path().join("other/secret.mov"), b"outside").unwrap();
    let escaping = master.join("../other/secret.mov");

    let conn = open_db_in_memory().unwrap();
    register_project(&conn, &master);
    let store = attribute_service_for(&conn, &master).unwrap();

    assert_eq!(store.relative_path(&escaping), None);
    store
        .update_attribute(&escaping, AttributeKind::ToClient, true, "ana")
        .unwrap();

    assert!(store.is_marked(&escaping, AttributeKind::ToClient));
    assert_eq!(store.cached_row(&escaping).unwrap(), None);
    assert_eq!(store.cached_row(&inside).unwrap(), None);
    assert!(store.cached_marked(AttributeKind::ToClient).unwrap().is_empty());
}
