use pubman_core::db::open_db_in_memory;
use pubman_core::{attribute_service_for, AttributeKind, DeliveryError, DeliveryService};
use std::fs;
use std::path::{Path, PathBuf};

fn write(path: &Path, content: &str) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    path.to_path_buf()
}

#[test]
fn marked_files_are_mirrored_relative_to_master() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("show");
    let deliveries = master.join("Deliveries");
    let marked = write(&master.join("05_Compositing/03_Comp_Renders/sh010.mov"), "final");
    let skipped = write(&master.join("05_Compositing/03_Comp_Renders/sh010_wip.mov"), "wip");
    fs::create_dir_all(&deliveries).unwrap();

    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, &master).unwrap();
    store
        .update_attribute(&marked, AttributeKind::ToClient, true, "ana")
        .unwrap();

    let report = DeliveryService::new(&store, &deliveries)
        .send_to_client(&master.join("05_Compositing"))
        .unwrap();

    assert_eq!(report.file_count(), 1);
    assert_eq!(report.total_bytes(), 5);
    let copied = deliveries.join("05_Compositing/03_Comp_Renders/sh010.mov");
    assert_eq!(report.copied[0].destination, copied);
    assert_eq!(fs::read_to_string(copied).unwrap(), "final");
    assert!(!deliveries
        .join("05_Compositing/03_Comp_Renders")
        .join(skipped.file_name().unwrap())
        .exists());
    assert!(!deliveries
        .join("05_Compositing/03_Comp_Renders/sh010.mov.attr.json")
        .exists());
}

#[test]
fn marked_directory_delivers_all_descendants_without_sidecars() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("show");
    let deliveries = master.join("Deliveries");
    let renders = master.join("renders");
    write(&renders.join("a001.png"), "1");
    write(&renders.join("nested/a002.png"), "2");
    fs::create_dir_all(&deliveries).unwrap();

    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, &master).unwrap();
    store
        .update_attribute(&renders, AttributeKind::ToClient, true, "ana")
        .unwrap();
    store
        .update_attribute(&renders.join("a001.png"), AttributeKind::Publish, true, "ana")
        .unwrap();

    let report = DeliveryService::new(&store, &deliveries)
        .send_to_client(&renders)
        .unwrap();

    assert_eq!(report.file_count(), 2);
    assert!(deliveries.join("renders/a001.png").exists());
    assert!(deliveries.join("renders/nested/a002.png").exists());
    assert!(!deliveries.join("renders/a001.png.attr.json").exists());
}

#[test]
fn marking_the_master_does_not_copy_the_delivery_folder_into_itself() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("show");
    let deliveries = master.join("Deliveries");
    write(&master.join("cut.mov"), "cut");
    write(&deliveries.join("old/cut.mov"), "old");

    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, &master).unwrap();
    store
        .update_attribute(&master, AttributeKind::ToClient, true, "ana")
        .unwrap();

    let report = DeliveryService::new(&store, &deliveries)
        .send_to_client(&master)
        .unwrap();

    assert_eq!(report.file_count(), 1);
    assert!(deliveries.join("cut.mov").exists());
    assert!(!deliveries.join("Deliveries").exists());
}

#[test]
fn nothing_marked_yields_an_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("show");
    write(&master.join("cut.mov"), "cut");

    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, &master).unwrap();
    let report = DeliveryService::new(&store, master.join("Deliveries"))
        .send_to_client(&master)
        .unwrap();

    assert!(report.is_empty());
}

#[test]
fn directories_outside_master_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("show");
    let elsewhere = dir.path().join("elsewhere");
    fs::create_dir_all(&master).unwrap();
    fs::create_dir_all(&elsewhere).unwrap();

    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, &master).unwrap();
    let err = DeliveryService::new(&store, master.join("Deliveries"))
        .send_to_client(&elsewhere)
        .unwrap_err();

    assert!(matches!(err, DeliveryError::OutsideMaster { .. }));
}

#[test]
fn parent_components_cannot_escape_the_delivery_root() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("show");
    let deliveries = master.join("Deliveries");
    fs::create_dir_all(&deliveries).unwrap();
    write(&dir.path().join("other/secret.mov"), "secret");
    let escaping_dir = master.join("../other");
    let escaping_file = escaping_dir.join("secret.mov");

    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, &master).unwrap();
    store
        .update_attribute(&escaping_file, AttributeKind::ToClient, true, "ana")
        .unwrap();

    let err = DeliveryService::new(&store, &deliveries)
        .send_to_client(&escaping_dir)
        .unwrap_err();

    assert!(matches!(err, DeliveryError::OutsideMaster { .. }));
    assert!(!master.join("other").exists());
    assert_eq!(fs::read_dir(&deliveries).unwrap().count(), 0);
}
