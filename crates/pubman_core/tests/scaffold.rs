use pubman_core::scaffold::{copy_template, create_production_structure, ScaffoldError, PRODUCTION_FOLDERS};
use std::fs;

#[test]
fn creates_every_production_folder() {
    let dir = tempfile::tempdir().unwrap();

    let created = create_production_structure(dir.path(), " Show ").unwrap();

    let root = dir.path().join("Show");
    assert_eq!(created.len(), PRODUCTION_FOLDERS.len() + 1);
    assert_eq!(created[0], root);
    for folder in PRODUCTION_FOLDERS {
        assert!(root.join(folder).is_dir(), "missing {folder}");
    }
    assert!(root.join("07_Out_To_Client").is_dir());
    assert!(root
        .join("3D_Project/01_Softwares/02_Maya/02_Prod/01_Scenes/Shot_Structure/Anim")
        .is_dir());
}

#[test]
fn existing_target_is_refused_and_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("Show");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("keep.txt"), "keep").unwrap();

    let err = create_production_structure(dir.path(), "Show").unwrap_err();

    assert!(matches!(err, ScaffoldError::AlreadyExists(path) if path == root));
    assert!(!root.join("01_Project_Data").exists());
}

#[test]
fn blank_name_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        create_production_structure(dir.path(), "   "),
        Err(ScaffoldError::EmptyName)
    ));
}

#[test]
fn template_copy_merges_into_existing_target() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template");
    fs::create_dir_all(template.join("edit/out")).unwrap();
    fs::write(template.join("edit/brief.txt"), "brief").unwrap();
    let target = dir.path().join("Show");
    fs::create_dir_all(target.join("edit")).unwrap();
    fs::write(target.join("edit/existing.txt"), "mine").unwrap();

    let copied = copy_template(&template, &target).unwrap();

    assert_eq!(copied, 1);
    assert!(target.join("edit/out").is_dir());
    assert_eq!(fs::read_to_string(target.join("edit/brief.txt")).unwrap(), "brief");
    assert_eq!(fs::read_to_string(target.join("edit/existing.txt")).unwrap(), "mine");
}

#[test]
fn missing_template_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        copy_template(&dir.path().join("nope"), &dir.path().join("Show")),
        Err(ScaffoldError::TemplateNotFound(_))
    ));
}
