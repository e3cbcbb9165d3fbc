use pubman_core::db::open_db_in_memory;
use pubman_core::sidecar::sidecar_path;
use pubman_core::{
    attribute_service_for, AlwaysClear, AttributeKind, Conflict, ConflictChecker,
    ConflictResolver, NeverClear, SetOutcome,
};
use std::fs;
use std::path::{Path, PathBuf};

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, name.as_bytes()).unwrap();
    path
}

/// Records what it was asked and answers with a fixed decision.
struct Recording {
    answer: bool,
    seen: Vec<Vec<String>>,
}

impl ConflictResolver for Recording {
    fn confirm_clear(&mut self, _kind: AttributeKind, conflicts: &[Conflict]) -> bool {
        self.seen
            .push(conflicts.iter().map(|c| c.name.clone()).collect());
        self.answer
    }
}

#[test]
fn a_path_never_conflicts_with_itself() {
    let dir = tempfile::tempdir().unwrap();
    let file = touch(dir.path(), "a.exr");
    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, dir.path()).unwrap();
    let checker = ConflictChecker::new(&store);

    store
        .update_attribute(&file, AttributeKind::Publish, true, "ana")
        .unwrap();

    assert!(checker
        .find_conflicts(&file, AttributeKind::Publish)
        .unwrap()
        .is_empty());
}

#[test]
fn conflicts_are_marked_siblings_ordered_by_first_mark() {
    let dir = tempfile::tempdir().unwrap();
    let first = touch(dir.path(), "z_first.exr");
    let second = touch(dir.path(), "a_second.exr");
    let unmarked = touch(dir.path(), "plain.exr");
    let target = touch(dir.path(), "target.exr");
    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, dir.path()).unwrap();

    store
        .update_attribute(&first, AttributeKind::Publish, true, "ana")
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    store
        .update_attribute(&second, AttributeKind::Publish, true, "ana")
        .unwrap();
    store
        .update_attribute(&unmarked, AttributeKind::ToClient, true, "ana")
        .unwrap();

    let conflicts = ConflictChecker::new(&store)
        .find_conflicts(&target, AttributeKind::Publish)
        .unwrap();

    let names = conflicts.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["z_first.exr", "a_second.exr"]);
    assert!(conflicts[0].first_marked < conflicts[1].first_marked);
    assert!(!names.iter().any(|name| name.ends_with(".attr.json")));
}

#[test]
fn confirming_clears_siblings_before_setting() {
    let dir = tempfile::tempdir().unwrap();
    let old = touch(dir.path(), "v001.exr");
    let new = touch(dir.path(), "v002.exr");
    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, dir.path()).unwrap();
    let checker = ConflictChecker::new(&store);

    store
        .update_attribute(&old, AttributeKind::Publish, true, "ana")
        .unwrap();

    let outcome = checker
        .set_attribute(&new, AttributeKind::Publish, true, "bo", &mut AlwaysClear)
        .unwrap();

    match outcome {
        SetOutcome::Applied { cleared, .. } => {
            assert_eq!(cleared.len(), 1);
            assert_eq!(cleared[0].path, old);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!store.is_marked(&old, AttributeKind::Publish));
    assert!(store.is_marked(&new, AttributeKind::Publish));
    let old_history = store.history(&old, AttributeKind::Publish);
    assert_eq!(old_history.len(), 2);
    assert_eq!(old_history[1].user, "bo");
}

#[test]
fn declining_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let old = touch(dir.path(), "v001.exr");
    let new = touch(dir.path(), "v002.exr");
    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, dir.path()).unwrap();
    let checker = ConflictChecker::new(&store);

    store
        .update_attribute(&old, AttributeKind::ToClient, true, "ana")
        .unwrap();

    let outcome = checker
        .set_attribute(&new, AttributeKind::ToClient, true, "bo", &mut NeverClear)
        .unwrap();

    assert!(matches!(outcome, SetOutcome::Declined { ref conflicts } if conflicts.len() == 1));
    assert!(store.is_marked(&old, AttributeKind::ToClient));
    assert!(!sidecar_path(&new).exists());
}

#[test]
fn clearing_an_attribute_skips_the_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let old = touch(dir.path(), "v001.exr");
    let new = touch(dir.path(), "v002.exr");
    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, dir.path()).unwrap();
    let checker = ConflictChecker::new(&store);
    let mut resolver = Recording {
        answer: false,
        seen: Vec::new(),
    };

    store
        .update_attribute(&old, AttributeKind::Publish, true, "ana")
        .unwrap();
    checker
        .set_attribute(&new, AttributeKind::Publish, false, "bo", &mut resolver)
        .unwrap();

    assert!(resolver.seen.is_empty());
    assert!(store.is_marked(&old, AttributeKind::Publish));
    assert_eq!(store.history(&new, AttributeKind::Publish).len(), 1);
}

#[test]
fn resolver_sees_every_conflict_once() {
    let dir = tempfile::tempdir().unwrap();
    let a = touch(dir.path(), "a.exr");
    let b = touch(dir.path(), "b.exr");
    let target = touch(dir.path(), "c.exr");
    let conn = open_db_in_memory().unwrap();
    let store = attribute_service_for(&conn, dir.path()).unwrap();
    let mut resolver = Recording {
        answer: true,
        seen: Vec::new(),
    };

    for path in [&a, &b] {
        store
            .update_attribute(path, AttributeKind::Publish, true, "ana")
            .unwrap();
    }
    ConflictChecker::new(&store)
        .set_attribute(&target, AttributeKind::Publish, true, "ana", &mut resolver)
        .unwrap();

    assert_eq!(resolver.seen.len(), 1);
    let mut names = resolver.seen[0].clone();
    names.sort();
    assert_eq!(names, vec!["a.exr", "b.exr"]);
}
