mod common;

use common::{commit_at, init_repository};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use strata::{Blob, EntryMode, Error, ObjectId, ObjectType, TreeBuilder};

#[test]
fn putting_identical_bytes_yields_the_same_oid() {
    let (_dir, repository) = init_repository();
    let store = repository.objects();

    let first = store.put_raw(ObjectType::Blob, b"identical payload").unwrap();
    let second = store.put_raw(ObjectType::Blob, b"identical payload").unwrap();

    assert_eq!(first, second);
}

#[test]
fn putting_different_kinds_of_identical_bytes_yields_different_oids() {
    let (_dir, repository) = init_repository();
    let store = repository.objects();

    let as_blob = store.put_raw(ObjectType::Blob, b"payload").unwrap();
    let as_commit = store.put_raw(ObjectType::Commit, b"payload").unwrap();

    assert_ne!(as_blob, as_commit);
}

#[test]
fn blob_round_trips_through_the_store() {
    let (_dir, repository) = init_repository();
    let store = repository.objects();

    let blob = Blob::from_bytes(&b"file content\n"[..]);
    let oid = store.store(&blob).unwrap();

    let loaded = store.parse_blob(&oid).unwrap();
    assert_eq!(loaded, blob);
}

#[test]
fn getting_a_missing_object_fails_with_object_not_found() {
    let (_dir, repository) = init_repository();
    let missing = ObjectId::try_parse("d".repeat(40)).unwrap();

    let result = repository.objects().parse_object(&missing);
    assert!(matches!(result, Err(Error::ObjectNotFound(oid)) if oid == missing));
}

#[test]
fn decoding_a_malformed_commit_fails_with_corrupt_object() {
    let (_dir, repository) = init_repository();
    let store = repository.objects();

    // A commit payload with no tree line violates the grammar
    let oid = store
        .put_raw(ObjectType::Commit, b"author nobody\n\nmessage")
        .unwrap();

    let result = store.parse_commit(&oid);
    assert!(matches!(result, Err(Error::CorruptObject { .. })));
}

#[test]
fn asking_for_the_wrong_kind_fails_with_corrupt_object() {
    let (_dir, repository) = init_repository();
    let store = repository.objects();

    let oid = store.store(&Blob::from_bytes(&b"not a commit"[..])).unwrap();

    assert!(matches!(
        store.parse_commit(&oid),
        Err(Error::CorruptObject { .. })
    ));
}

#[test]
fn concurrent_identical_puts_agree_on_one_oid() {
    let (_dir, repository) = init_repository();

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let repository = Arc::clone(&repository);
            std::thread::spawn(move || {
                let mut oids = Vec::new();
                for round in 0..200 {
                    let payload = format!("shared payload {}", round % 8);
                    let oid = repository
                        .objects()
                        .put_raw(ObjectType::Blob, payload.as_bytes())
                        .unwrap();
                    oids.push(oid);
                }
                oids
            })
        })
        .collect();

    let results: Vec<Vec<ObjectId>> = writers
        .into_iter()
        .map(|writer| writer.join().unwrap())
        .collect();

    // Every writer observed success and the same ids, in the same order
    for oids in &results[1..] {
        assert_eq!(oids, &results[0]);
    }
}

#[test]
fn store_is_idempotent_for_full_objects() {
    let (_dir, repository) = init_repository();

    let first = commit_at(&repository, vec![], 0, "same commit");
    let second = commit_at(&repository, vec![], 0, "same commit");

    assert_eq!(first, second);
}

#[test]
fn tree_builder_insertion_order_does_not_change_the_root_oid() {
    let (_dir, repository) = init_repository();
    let store = repository.objects();

    let file_a = store.store(&Blob::from_bytes(&b"a"[..])).unwrap();
    let file_b = store.store(&Blob::from_bytes(&b"b"[..])).unwrap();

    let mut forward = TreeBuilder::new();
    forward.insert("src/lib.rs", EntryMode::Regular, file_a.clone()).unwrap();
    forward.insert("readme.md", EntryMode::Regular, file_b.clone()).unwrap();

    let mut reversed = TreeBuilder::new();
    reversed.insert("readme.md", EntryMode::Regular, file_b).unwrap();
    reversed.insert("src/lib.rs", EntryMode::Regular, file_a).unwrap();

    assert_eq!(
        forward.write_to(store).unwrap(),
        reversed.write_to(store).unwrap()
    );
}

#[test]
fn lookup_path_descends_nested_trees() {
    let (_dir, repository) = init_repository();
    let store = repository.objects();

    let blob = store.store(&Blob::from_bytes(&b"fn main() {}"[..])).unwrap();
    let mut builder = TreeBuilder::new();
    builder
        .insert("src/bin/main.rs", EntryMode::Regular, blob.clone())
        .unwrap();
    let root = builder.write_to(store).unwrap();

    let entry = store.lookup_path(&root, "src/bin/main.rs").unwrap();
    assert_eq!(entry.oid, blob);
    assert_eq!(entry.mode, EntryMode::Regular);

    let directory = store.lookup_path(&root, "src/bin").unwrap();
    assert!(directory.is_tree());
}

#[test]
fn lookup_path_reports_missing_segments() {
    let (_dir, repository) = init_repository();
    let store = repository.objects();

    let blob = store.store(&Blob::from_bytes(&b"x"[..])).unwrap();
    let mut builder = TreeBuilder::new();
    builder.insert("src/lib.rs", EntryMode::Regular, blob).unwrap();
    let root = builder.write_to(store).unwrap();

    assert!(matches!(
        store.lookup_path(&root, "src/missing.rs"),
        Err(Error::PathNotFound(_))
    ));
    assert!(matches!(
        store.lookup_path(&root, "docs/guide.md"),
        Err(Error::PathNotFound(_))
    ));
}

#[test]
fn lookup_path_reports_a_file_used_as_a_directory() {
    let (_dir, repository) = init_repository();
    let store = repository.objects();

    let blob = store.store(&Blob::from_bytes(&b"x"[..])).unwrap();
    let mut builder = TreeBuilder::new();
    builder.insert("src/lib.rs", EntryMode::Regular, blob).unwrap();
    let root = builder.write_to(store).unwrap();

    assert!(matches!(
        store.lookup_path(&root, "src/lib.rs/nested"),
        Err(Error::NotADirectory(path)) if path == "src/lib.rs"
    ));
}
