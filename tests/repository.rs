mod common;

use common::{author_at, commit_at, init_repository};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use strata::{Blob, EntryMode, Error, RefName, RefTarget, Repository, TreeBuilder};

#[test]
fn init_creates_the_store_layout() {
    let (dir, repository) = init_repository();

    let store_root = repository.path().join(".strata");
    assert!(store_root.join("objects").is_dir());
    assert!(store_root.join("refs").join("heads").is_dir());
    assert!(store_root.join("HEAD").is_file());

    drop(repository);
    dir.close().unwrap();
}

#[test]
fn a_fresh_repository_has_an_unborn_head() {
    let (_dir, repository) = init_repository();

    // HEAD points at the default branch, which has no commits yet
    assert!(matches!(
        repository.head(),
        Err(Error::UnresolvedReference(_))
    ));
    assert_eq!(
        repository.refs().current_ref(None).unwrap(),
        RefName::local_branch("main").unwrap()
    );
}

#[test]
fn reinitializing_an_existing_repository_is_harmless() {
    let (_dir, repository) = init_repository();
    let oid = commit_at(&repository, vec![], 0, "initial");
    repository
        .refs()
        .update(&RefName::head(), oid.clone())
        .unwrap();

    let reinitialized = Repository::init(repository.path()).unwrap();

    assert_eq!(reinitialized.head().unwrap(), oid);
}

#[test]
fn opening_a_non_repository_path_fails() {
    let temp_dir = assert_fs::TempDir::new().unwrap();

    let result = Repository::open(temp_dir.path());

    assert!(matches!(result, Err(Error::RepositoryNotFound(_))));
    temp_dir.close().unwrap();
}

#[test]
fn opens_of_the_same_location_share_one_instance() {
    let (_dir, repository) = init_repository();

    let reopened = Repository::open(repository.path()).unwrap();

    assert!(Arc::ptr_eq(&repository, &reopened));
}

#[test]
fn distinct_locations_get_distinct_instances() {
    let (_dir_a, first) = init_repository();
    let (_dir_b, second) = init_repository();

    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn head_can_be_detached_onto_a_commit() {
    let (_dir, repository) = init_repository();
    let oid = commit_at(&repository, vec![], 0, "initial");

    repository.set_head(RefTarget::Direct(oid.clone())).unwrap();

    assert_eq!(repository.head().unwrap(), oid);
    assert_eq!(
        repository.refs().current_ref(None).unwrap(),
        RefName::head()
    );
}

#[test]
fn snapshot_commit_and_branch_work_end_to_end() {
    let (_dir, repository) = init_repository();
    let store = repository.objects();

    // Snapshot two files under one directory
    let main_rs = store
        .store(&Blob::from_bytes(&b"fn main() {}\n"[..]))
        .unwrap();
    let readme = store
        .store(&Blob::from_bytes(&b"# strata\n"[..]))
        .unwrap();
    let mut builder = TreeBuilder::new();
    builder
        .insert("src/main.rs", EntryMode::Regular, main_rs.clone())
        .unwrap();
    builder.insert("README.md", EntryMode::Regular, readme).unwrap();
    let root = builder.write_to(store).unwrap();

    // Commit it and fast-forward the default branch through HEAD
    let (commit_oid, _) = repository
        .create_commit(
            root.clone(),
            vec![],
            author_at(0),
            author_at(0),
            "Initial snapshot".to_string(),
        )
        .unwrap();
    repository
        .refs()
        .update(&RefName::head(), commit_oid.clone())
        .unwrap();

    // The snapshot is reachable back from HEAD
    let head = repository.head().unwrap();
    assert_eq!(head, commit_oid);

    let commit = store.parse_commit(&head).unwrap();
    assert_eq!(commit.tree_oid(), &root);
    assert_eq!(
        store.lookup_path(commit.tree_oid(), "src/main.rs").unwrap().oid,
        main_rs
    );

    let emitted: Vec<_> = {
        let mut walk = repository.walk();
        walk.push(head);
        walk.collect::<strata::Result<Vec<_>>>().unwrap()
    };
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].1.summary(), "Initial snapshot");
}
