//! Shared fixtures for integration tests

// Not every test binary uses every fixture
#![allow(dead_code)]

use assert_fs::TempDir;
use std::sync::Arc;
use strata::{Author, ObjectId, Repository, Tree};

/// A fresh repository in a temp directory
///
/// The temp dir must stay alive for the repository to remain usable.
pub fn init_repository() -> (TempDir, Arc<Repository>) {
    let temp_dir = TempDir::new().expect("failed to create temp directory");
    let repository = Repository::init(temp_dir.path()).expect("failed to init repository");

    (temp_dir, repository)
}

/// Deterministic identity stamped inside a fixed day, hour `hour`
pub fn author_at(hour: u32) -> Author {
    let timestamp =
        chrono::DateTime::parse_from_rfc3339(&format!("2024-06-01T{hour:02}:00:00+00:00"))
            .expect("invalid fixture timestamp");

    Author::new_with_timestamp(
        "Test Author".to_string(),
        "author@example.com".to_string(),
        timestamp,
    )
}

/// Store an empty tree and return its id
pub fn empty_tree(repository: &Repository) -> ObjectId {
    repository
        .objects()
        .store(&Tree::default())
        .expect("failed to store empty tree")
}

/// Create a commit on the empty tree at hour `hour`
pub fn commit_at(
    repository: &Repository,
    parents: Vec<ObjectId>,
    hour: u32,
    message: &str,
) -> ObjectId {
    let tree = empty_tree(repository);
    let (oid, _) = repository
        .create_commit(
            tree,
            parents,
            author_at(hour),
            author_at(hour),
            message.to_string(),
        )
        .expect("failed to create commit");

    oid
}

/// Build a linear chain of `len` commits, oldest first
pub fn linear_chain(repository: &Repository, len: u32) -> Vec<ObjectId> {
    let mut chain = Vec::new();
    let mut parents = Vec::new();

    for index in 0..len {
        let oid = commit_at(
            repository,
            parents.clone(),
            index,
            &format!("commit {index}"),
        );
        parents = vec![oid.clone()];
        chain.push(oid);
    }

    chain
}
