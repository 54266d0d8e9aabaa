mod common;

use common::{commit_at, init_repository, linear_chain};
use pretty_assertions::assert_eq;
use rstest::rstest;
use strata::{Error, ObjectId, RefName, RefTarget};

#[test]
fn a_tip_compared_with_itself_has_no_divergence() {
    let (_dir, repository) = init_repository();
    let oid = commit_at(&repository, vec![], 0, "initial");

    assert_eq!(repository.ahead_behind(&oid, &oid).unwrap(), (0, 0));
}

#[rstest]
#[case(2, 0, (2, 0))]
#[case(0, 2, (0, 2))]
#[case(2, 1, (1, 0))]
#[case(1, 1, (0, 0))]
fn linear_chain_divergence(
    #[case] local: usize,
    #[case] upstream: usize,
    #[case] expected: (usize, usize),
) {
    let (_dir, repository) = init_repository();
    let chain = linear_chain(&repository, 3);

    assert_eq!(
        repository
            .ahead_behind(&chain[local], &chain[upstream])
            .unwrap(),
        expected
    );
}

#[test]
fn diverged_branches_count_both_sides() {
    let (_dir, repository) = init_repository();
    let base = commit_at(&repository, vec![], 0, "base");
    let local_a = commit_at(&repository, vec![base.clone()], 1, "local a");
    let local_b = commit_at(&repository, vec![local_a.clone()], 2, "local b");
    let upstream_a = commit_at(&repository, vec![base.clone()], 3, "upstream a");

    assert_eq!(
        repository.ahead_behind(&local_b, &upstream_a).unwrap(),
        (2, 1)
    );
}

#[test]
fn merged_history_does_not_count_shared_commits() {
    let (_dir, repository) = init_repository();
    let base = commit_at(&repository, vec![], 0, "base");
    let left = commit_at(&repository, vec![base.clone()], 1, "left");
    let right = commit_at(&repository, vec![base.clone()], 2, "right");
    let merge = commit_at(&repository, vec![left.clone(), right.clone()], 3, "merge");

    // Everything reachable from right is also reachable from the merge
    assert_eq!(repository.ahead_behind(&merge, &right).unwrap(), (2, 0));
    assert_eq!(repository.ahead_behind(&right, &merge).unwrap(), (0, 2));
}

#[test]
fn divergence_against_a_missing_commit_fails() {
    let (_dir, repository) = init_repository();
    let oid = commit_at(&repository, vec![], 0, "initial");
    let missing = ObjectId::try_parse("d".repeat(40)).unwrap();

    assert!(matches!(
        repository.ahead_behind(&oid, &missing),
        Err(Error::ObjectNotFound(_))
    ));
    // The seed is validated even on the identical-tip fast path
    assert!(matches!(
        repository.ahead_behind(&missing, &missing),
        Err(Error::ObjectNotFound(_))
    ));
}

#[test]
fn branch_divergence_uses_the_recorded_upstream() {
    let (_dir, repository) = init_repository();
    let chain = linear_chain(&repository, 3);

    let branch = RefName::local_branch("main").unwrap();
    let upstream = RefName::remote_branch("origin", "main").unwrap();
    let refs = repository.refs();
    refs.create(&branch, RefTarget::Direct(chain[2].clone()), false)
        .unwrap();
    refs.create(&upstream, RefTarget::Direct(chain[0].clone()), false)
        .unwrap();

    // No upstream recorded yet
    assert_eq!(repository.branch_divergence(&branch).unwrap(), None);

    refs.set_upstream(&branch, Some(&upstream)).unwrap();
    assert_eq!(
        repository.branch_divergence(&branch).unwrap(),
        Some((2, 0))
    );
}
