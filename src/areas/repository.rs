//! Repository composition root
//!
//! A repository owns one object store and one reference store rooted at a
//! single directory; trees, commits, and references are views over data the
//! repository's stores own. Handles are opened through the process-wide
//! registry, so two opens of the same location share one instance.

use crate::areas::object_store::ObjectStore;
use crate::areas::refs::{RefStore, RefTarget};
use crate::areas::registry;
use crate::artifacts::branch::ref_name::RefName;
use crate::artifacts::log::divergence;
use crate::artifacts::log::rev_walk::RevWalk;
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// Directory holding the stores inside a repository root
const REPOSITORY_DIR: &str = ".strata";

/// Branch HEAD points at in a freshly initialized repository
const DEFAULT_BRANCH: &str = "main";

/// Field overrides for amending a commit
///
/// Every field defaults to "keep the existing value"; only fields set to
/// `Some` replace what the amended commit carried. The parent list in
/// particular stays unchanged unless explicitly overridden.
#[derive(Debug, Clone, Default)]
pub struct CommitOverrides {
    pub tree: Option<ObjectId>,
    pub parents: Option<Vec<ObjectId>>,
    pub author: Option<Author>,
    pub committer: Option<Author>,
    pub message: Option<String>,
    pub signature: Option<String>,
}

pub struct Repository {
    path: Box<Path>,
    objects: ObjectStore,
    refs: RefStore,
}

impl Repository {
    /// Initialize the store layout at `path` and open a handle
    ///
    /// Creates the object and reference directories and a symbolic HEAD
    /// pointing at the unborn default branch. Re-initializing an existing
    /// repository is harmless.
    pub fn init(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            std::fs::create_dir_all(path)?;
        }

        let store_root = path.join(REPOSITORY_DIR);
        std::fs::create_dir_all(store_root.join("objects"))?;
        std::fs::create_dir_all(store_root.join("refs").join("heads"))?;

        let head_path = store_root.join("HEAD");
        if !head_path.exists() {
            std::fs::write(head_path, format!("ref: refs/heads/{DEFAULT_BRANCH}"))?;
        }

        Self::open(path)
    }

    /// Open a shared handle on an existing repository
    ///
    /// Handles on the same canonical location coalesce to one backing
    /// instance through the process-wide registry.
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let canonical = path.as_ref().canonicalize()?;

        registry::open_shared(&canonical, || {
            let store_root = canonical.join(REPOSITORY_DIR);
            if !store_root.is_dir() {
                return Err(Error::RepositoryNotFound(
                    canonical.display().to_string(),
                ));
            }

            Ok(Repository {
                objects: ObjectStore::new(store_root.join("objects").into_boxed_path()),
                refs: RefStore::new(store_root.into_boxed_path()),
                path: canonical.clone().into_boxed_path(),
            })
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn refs(&self) -> &RefStore {
        &self.refs
    }

    /// Resolve a reference name to an object id
    pub fn resolve(&self, name: &RefName) -> Result<ObjectId> {
        self.refs.resolve(name)
    }

    /// Resolve HEAD to the current commit id
    pub fn head(&self) -> Result<ObjectId> {
        self.refs.resolve_head()
    }

    /// Start an ancestry walk over this repository's objects
    pub fn walk(&self) -> RevWalk<'_> {
        RevWalk::new(&self.objects)
    }

    /// Create and store a commit
    ///
    /// Validates referential integrity first: the tree must exist in the
    /// object store ([`Error::MissingTree`]) and every parent must be an
    /// existing commit ([`Error::MissingParent`]).
    pub fn create_commit(
        &self,
        tree: ObjectId,
        parents: Vec<ObjectId>,
        author: Author,
        committer: Author,
        message: String,
    ) -> Result<(ObjectId, Commit)> {
        let commit = Commit::new(parents, tree, author, committer, message);

        self.store_validated_commit(commit)
    }

    /// Create a new commit copying `existing` with the given overrides
    ///
    /// The existing commit is never mutated; unspecified fields, including
    /// the parent list and any signature, are carried over unchanged.
    pub fn amend_commit(
        &self,
        existing: &ObjectId,
        overrides: CommitOverrides,
    ) -> Result<(ObjectId, Commit)> {
        let original = self.objects.parse_commit(existing)?;

        let mut amended = Commit::new(
            overrides
                .parents
                .unwrap_or_else(|| original.parents().to_vec()),
            overrides.tree.unwrap_or_else(|| original.tree_oid().clone()),
            overrides.author.unwrap_or_else(|| original.author().clone()),
            overrides
                .committer
                .unwrap_or_else(|| original.committer().clone()),
            overrides
                .message
                .unwrap_or_else(|| original.message().to_string()),
        );
        if let Some(signature) = overrides
            .signature
            .or_else(|| original.signature().map(str::to_string))
        {
            amended = amended.with_signature(signature);
        }

        self.store_validated_commit(amended)
    }

    fn store_validated_commit(&self, commit: Commit) -> Result<(ObjectId, Commit)> {
        let tree = commit.tree_oid();
        if !self.objects.contains(tree) || self.objects.object_type(tree)? != ObjectType::Tree {
            return Err(Error::MissingTree(tree.clone()));
        }

        for parent in commit.parents() {
            if !self.objects.contains(parent)
                || self.objects.object_type(parent)? != ObjectType::Commit
            {
                return Err(Error::MissingParent(parent.clone()));
            }
        }

        let oid = self.objects.store(&commit)?;
        tracing::debug!(%oid, summary = %commit.summary(), "created commit");

        Ok((oid, commit))
    }

    /// Follow first-parent links `n` times
    ///
    /// `n = 0` returns the commit itself. Fails with
    /// [`Error::AncestorNotFound`] when the first-parent chain runs out
    /// before `n` steps, reporting how many were available.
    pub fn nth_ancestor(&self, commit: &ObjectId, n: usize) -> Result<ObjectId> {
        let mut current = commit.clone();

        for step in 0..n {
            let parsed = self.objects.parse_commit(&current)?;
            match parsed.parent() {
                Some(parent) => current = parent.clone(),
                None => {
                    return Err(Error::AncestorNotFound {
                        requested: n,
                        available: step,
                    });
                }
            }
        }

        // Validate the endpoint even when no steps were taken
        if n == 0 {
            self.objects.parse_commit(&current)?;
        }

        Ok(current)
    }

    /// Divergence counts between two commits
    pub fn ahead_behind(&self, local: &ObjectId, upstream: &ObjectId) -> Result<(usize, usize)> {
        divergence::ahead_behind(&self.objects, local, upstream)
    }

    /// Divergence of a branch against its recorded upstream
    ///
    /// Returns `None` when the branch tracks no upstream.
    pub fn branch_divergence(&self, branch: &RefName) -> Result<Option<(usize, usize)>> {
        let upstream = match self.refs.upstream(branch)? {
            Some(upstream) => upstream,
            None => return Ok(None),
        };

        let local_oid = self.refs.resolve(branch)?;
        let upstream_oid = self.refs.resolve(&upstream)?;

        self.ahead_behind(&local_oid, &upstream_oid).map(Some)
    }

    /// Point HEAD at a branch, or detach it onto a commit
    pub fn set_head(&self, target: RefTarget) -> Result<()> {
        self.refs.set_head(target)
    }
}
