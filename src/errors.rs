//! Error taxonomy shared by every store and traversal
//!
//! Every failure in this crate is a typed contract reported to the immediate
//! caller; nothing is retried or swallowed internally. A failed mutation
//! leaves the affected store in its prior state, except for the documented
//! partial outcome of a batch rename (see [`crate::areas::refs`]).

use crate::artifacts::objects::object_id::ObjectId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The path opened as a repository holds no store layout.
    #[error("no repository found at {0}")]
    RepositoryNotFound(String),

    /// No object with this id exists in the object store.
    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    /// An object decoded from the store violates the object grammar.
    #[error("corrupt object: {reason}")]
    CorruptObject { reason: String },

    /// A string failed to parse as an object id or encoded field.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A reference name contains forbidden characters or patterns.
    #[error("invalid reference name: {0}")]
    InvalidRefName(String),

    /// The named reference does not exist.
    #[error("reference {0} not found")]
    RefNotFound(String),

    /// A symbolic chain ended at a name that does not exist.
    #[error("reference {0} points to a nonexistent reference")]
    UnresolvedReference(String),

    /// A symbolic chain revisited a name it already followed.
    #[error("reference cycle detected at {0}")]
    ReferenceCycle(String),

    /// The target name of a create or rename is already taken.
    #[error("reference {0} already exists")]
    AlreadyExists(String),

    /// A branch-only operation was applied to a non-branch reference.
    #[error("reference {0} is not a branch")]
    NotABranch(String),

    /// A path segment was absent while descending a tree.
    #[error("path {0} not found")]
    PathNotFound(String),

    /// An intermediate path segment resolved to a non-tree object.
    #[error("path component {0} is not a directory")]
    NotADirectory(String),

    /// Commit creation referenced a tree absent from the object store.
    #[error("tree {0} does not exist")]
    MissingTree(ObjectId),

    /// Commit creation referenced a parent absent from the object store.
    #[error("parent commit {0} does not exist")]
    MissingParent(ObjectId),

    /// A first-parent chain ran out before the requested generation.
    #[error("no ancestor at generation {requested} (chain ends after {available})")]
    AncestorNotFound { requested: usize, available: usize },

    /// The caller-supplied abort flag was raised mid-traversal.
    #[error("operation aborted")]
    Aborted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a corruption error with a formatted reason.
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Error::CorruptObject {
            reason: reason.into(),
        }
    }

    /// Attach the offending object id to a decode failure.
    pub(crate) fn for_object(self, oid: &ObjectId) -> Self {
        match self {
            Error::CorruptObject { reason } => Error::CorruptObject {
                reason: format!("{oid}: {reason}"),
            },
            other => other,
        }
    }
}
