//! A content-addressable version-control core.
//!
//! `strata` implements the logical object model a version-control system is
//! built on, without any working-tree, network, or CLI surface:
//!
//! - an append-only, content-addressed **object store** for blobs, trees and
//!   commits, keyed by the SHA-1 digest of their canonical encoding
//! - a mutable **reference store** mapping symbolic names to object ids or to
//!   other references
//! - a **revision walker** producing commit ancestry traversals with
//!   inclusion ("push") and exclusion ("hide") seeds
//! - divergence (**ahead/behind**) counting between two histories
//! - a **repository** composing the stores, opened through a process-wide
//!   registry that coalesces handles per canonical path
//!
//! All operations are synchronous. Reads are safe from multiple threads;
//! reference mutations serialize internally.

pub mod areas;
pub mod artifacts;
pub mod errors;

pub use areas::object_store::ObjectStore;
pub use areas::refs::{RefStore, RefTarget, RenameOutcome};
pub use areas::repository::{CommitOverrides, Repository};
pub use artifacts::branch::ref_name::{RefKind, RefName};
pub use artifacts::log::divergence::ahead_behind;
pub use artifacts::log::rev_walk::RevWalk;
pub use artifacts::objects::blob::Blob;
pub use artifacts::objects::commit::{Author, Commit};
pub use artifacts::objects::entry_mode::EntryMode;
pub use artifacts::objects::object_id::ObjectId;
pub use artifacts::objects::object_type::ObjectType;
pub use artifacts::objects::tree::{Tree, TreeBuilder, TreeEntry};
pub use errors::{Error, Result};
