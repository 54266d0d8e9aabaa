//! Store components composing a repository
//!
//! - `object_store`: append-only, content-addressed object storage
//! - `refs`: mutable reference management (branches, HEAD, upstreams)
//! - `registry`: process-wide coalescing of open repository handles
//! - `repository`: composition root and high-level operations

pub mod object_store;
pub mod refs;
pub mod registry;
pub mod repository;
