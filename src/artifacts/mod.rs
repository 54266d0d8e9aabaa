//! Core data structures and algorithms
//!
//! - `branch`: validated reference names and branch kinds
//! - `log`: commit history traversal and divergence counting
//! - `objects`: object types (blob, tree, commit) and identifiers

pub mod branch;
pub mod log;
pub mod objects;
