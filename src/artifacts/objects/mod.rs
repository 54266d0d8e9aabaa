//! Object types and canonical encoding
//!
//! All content is stored as objects identified by SHA-1 digests. There are
//! three kinds:
//!
//! - **Blob**: opaque byte payload (file content)
//! - **Tree**: directory snapshot (names, modes, and object ids)
//! - **Commit**: snapshot with history (tree, parents, author, message)
//!
//! Every object serializes to the canonical form `<kind> <size>\0<payload>`;
//! the digest of those bytes is the object's identity, so equal content
//! always yields an equal id.

pub mod blob;
pub mod commit;
pub mod entry_mode;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of a SHA-1 digest in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Number of hex characters in the default abbreviated object id
pub const SHORT_OID_LENGTH: usize = 7;
