//! Reference naming
//!
//! Validated reference names and the branch-kind discriminator used to gate
//! branch-only capabilities such as upstream tracking.

pub mod ref_name;

/// Patterns a reference name must not contain
pub const INVALID_REF_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";
