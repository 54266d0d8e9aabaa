use crate::artifacts::branch::INVALID_REF_NAME_REGEX;
use crate::errors::{Error, Result};
use std::sync::OnceLock;

pub const HEAD_REF_NAME: &str = "HEAD";

const LOCAL_BRANCH_PREFIX: &str = "refs/heads/";
const REMOTE_BRANCH_PREFIX: &str = "refs/remotes/";

fn invalid_name_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(INVALID_REF_NAME_REGEX).expect("invalid reference name regex")
    })
}

/// What a reference name is allowed to do
///
/// Branch-specific operations (upstream tracking, divergence against an
/// upstream) are capabilities of the branch kinds only; there is no subtype
/// relationship between branches and plain references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Generic,
    LocalBranch,
    RemoteBranch,
}

/// Validated reference name
///
/// Full path form, e.g. `HEAD`, `refs/heads/main`, `refs/remotes/origin/main`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefName(String);

impl RefName {
    /// Parse and validate a full reference name
    ///
    /// Fails with [`Error::InvalidRefName`] on empty names and on names
    /// containing forbidden characters or patterns (leading dots, `..`,
    /// trailing `.lock`, control characters, glob characters, ...).
    pub fn try_parse(name: impl Into<String>) -> Result<Self> {
        let name: String = name.into();

        if name.is_empty() {
            return Err(Error::InvalidRefName(
                "reference name cannot be empty".to_string(),
            ));
        }
        if invalid_name_pattern().is_match(&name) {
            return Err(Error::InvalidRefName(name));
        }

        Ok(Self(name))
    }

    /// The `HEAD` reference name
    pub fn head() -> Self {
        Self(HEAD_REF_NAME.to_string())
    }

    /// Build a local branch name under `refs/heads/`
    pub fn local_branch(short_name: &str) -> Result<Self> {
        Self::try_parse(format!("{LOCAL_BRANCH_PREFIX}{short_name}"))
    }

    /// Build a remote-tracking branch name under `refs/remotes/`
    pub fn remote_branch(remote: &str, short_name: &str) -> Result<Self> {
        Self::try_parse(format!("{REMOTE_BRANCH_PREFIX}{remote}/{short_name}"))
    }

    pub fn kind(&self) -> RefKind {
        if self.0.starts_with(LOCAL_BRANCH_PREFIX) {
            RefKind::LocalBranch
        } else if self.0.starts_with(REMOTE_BRANCH_PREFIX) {
            RefKind::RemoteBranch
        } else {
            RefKind::Generic
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.kind(), RefKind::LocalBranch | RefKind::RemoteBranch)
    }

    pub fn is_head(&self) -> bool {
        self.0 == HEAD_REF_NAME
    }

    /// Name without the branch namespace prefix, e.g. `main` for
    /// `refs/heads/main`; generic names are returned unchanged
    pub fn short_name(&self) -> &str {
        self.0
            .strip_prefix(LOCAL_BRANCH_PREFIX)
            .or_else(|| self.0.strip_prefix(REMOTE_BRANCH_PREFIX))
            .unwrap_or(&self.0)
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_kind_discrimination() {
        assert_eq!(RefName::head().kind(), RefKind::Generic);
        assert_eq!(
            RefName::try_parse("refs/heads/main").unwrap().kind(),
            RefKind::LocalBranch
        );
        assert_eq!(
            RefName::try_parse("refs/remotes/origin/main").unwrap().kind(),
            RefKind::RemoteBranch
        );
        assert_eq!(
            RefName::try_parse("refs/tags/v1").unwrap().kind(),
            RefKind::Generic
        );
    }

    #[test]
    fn test_short_name_strips_namespace() {
        assert_eq!(
            RefName::try_parse("refs/heads/feature/x").unwrap().short_name(),
            "feature/x"
        );
        assert_eq!(
            RefName::try_parse("refs/remotes/origin/main").unwrap().short_name(),
            "origin/main"
        );
        assert_eq!(RefName::head().short_name(), "HEAD");
    }

    #[test]
    fn test_empty_name_is_invalid() {
        assert!(matches!(
            RefName::try_parse(""),
            Err(Error::InvalidRefName(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_simple_names_are_valid(name in "[a-zA-Z0-9_-]+") {
            prop_assert!(RefName::try_parse(name).is_ok());
        }

        #[test]
        fn prop_hierarchical_names_are_valid(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let name = format!("{}/{}", prefix, suffix);
            prop_assert!(RefName::try_parse(name).is_ok());
        }

        #[test]
        fn prop_leading_dot_is_invalid(suffix in "[a-zA-Z0-9_-]+") {
            let name = format!(".{}", suffix);
            prop_assert!(RefName::try_parse(name).is_err());
        }

        #[test]
        fn prop_lock_suffix_is_invalid(prefix in "[a-zA-Z0-9_-]+") {
            let name = format!("{}.lock", prefix);
            prop_assert!(RefName::try_parse(name).is_err());
        }

        #[test]
        fn prop_consecutive_dots_are_invalid(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let name = format!("{}..{}", prefix, suffix);
            prop_assert!(RefName::try_parse(name).is_err());
        }

        #[test]
        fn prop_special_characters_are_invalid(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+",
            special_char in r"[\*:\?\[\\^~]"
        ) {
            let name = format!("{}{}{}", prefix, special_char, suffix);
            prop_assert!(RefName::try_parse(name).is_err());
        }
    }
}
