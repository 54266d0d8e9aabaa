//! Commit object
//!
//! Commits are snapshots with history. Each one references exactly one tree,
//! zero or more parents (zero for an initial commit, two or more for a
//! merge), distinct author and committer identities, a free-text message,
//! and an optional raw detached signature.
//!
//! On disk:
//!
//! ```text
//! commit <size>\0
//! tree <tree-id>
//! parent <parent-id>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//! gpgsig <first signature line>
//!  <continuation lines, space-indented>
//!
//! <commit message>
//! ```
//!
//! The commit DAG is acyclic by construction: an object id cannot reference
//! a not-yet-created object. A cycle encountered anyway is corruption and is
//! surfaced by the traversal layer rather than looped on.

use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};
use bytes::Bytes;
use std::io::{BufRead, Write};

/// Author or committer identity
///
/// Name, email, and a timestamp carrying its timezone offset.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    email: String,
    timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl Author {
    /// Create an identity stamped with the current local time
    pub fn new(name: String, email: String) -> Self {
        Author {
            name,
            email,
            timestamp: chrono::Local::now().fixed_offset(),
        }
    }

    pub fn new_with_timestamp(
        name: String,
        email: String,
        timestamp: chrono::DateTime<chrono::FixedOffset>,
    ) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    /// Format as "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// Format as the encoded header payload: "Name <email> epoch +0000"
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.timestamp
    }
}

impl TryFrom<&str> for Author {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        // Format: "name <email> timestamp timezone"
        // Split from the right to peel timezone and timestamp first
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            return Err(Error::corrupt(format!("invalid identity line: {value}")));
        }

        let timezone = parts[0];
        let timestamp = parts[1]
            .parse::<i64>()
            .map_err(|_| Error::corrupt(format!("invalid identity timestamp: {}", parts[1])))?;
        let name_email_part = parts[2]; // "name <email>"

        let email_start = name_email_part
            .find('<')
            .ok_or_else(|| Error::corrupt("identity line missing '<'"))?;
        let email_end = name_email_part
            .find('>')
            .ok_or_else(|| Error::corrupt("identity line missing '>'"))?;

        let name = name_email_part[..email_start].trim().to_string();
        let email = name_email_part[email_start + 1..email_end].to_string();

        let offset = parse_timezone_offset(timezone)?;
        let datetime = chrono::DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| Error::corrupt(format!("invalid identity timestamp: {timestamp}")))?
            .with_timezone(&offset);

        Ok(Author {
            name,
            email,
            timestamp: datetime,
        })
    }
}

/// Parse a `+HHMM` / `-HHMM` timezone offset as encoded by `%z`
fn parse_timezone_offset(timezone: &str) -> Result<chrono::FixedOffset> {
    let corrupt = || Error::corrupt(format!("invalid identity timezone: {timezone}"));

    let (sign, digits) = match timezone.split_at_checked(1) {
        Some(("+", digits)) => (1, digits),
        Some(("-", digits)) => (-1, digits),
        _ => return Err(corrupt()),
    };
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(corrupt());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| corrupt())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| corrupt())?;

    chrono::FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(corrupt)
}

/// Snapshot-with-history object
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// Parent ids: empty for an initial commit, several for a merge
    parents: Vec<ObjectId>,
    /// Tree id representing the directory snapshot
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    message: String,
    /// Raw detached signature, when present
    signature: Option<String>,
}

impl Commit {
    pub fn new(
        parents: Vec<ObjectId>,
        tree_oid: ObjectId,
        author: Author,
        committer: Author,
        message: String,
    ) -> Self {
        Commit {
            parents,
            tree_oid,
            author,
            committer,
            message,
            signature: None,
        }
    }

    /// Attach a raw detached signature, replacing any existing one
    pub fn with_signature(mut self, signature: String) -> Self {
        self.signature = Some(signature);
        self
    }

    /// First blank-line-delimited paragraph of the message, trimmed
    pub fn summary(&self) -> String {
        split_message(&self.message).0
    }

    /// Everything after the first blank line, trimmed; empty when absent
    pub fn body(&self) -> String {
        split_message(&self.message).1
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    /// First parent, the one followed by ancestor chains
    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Commit time used for traversal ordering
    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.committer.timestamp()
    }
}

fn split_message(message: &str) -> (String, String) {
    let trimmed = message.trim();
    let lines: Vec<&str> = trimmed.lines().collect();

    // The separator is the first whitespace-only line, not just a literally
    // empty one
    match lines.iter().position(|line| line.trim().is_empty()) {
        Some(index) => (
            lines[..index].join("\n").trim().to_string(),
            lines[index + 1..].join("\n").trim().to_string(),
        ),
        None => (trimmed.to_string(), String::new()),
    }
}

impl Packable for Commit {
    fn serialize(&self) -> Result<Bytes> {
        let mut object_content = vec![];

        object_content.push(format!("tree {}", self.tree_oid.as_ref()));
        for parent in &self.parents {
            object_content.push(format!("parent {}", parent.as_ref()));
        }
        object_content.push(format!("author {}", self.author.display()));
        object_content.push(format!("committer {}", self.committer.display()));
        if let Some(signature) = &self.signature {
            // Continuation lines are space-indented under the gpgsig header
            let mut lines = signature.lines();
            object_content.push(format!("gpgsig {}", lines.next().unwrap_or_default()));
            for line in lines {
                object_content.push(format!(" {line}"));
            }
        }
        object_content.push(String::new());
        object_content.push(self.message.to_string());

        let object_content = object_content.join("\n");

        let mut content_bytes = Vec::new();
        content_bytes.write_all(object_content.as_bytes())?;

        let mut commit_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        commit_bytes.write_all(header.as_bytes())?;
        commit_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(commit_bytes))
    }
}

impl Unpackable for Commit {
    fn deserialize(reader: impl BufRead) -> Result<Self> {
        let content = reader
            .bytes()
            .collect::<std::result::Result<Vec<u8>, std::io::Error>>()?;

        let content = String::from_utf8(content)
            .map_err(|_| Error::corrupt("commit payload is not valid UTF-8"))?;
        let mut lines = content.lines().peekable();

        let tree_line = lines
            .next()
            .ok_or_else(|| Error::corrupt("missing tree line"))?;
        let tree_oid = tree_line
            .strip_prefix("tree ")
            .ok_or_else(|| Error::corrupt("invalid tree line"))?;
        let tree_oid = ObjectId::try_parse(tree_oid).map_err(|_| {
            Error::corrupt(format!("invalid tree id: {tree_oid}"))
        })?;

        // Parse all parent lines (there can be 0, 1, or multiple parents)
        let mut parents = Vec::new();
        let mut next_line = lines
            .next()
            .ok_or_else(|| Error::corrupt("missing author line"))?;

        while let Some(parent_oid) = next_line.strip_prefix("parent ") {
            parents.push(ObjectId::try_parse(parent_oid).map_err(|_| {
                Error::corrupt(format!("invalid parent id: {parent_oid}"))
            })?);

            next_line = lines
                .next()
                .ok_or_else(|| Error::corrupt("missing author line"))?;
        }

        let author = next_line
            .strip_prefix("author ")
            .ok_or_else(|| Error::corrupt("invalid author line"))?;
        let author = Author::try_from(author)?;

        let committer_line = lines
            .next()
            .ok_or_else(|| Error::corrupt("missing committer line"))?;
        let committer = committer_line
            .strip_prefix("committer ")
            .ok_or_else(|| Error::corrupt("invalid committer line"))?;
        let committer = Author::try_from(committer)?;

        // Optional signature with space-indented continuation lines
        let mut signature = None;
        if let Some(line) = lines.peek()
            && let Some(first) = line.strip_prefix("gpgsig ")
        {
            let mut collected = vec![first.to_string()];
            lines.next();
            while let Some(line) = lines.peek()
                && let Some(continuation) = line.strip_prefix(' ')
            {
                collected.push(continuation.to_string());
                lines.next();
            }
            signature = Some(collected.join("\n"));
        }

        // skip the blank separator line
        match lines.next() {
            Some("") => {}
            _ => return Err(Error::corrupt("missing blank line before message")),
        }

        let message = lines.collect::<Vec<&str>>().join("\n");
        let mut commit = Self::new(parents, tree_oid, author, committer, message);
        if let Some(signature) = signature {
            commit = commit.with_signature(signature);
        }

        Ok(commit)
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn oid(fill: char) -> ObjectId {
        ObjectId::try_parse(fill.to_string().repeat(40)).unwrap()
    }

    fn author() -> Author {
        let timestamp = chrono::DateTime::parse_from_rfc3339("2024-03-01T12:00:00+02:00").unwrap();
        Author::new_with_timestamp("Ada".to_string(), "ada@example.com".to_string(), timestamp)
    }

    fn round_trip(commit: &Commit) -> Commit {
        let bytes = commit.serialize().unwrap();
        let mut reader = std::io::Cursor::new(bytes);
        ObjectType::parse_object_type(&mut reader).unwrap();
        Commit::deserialize(reader).unwrap()
    }

    #[test]
    fn test_summary_and_body_split_on_first_blank_line() {
        let commit = Commit::new(
            vec![],
            oid('f'),
            author(),
            author(),
            "Add walker\n\nFirst paragraph of the body.\n\nSecond paragraph.".to_string(),
        );

        assert_eq!(commit.summary(), "Add walker");
        assert_eq!(
            commit.body(),
            "First paragraph of the body.\n\nSecond paragraph."
        );
    }

    #[test]
    fn test_whitespace_only_separator_line_splits_the_message() {
        let commit = Commit::new(
            vec![],
            oid('f'),
            author(),
            author(),
            "Summary line\n \t\nBody text".to_string(),
        );

        assert_eq!(commit.summary(), "Summary line");
        assert_eq!(commit.body(), "Body text");
    }

    #[test]
    fn test_summary_of_single_paragraph_message() {
        let commit = Commit::new(
            vec![],
            oid('f'),
            author(),
            author(),
            "  Only a summary  ".to_string(),
        );

        assert_eq!(commit.summary(), "Only a summary");
        assert_eq!(commit.body(), "");
    }

    #[test]
    fn test_round_trip_with_parents() {
        let commit = Commit::new(
            vec![oid('1'), oid('2')],
            oid('f'),
            author(),
            author(),
            "Merge the branches".to_string(),
        );

        assert_eq!(round_trip(&commit), commit);
    }

    #[test]
    fn test_round_trip_preserves_signature() {
        let signature = "-----BEGIN SIGNATURE-----\nabcdef\n-----END SIGNATURE-----";
        let commit = Commit::new(
            vec![oid('1')],
            oid('f'),
            author(),
            author(),
            "Signed work".to_string(),
        )
        .with_signature(signature.to_string());

        let decoded = round_trip(&commit);
        assert_eq!(decoded.signature(), Some(signature));
        assert_eq!(decoded, commit);
    }

    #[test]
    fn test_identity_line_round_trip() {
        let original = author();
        let parsed = Author::try_from(original.display().as_str()).unwrap();

        assert_eq!(parsed.display(), original.display());
    }

    #[test]
    fn test_missing_tree_line_is_corrupt() {
        let payload = "author Ada <ada@example.com> 0 +0000";
        let result = Commit::deserialize(std::io::Cursor::new(payload.as_bytes()));

        assert!(matches!(result, Err(Error::CorruptObject { .. })));
    }
}
