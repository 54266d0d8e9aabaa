//! Tree object
//!
//! Trees are directory snapshots: an ordered mapping from path segment to
//! (mode, object id). Entry names are unique within one tree and ordered by
//! byte-wise comparison; the ordering is canonical because it participates in
//! the tree's own content hash. Two trees holding the same entry set always
//! serialize to the same bytes and therefore share one object id, no matter
//! the insertion order.
//!
//! On disk: `tree <size>\0<entries>`, each entry `<mode> <name>\0<20-byte-id>`.
//!
//! [`TreeBuilder`] assembles nested trees from full slash-separated paths and
//! stores them bottom-up, children before parents, so every stored tree only
//! ever references already-existing objects.

use crate::areas::object_store::ObjectStore;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};
use bytes::Bytes;
use derive_new::new;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// A single tree entry: what a name points at
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub oid: ObjectId,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }
}

/// Directory snapshot object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    /// Build a tree from (name, mode, oid) triples
    ///
    /// Entries are re-sorted into canonical byte-wise order regardless of the
    /// iterator's order. Fails with [`Error::InvalidFormat`] on an empty or
    /// slash-containing name, or when a name repeats.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, EntryMode, ObjectId)>,
    ) -> Result<Self> {
        let mut tree = Self::default();

        for (name, mode, oid) in entries {
            tree.insert(name, mode, oid)?;
        }

        Ok(tree)
    }

    fn insert(&mut self, name: String, mode: EntryMode, oid: ObjectId) -> Result<()> {
        validate_entry_name(&name)?;

        if self
            .entries
            .insert(name.clone(), TreeEntry::new(mode, oid))
            .is_some()
        {
            return Err(Error::InvalidFormat(format!(
                "duplicate tree entry name: {name}"
            )));
        }

        Ok(())
    }

    /// Iterate entries in canonical (byte-wise ascending) name order
    ///
    /// The sequence is restartable; call it again for a fresh pass.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &TreeEntry)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, TreeEntry)> {
        self.entries.into_iter()
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidFormat(
            "tree entry name cannot be empty".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(Error::InvalidFormat(format!(
            "tree entry name contains forbidden character: {name}"
        )));
    }

    Ok(())
}

impl Packable for Tree {
    fn serialize(&self) -> Result<Bytes> {
        let mut content_bytes = Vec::new();

        // BTreeMap iteration is the canonical order
        for (name, entry) in &self.entries {
            let header = format!("{} {}", entry.mode.as_str(), name);
            content_bytes.write_all(header.as_bytes())?;
            content_bytes.push(0);
            entry.oid.write_h40_to(&mut content_bytes)?;
        }

        let mut tree_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        tree_bytes.write_all(header.as_bytes())?;
        tree_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(tree_bytes))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> Result<Self> {
        let mut entries = BTreeMap::new();
        let mut reader = reader;
        let mut last_name: Option<String> = None;

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            // Read "mode " (space-delimited)
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if *mode_bytes.last().unwrap() != b' ' {
                return Err(Error::corrupt("unexpected EOF in entry mode"));
            }
            mode_bytes.pop(); // drop the space

            let mode_str = std::str::from_utf8(&mode_bytes)
                .map_err(|_| Error::corrupt("entry mode is not valid UTF-8"))?;
            let mode = EntryMode::from_octal_str(mode_str)?;

            // Read "name\0"
            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || *name_bytes.last().unwrap() != b'\0' {
                return Err(Error::corrupt("unexpected EOF in entry name"));
            }
            name_bytes.pop(); // drop NUL
            let name = std::str::from_utf8(&name_bytes)
                .map_err(|_| Error::corrupt("entry name is not valid UTF-8"))?
                .to_owned();

            // Canonical encoding stores entries strictly ascending; anything
            // else (including duplicates) is corruption
            if let Some(previous) = &last_name
                && previous.as_bytes() >= name.as_bytes()
            {
                return Err(Error::corrupt(format!(
                    "tree entries out of order: {previous} before {name}"
                )));
            }
            last_name = Some(name.clone());

            let oid = ObjectId::read_h40_from(&mut reader)
                .map_err(|_| Error::corrupt("unexpected EOF in entry object id"))?;

            entries.insert(name, TreeEntry::new(mode, oid));
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }
}

/// Incremental builder for nested trees
///
/// Accepts full slash-separated paths, creating intermediate directories as
/// needed, then stores the whole hierarchy bottom-up in one call. Insertion
/// order never matters: each level is a canonically ordered map.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    entries: BTreeMap<String, BuilderEntry>,
}

#[derive(Debug, Clone)]
enum BuilderEntry {
    Leaf(TreeEntry),
    Directory(TreeBuilder),
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a leaf at a slash-separated path, creating parent trees
    ///
    /// Fails with [`Error::InvalidFormat`] on an empty path or segment, when
    /// a leaf already occupies an intermediate segment, or when the final
    /// segment is already a directory.
    pub fn insert(&mut self, path: &str, mode: EntryMode, oid: ObjectId) -> Result<()> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(Error::InvalidFormat(format!("invalid tree path: {path}")));
        }

        self.insert_segments(&segments, path, mode, oid)
    }

    fn insert_segments(
        &mut self,
        segments: &[&str],
        full_path: &str,
        mode: EntryMode,
        oid: ObjectId,
    ) -> Result<()> {
        let (head, rest) = match segments.split_first() {
            Some(split) => split,
            None => return Err(Error::InvalidFormat("empty tree path".to_string())),
        };
        validate_entry_name(head)?;

        if rest.is_empty() {
            match self.entries.get(*head) {
                Some(BuilderEntry::Directory(_)) => Err(Error::InvalidFormat(format!(
                    "path {full_path} is already a directory"
                ))),
                Some(BuilderEntry::Leaf(_)) => Err(Error::InvalidFormat(format!(
                    "duplicate tree entry name: {full_path}"
                ))),
                None => {
                    self.entries
                        .insert(head.to_string(), BuilderEntry::Leaf(TreeEntry::new(mode, oid)));
                    Ok(())
                }
            }
        } else {
            let child = self
                .entries
                .entry(head.to_string())
                .or_insert_with(|| BuilderEntry::Directory(TreeBuilder::new()));

            match child {
                BuilderEntry::Directory(builder) => {
                    builder.insert_segments(rest, full_path, mode, oid)
                }
                BuilderEntry::Leaf(_) => Err(Error::InvalidFormat(format!(
                    "path component of {full_path} is not a directory"
                ))),
            }
        }
    }

    /// Store every tree in the hierarchy, children first, returning the root id
    pub fn write_to(&self, store: &ObjectStore) -> Result<ObjectId> {
        let mut entries = Vec::with_capacity(self.entries.len());

        for (name, entry) in &self.entries {
            let resolved = match entry {
                BuilderEntry::Leaf(leaf) => (name.clone(), leaf.mode, leaf.oid.clone()),
                BuilderEntry::Directory(builder) => {
                    let child_oid = builder.write_to(store)?;
                    (name.clone(), EntryMode::Directory, child_oid)
                }
            };
            entries.push(resolved);
        }

        let tree = Tree::from_entries(entries)?;
        store.store(&tree)
    }
}
