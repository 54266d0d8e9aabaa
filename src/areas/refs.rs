//! Reference store (branches, HEAD, upstream tracking)
//!
//! References are human-readable names pointing either directly at an object
//! id or at another reference (symbolic). They are the only mutable state in
//! the model: a direct reference's target can be replaced without changing
//! its name (branch fast-forward), and references can be created, renamed,
//! and deleted.
//!
//! ## File format
//!
//! References are text files under the store root containing either a
//! 40-character hex id (direct) or `ref: <name>` (symbolic). `HEAD` lives at
//! the root; branches under `refs/heads/` and `refs/remotes/`.
//!
//! ## Concurrency
//!
//! Reads never mutate visible state and are safe from any thread. Mutations
//! serialize through a store-level mutex plus an exclusive advisory lock on
//! a shared lock file, so two processes cannot interleave mutations either.
//! Reference files are replaced by staging a temp file and renaming it into
//! place: a reader sees the old target or the new one, never a torn write.
//! A failed mutation leaves the store as it was, except for the documented
//! partial outcome of [`RefStore::rename_many`].

use crate::artifacts::branch::ref_name::RefName;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, Result};
use file_guard::{FileGuard, Lock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};
use walkdir::WalkDir;

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// File holding the branch-to-upstream table
const UPSTREAMS_FILE: &str = "upstreams.toml";

/// Advisory lock file serializing mutations across processes
const LOCK_FILE: &str = "refs.lock";

fn symref_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(SYMREF_REGEX).expect("invalid symref regex"))
}

/// What a reference points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    /// Direct object id
    Direct(ObjectId),
    /// Symbolic reference pointing to another ref
    Symbolic(RefName),
}

impl RefTarget {
    fn encode(&self) -> String {
        match self {
            RefTarget::Direct(oid) => oid.to_string(),
            RefTarget::Symbolic(name) => format!("ref: {name}"),
        }
    }
}

/// Outcome of a batch rename
///
/// Each individual rename either fully succeeds (listed in `renamed`) or is
/// reported with its failure (listed in `skipped`) without touching the
/// reference; there is no other partial state.
#[derive(Debug, Default)]
pub struct RenameOutcome {
    pub renamed: Vec<RefName>,
    pub skipped: Vec<(RefName, Error)>,
}

/// Branch-to-upstream table persisted next to the references
#[derive(Debug, Default, Serialize, Deserialize)]
struct UpstreamTable {
    #[serde(default)]
    upstream: BTreeMap<String, String>,
}

/// Reference manager rooted at one directory
#[derive(Debug)]
pub struct RefStore {
    path: Box<Path>,
    /// Serializes all reference mutations within this process
    mutation_lock: Mutex<()>,
}

/// Exclusive hold on all reference mutations for its lifetime: in-process
/// through the store mutex, cross-process through the lock file.
struct MutationGuard<'s> {
    _mutex: MutexGuard<'s, ()>,
    _file: FileGuard<Box<File>>,
}

impl RefStore {
    pub fn new(path: Box<Path>) -> Self {
        RefStore {
            path,
            mutation_lock: Mutex::new(()),
        }
    }

    fn lock_mutations(&self) -> Result<MutationGuard<'_>> {
        let mutex = self.mutation_lock.lock().expect("mutation lock poisoned");

        let lock_file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(self.path.join(LOCK_FILE))?;
        let file = file_guard::lock(Box::new(lock_file), Lock::Exclusive, 0, 1)?;

        Ok(MutationGuard {
            _mutex: mutex,
            _file: file,
        })
    }

    fn ref_path(&self, name: &RefName) -> PathBuf {
        self.path.join(name.as_ref())
    }

    fn read_target_at(&self, path: &Path) -> Result<Option<RefTarget>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        if let Some(symref_match) = symref_pattern().captures(content) {
            Ok(Some(RefTarget::Symbolic(RefName::try_parse(
                symref_match[1].to_string(),
            )?)))
        } else {
            Ok(Some(RefTarget::Direct(ObjectId::try_parse(content)?)))
        }
    }

    /// Whether the named reference exists
    pub fn exists(&self, name: &RefName) -> bool {
        self.ref_path(name).is_file()
    }

    /// Read a reference's stored target without following symbolic links
    pub fn read(&self, name: &RefName) -> Result<RefTarget> {
        self.read_target_at(&self.ref_path(name))?
            .ok_or_else(|| Error::RefNotFound(name.to_string()))
    }

    /// Resolve a reference to the object id at the end of its chain
    ///
    /// Symbolic chains are followed with a visited set: a name that repeats
    /// fails with [`Error::ReferenceCycle`], and a chain that ends at a
    /// nonexistent name fails with [`Error::UnresolvedReference`]. Resolving
    /// a name that does not exist at all fails with [`Error::RefNotFound`].
    pub fn resolve(&self, name: &RefName) -> Result<ObjectId> {
        let mut visited = HashSet::new();
        let mut current = name.clone();
        let mut first_hop = true;

        loop {
            if !visited.insert(current.clone()) {
                return Err(Error::ReferenceCycle(current.to_string()));
            }

            match self.read_target_at(&self.ref_path(&current))? {
                Some(RefTarget::Direct(oid)) => return Ok(oid),
                Some(RefTarget::Symbolic(next)) => {
                    first_hop = false;
                    current = next;
                }
                None if first_hop => return Err(Error::RefNotFound(current.to_string())),
                None => return Err(Error::UnresolvedReference(current.to_string())),
            }
        }
    }

    /// The terminal symbolic name reached from `source` (default `HEAD`)
    ///
    /// Follows symbolic links until a name that is direct or unborn; that
    /// name is the "current" reference, e.g. the active branch under HEAD.
    pub fn current_ref(&self, source: Option<RefName>) -> Result<RefName> {
        let mut visited = HashSet::new();
        let mut current = source.unwrap_or_else(RefName::head);

        loop {
            if !visited.insert(current.clone()) {
                return Err(Error::ReferenceCycle(current.to_string()));
            }

            match self.read_target_at(&self.ref_path(&current))? {
                Some(RefTarget::Symbolic(next)) => current = next,
                Some(RefTarget::Direct(_)) | None => return Ok(current),
            }
        }
    }

    /// Create a reference
    ///
    /// Fails with [`Error::AlreadyExists`] when the name is taken, unless
    /// `force` is set, in which case the existing target is overwritten.
    pub fn create(&self, name: &RefName, target: RefTarget, force: bool) -> Result<()> {
        let _guard = self.lock_mutations()?;

        if self.exists(name) && !force {
            return Err(Error::AlreadyExists(name.to_string()));
        }

        tracing::debug!(name = %name, "creating reference");
        self.write_ref_file(&self.ref_path(name), target.encode())
    }

    /// Replace the id at the end of a reference's symbolic chain
    ///
    /// Follows indirection like a resolve, then overwrites the terminal
    /// direct reference in place (branch fast-forward). An unborn terminal
    /// name is created.
    pub fn update(&self, name: &RefName, oid: ObjectId) -> Result<()> {
        let _guard = self.lock_mutations()?;

        let terminal = self.current_ref(Some(name.clone()))?;
        tracing::debug!(name = %terminal, target = %oid, "updating reference");
        self.write_ref_file(&self.ref_path(&terminal), oid.to_string())
    }

    /// Rename a reference, all-or-nothing
    ///
    /// Fails with [`Error::RefNotFound`] when `old` is absent and with
    /// [`Error::AlreadyExists`] when `new` is taken and `force` is not set;
    /// in every failure case `old` keeps resolving to its original target.
    pub fn rename(&self, old: &RefName, new: &RefName, force: bool) -> Result<()> {
        let _guard = self.lock_mutations()?;

        self.rename_locked(old, new, force)
    }

    fn rename_locked(&self, old: &RefName, new: &RefName, force: bool) -> Result<()> {
        if !self.exists(old) {
            return Err(Error::RefNotFound(old.to_string()));
        }
        if self.exists(new) && !force {
            return Err(Error::AlreadyExists(new.to_string()));
        }

        let new_path = self.ref_path(new);
        std::fs::create_dir_all(new_path.parent().ok_or_else(|| {
            Error::InvalidRefName(format!("reference {new} has no parent directory"))
        })?)?;

        // One rename syscall keeps the reference either fully at the old
        // name or fully at the new one
        let old_path = self.ref_path(old);
        std::fs::rename(&old_path, &new_path)?;
        self.prune_empty_parent_dirs(&old_path)?;

        tracing::debug!(old = %old, new = %new, "renamed reference");
        Ok(())
    }

    /// Rename a batch of references, reporting per-name outcomes
    ///
    /// Each pair is attempted independently under one mutation lock; names
    /// that cannot be renamed (missing source, target collision) are
    /// collected in the outcome's `skipped` list with their failure, while
    /// the rest are renamed normally.
    pub fn rename_many(
        &self,
        renames: &[(RefName, RefName)],
        force: bool,
    ) -> Result<RenameOutcome> {
        let _guard = self.lock_mutations()?;

        let mut outcome = RenameOutcome::default();
        for (old, new) in renames {
            match self.rename_locked(old, new, force) {
                Ok(()) => outcome.renamed.push(new.clone()),
                Err(error) => outcome.skipped.push((old.clone(), error)),
            }
        }

        Ok(outcome)
    }

    /// Delete a reference
    ///
    /// Fails with [`Error::RefNotFound`] when absent; otherwise removes the
    /// reference and returns its last stored target. No cascading state is
    /// touched.
    pub fn delete(&self, name: &RefName) -> Result<RefTarget> {
        let _guard = self.lock_mutations()?;

        let ref_path = self.ref_path(name);
        let target = self
            .read_target_at(&ref_path)?
            .ok_or_else(|| Error::RefNotFound(name.to_string()))?;

        std::fs::remove_file(&ref_path)?;
        self.prune_empty_parent_dirs(&ref_path)?;

        tracing::debug!(name = %name, "deleted reference");
        Ok(target)
    }

    /// List every reference name, sorted
    ///
    /// Includes `HEAD` when present and everything under `refs/`.
    pub fn list(&self) -> Result<Vec<RefName>> {
        let mut names: Vec<RefName> = WalkDir::new(self.refs_path())
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let relative_path = entry.path().strip_prefix(self.path.as_ref()).ok()?;
                RefName::try_parse(relative_path.to_string_lossy().to_string()).ok()
            })
            .collect();

        if self.exists(&RefName::head()) {
            names.push(RefName::head());
        }
        names.sort();

        Ok(names)
    }

    /// Point HEAD at a branch (symbolic) or directly at a commit (detached)
    pub fn set_head(&self, target: RefTarget) -> Result<()> {
        let _guard = self.lock_mutations()?;

        self.write_ref_file(&self.ref_path(&RefName::head()), target.encode())
    }

    /// Resolve HEAD to an object id
    pub fn resolve_head(&self) -> Result<ObjectId> {
        self.resolve(&RefName::head())
    }

    /// Record or clear the upstream of a branch
    ///
    /// Both names must carry a branch kind; anything else fails with
    /// [`Error::NotABranch`].
    pub fn set_upstream(&self, branch: &RefName, upstream: Option<&RefName>) -> Result<()> {
        if !branch.is_branch() {
            return Err(Error::NotABranch(branch.to_string()));
        }
        if let Some(upstream) = upstream
            && !upstream.is_branch()
        {
            return Err(Error::NotABranch(upstream.to_string()));
        }

        let _guard = self.lock_mutations()?;

        let mut table = self.load_upstreams()?;
        match upstream {
            Some(upstream) => {
                table
                    .upstream
                    .insert(branch.to_string(), upstream.to_string());
            }
            None => {
                table.upstream.remove(branch.as_ref());
            }
        }
        self.save_upstreams(&table)
    }

    /// Look up the upstream recorded for a branch
    pub fn upstream(&self, branch: &RefName) -> Result<Option<RefName>> {
        if !branch.is_branch() {
            return Err(Error::NotABranch(branch.to_string()));
        }

        let table = self.load_upstreams()?;
        table
            .upstream
            .get(branch.as_ref())
            .map(|name| RefName::try_parse(name.clone()))
            .transpose()
    }

    fn load_upstreams(&self) -> Result<UpstreamTable> {
        let path = self.path.join(UPSTREAMS_FILE);
        if !path.exists() {
            return Ok(UpstreamTable::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|error| Error::InvalidFormat(format!("invalid upstream table: {error}")))
    }

    fn save_upstreams(&self, table: &UpstreamTable) -> Result<()> {
        let content = toml::to_string(table)
            .map_err(|error| Error::InvalidFormat(format!("invalid upstream table: {error}")))?;

        self.write_ref_file(&self.path.join(UPSTREAMS_FILE), content)
    }

    fn write_ref_file(&self, path: &Path, raw_ref: String) -> Result<()> {
        std::fs::create_dir_all(path.parent().ok_or_else(|| {
            Error::InvalidRefName(format!("no parent directory for {}", path.display()))
        })?)?;

        // Stage at the store root (outside the listed refs/ namespace) and
        // rename into place, so a reader sees the old target or the new
        // one, never an empty or partial file
        let temp_path = self
            .path
            .join(format!("tmp-ref-{}", uuid::Uuid::new_v4().simple()));
        let mut temp_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;

        let written = temp_file
            .write_all(raw_ref.as_bytes())
            .and_then(|()| std::fs::rename(&temp_path, path));
        if let Err(error) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(error.into());
        }

        Ok(())
    }

    fn prune_empty_parent_dirs(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && parent != self.path.as_ref()
            && parent.exists()
            && parent.read_dir()?.next().is_none()
        {
            std::fs::remove_dir(parent)?;
            self.prune_empty_parent_dirs(parent)?;
        }

        Ok(())
    }

    pub fn head_path(&self) -> Box<Path> {
        self.path.join("HEAD").into_boxed_path()
    }

    pub fn refs_path(&self) -> Box<Path> {
        self.path.join("refs").into_boxed_path()
    }
}
