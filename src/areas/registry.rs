//! Process-wide registry of open repositories
//!
//! Multiple opens of the same on-disk location coalesce to one shared,
//! reference-counted [`Repository`] so callers share its stores. The
//! registry holds weak handles keyed by canonical path: dropping the last
//! strong handle tears the backing instance down, and the stale entry is
//! purged on the next registry access.

use crate::areas::repository::Repository;
use crate::errors::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, Weak};

fn registry() -> &'static Mutex<HashMap<PathBuf, Weak<Repository>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<PathBuf, Weak<Repository>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Fetch the shared handle for a canonical location, building it on demand
pub(crate) fn open_shared<F>(canonical_path: &Path, build: F) -> Result<Arc<Repository>>
where
    F: FnOnce() -> Result<Repository>,
{
    let mut open_repositories = registry().lock().expect("repository registry poisoned");

    // Drop entries whose last strong handle is gone
    open_repositories.retain(|_, weak| weak.strong_count() > 0);

    if let Some(existing) = open_repositories
        .get(canonical_path)
        .and_then(Weak::upgrade)
    {
        return Ok(existing);
    }

    let repository = Arc::new(build()?);
    open_repositories.insert(canonical_path.to_path_buf(), Arc::downgrade(&repository));
    tracing::debug!(path = %canonical_path.display(), "opened repository");

    Ok(repository)
}
