// src/repository/cache.rs

//! Index store with a per-session parse cache
//!
//! Parsed indexes are cached keyed by absolute path and modification time. A
//! changed mtime makes the entry stale, and callers that just produced a new
//! binary package must call [`IndexStore::invalidate`] for the index it went
//! into, because resolution decisions depend on the binary versions.

use crate::error::{Error, Result};
use crate::repository::index::{self, IndexRecord};
use crate::repository::selector::{pick_provider, ProviderContext};
use crate::repository::table::{insert_provider, ProviderTable, Providers};
use crate::version::{strip_operators, ApkVersion, VersionComparator};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace};

struct CachedIndex {
    modified: SystemTime,
    table: Arc<ProviderTable>,
}

/// Loads binary package indexes and answers provider queries over them
pub struct IndexStore {
    comparator: Box<dyn VersionComparator>,
    cache: RefCell<HashMap<PathBuf, CachedIndex>>,
}

impl IndexStore {
    /// Store comparing versions the apk way
    pub fn new() -> Self {
        Self::with_comparator(ApkVersion)
    }

    /// Store using a custom version comparator
    pub fn with_comparator(comparator: impl VersionComparator + 'static) -> Self {
        Self {
            comparator: Box::new(comparator),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn comparator(&self) -> &dyn VersionComparator {
        self.comparator.as_ref()
    }

    /// Load an index, sharing the cached table
    ///
    /// This is the read-only fast path: the returned table is the cached one.
    /// A missing file yields an empty table that is not cached, so an index
    /// appearing later is picked up.
    pub fn load_shared(&self, path: &Path) -> Result<Arc<ProviderTable>> {
        let path = std::path::absolute(path)?;
        if !path.is_file() {
            debug!("No index at {}, treating as empty", path.display());
            return Ok(Arc::new(ProviderTable::new()));
        }
        let modified = std::fs::symlink_metadata(&path)?.modified()?;

        if let Some(cached) = self.cache.borrow().get(&path) {
            if cached.modified == modified {
                trace!("Index cache hit: {}", path.display());
                return Ok(Arc::clone(&cached.table));
            }
            debug!("Index changed on disk, reparsing: {}", path.display());
        }

        let Some(records) = index::load_records(&path)? else {
            return Ok(Arc::new(ProviderTable::new()));
        };
        let table = Arc::new(ProviderTable::from_records(records, self.comparator()));
        self.cache.borrow_mut().insert(
            path,
            CachedIndex {
                modified,
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    /// Load an index as an independent copy
    ///
    /// Mutating the returned table never affects the cache.
    pub fn load(&self, path: &Path) -> Result<ProviderTable> {
        Ok(self.load_shared(path)?.as_ref().clone())
    }

    /// Drop the cached parse of one index
    ///
    /// Returns true when something was cached for `path`.
    pub fn invalidate(&self, path: &Path) -> bool {
        let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let removed = self.cache.borrow_mut().remove(&key).is_some();
        debug!("Invalidated index cache for {} ({})", key.display(), removed);
        removed
    }

    /// Drop every cached index
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Whether a parse of `path` is currently cached
    pub fn is_cached(&self, path: &Path) -> bool {
        std::path::absolute(path)
            .map(|key| self.cache.borrow().contains_key(&key))
            .unwrap_or(false)
    }

    /// All providers of `name` across `indexes`
    ///
    /// Earlier indexes win unless a later one carries a strictly higher
    /// version of the same pkgname. Returns an empty map when nothing
    /// provides the name.
    pub fn providers(&self, name: &str, indexes: &[PathBuf]) -> Result<Providers> {
        let name = strip_operators(name);
        let mut found = Providers::new();
        for path in indexes {
            let table = self.load_shared(path)?;
            let Some(providers) = table.get(name) else {
                continue;
            };
            for record in providers.values() {
                if !insert_provider(&mut found, record.clone(), self.comparator()) {
                    trace!(
                        "{}: {} in {} is not newer than an earlier index",
                        name,
                        record.pkgname,
                        path.display()
                    );
                }
            }
        }
        Ok(found)
    }

    /// Like [`providers`](Self::providers) but failing when nothing provides `name`
    pub fn require_providers(&self, name: &str, indexes: &[PathBuf]) -> Result<Providers> {
        let found = self.providers(name, indexes)?;
        if found.is_empty() {
            return Err(Error::UnresolvedPackage {
                name: strip_operators(name).to_string(),
                referrer: None,
            });
        }
        Ok(found)
    }

    /// The binary package `name` resolves to, without any install context
    ///
    /// Virtual records have no binary behind them and are never returned.
    pub fn package(&self, name: &str, indexes: &[PathBuf]) -> Result<Option<IndexRecord>> {
        let mut found = self.providers(name, indexes)?;
        found.retain(|_, record| !record.is_virtual());
        Ok(pick_provider(name, &found, &ProviderContext::default()).map(|c| c.record.clone()))
    }
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexStore")
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}
