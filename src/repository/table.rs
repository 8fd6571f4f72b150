// src/repository/table.rs

//! Provider tables
//!
//! A [`ProviderTable`] maps every name a package can be requested by (its own
//! pkgname and each `provides` alias) to the packages providing it. Records are
//! only ever replaced by a strictly higher version; everything that inserts
//! goes through [`insert_provider`] so the rule lives in one place.

use crate::repository::index::IndexRecord;
use crate::version::VersionComparator;
use indexmap::IndexMap;
use std::cmp::Ordering;
use tracing::trace;

/// Providers of one name, keyed by pkgname, in first-seen order
pub type Providers = IndexMap<String, IndexRecord>;

/// Add `record` to `providers`, keeping the higher version per pkgname
///
/// Returns true when the record was stored. On equal versions the record
/// that was there first stays.
pub fn insert_provider(
    providers: &mut Providers,
    record: IndexRecord,
    comparator: &dyn VersionComparator,
) -> bool {
    if let Some(existing) = providers.get(&record.pkgname) {
        if comparator.compare(&record.version, &existing.version) != Ordering::Greater {
            trace!(
                "Keeping {}-{} over {}",
                existing.pkgname, existing.version, record.version
            );
            return false;
        }
    }
    providers.insert(record.pkgname.clone(), record);
    true
}

/// Mapping of logical name to its providing packages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderTable {
    entries: IndexMap<String, Providers>,
}

impl ProviderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from parsed index records
    ///
    /// Virtual records are left out of the pkgname entries but are still
    /// registered under each of their `provides` aliases.
    pub fn from_records(records: Vec<IndexRecord>, comparator: &dyn VersionComparator) -> Self {
        let mut table = Self::new();
        for record in records {
            if record.is_virtual() {
                trace!("Virtual package {} only registered as provider", record.pkgname);
            } else {
                let pkgname = record.pkgname.clone();
                table.insert(&pkgname, record.clone(), comparator);
            }
            for alias in &record.provides {
                table.insert(alias, record.clone(), comparator);
            }
        }
        table
    }

    /// Register `record` as a provider of `name`
    pub fn insert(
        &mut self,
        name: &str,
        record: IndexRecord,
        comparator: &dyn VersionComparator,
    ) -> bool {
        let providers = self.entries.entry(name.to_string()).or_default();
        insert_provider(providers, record, comparator)
    }

    /// Providers of `name`, if any
    pub fn get(&self, name: &str) -> Option<&Providers> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Every providable name, in first-seen order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every provider of `name`, returning them
    pub fn remove(&mut self, name: &str) -> Option<Providers> {
        self.entries.shift_remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Arch;
    use crate::version::ApkVersion;

    fn record(pkgname: &str, version: &str, provides: &[&str]) -> IndexRecord {
        IndexRecord {
            arch: Arch::X86_64,
            pkgname: pkgname.to_string(),
            version: version.to_string(),
            depends: Vec::new(),
            provides: provides.iter().map(|s| s.to_string()).collect(),
            provider_priority: None,
            origin: Some(pkgname.to_string()),
            timestamp: Some("1700000000".to_string()),
        }
    }

    #[test]
    fn test_higher_version_wins_in_either_order() {
        let low = record("foo", "1.0-r0", &[]);
        let high = record("foo", "1.1-r0", &[]);

        let table = ProviderTable::from_records(vec![low.clone(), high.clone()], &ApkVersion);
        assert_eq!(table.get("foo").unwrap()["foo"].version, "1.1-r0");

        let table = ProviderTable::from_records(vec![high, low], &ApkVersion);
        assert_eq!(table.get("foo").unwrap()["foo"].version, "1.1-r0");
    }

    #[test]
    fn test_tie_keeps_first() {
        let mut first = record("foo", "1.0-r0", &[]);
        first.origin = Some("first".to_string());
        let mut second = record("foo", "1.0-r0", &[]);
        second.origin = Some("second".to_string());

        let table = ProviderTable::from_records(vec![first, second], &ApkVersion);
        assert_eq!(
            table.get("foo").unwrap()["foo"].origin.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn test_aliases_registered() {
        let table = ProviderTable::from_records(
            vec![
                record("mesa-egl", "23.1-r0", &["so:libEGL.so.1"]),
                record("libglvnd", "1.6-r0", &["so:libEGL.so.1"]),
            ],
            &ApkVersion,
        );
        let providers = table.get("so:libEGL.so.1").unwrap();
        let names: Vec<_> = providers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["mesa-egl", "libglvnd"]);
        assert!(table.contains("mesa-egl"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_virtual_only_under_aliases() {
        let mut virt = record(".virtual-foo", "0", &["foo-virtual"]);
        virt.timestamp = None;
        virt.origin = None;

        let table = ProviderTable::from_records(vec![virt], &ApkVersion);
        assert!(!table.contains(".virtual-foo"));
        assert!(table.get("foo-virtual").unwrap().contains_key(".virtual-foo"));
    }
}
