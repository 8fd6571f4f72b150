// tests/index.rs

//! Binary index loading, caching, and provider selection across files.

mod common;

use common::{write_index_archive, write_plain_index, IndexBlock, TestWork};
use pmbuild::repository::load_records;
use pmbuild::{pick_provider, Error, IndexStore, PickReason, ProviderContext};

#[test]
fn test_archive_and_plain_index_parse_alike() {
    let work = TestWork::new();
    let blocks = vec![
        IndexBlock::package("musl", "1.2.5-r0"),
        IndexBlock::package("busybox", "1.36.1-r2")
            .with_depends(&["musl>=1.2", "so:libc.musl-x86_64.so.1"])
            .with_provides(&["/bin/sh", "cmd:sh=1.36.1-r2"]),
    ];
    let archive = work.dir.path().join("APKINDEX.tar.gz");
    let plain = work.dir.path().join("APKINDEX");
    write_index_archive(&archive, &blocks);
    write_plain_index(&plain, &blocks);

    let from_archive = load_records(&archive).unwrap().unwrap();
    let from_plain = load_records(&plain).unwrap().unwrap();
    assert_eq!(from_archive, from_plain);
    assert_eq!(from_archive.len(), 2);

    let busybox = &from_archive[1];
    assert_eq!(busybox.depends, vec!["musl", "so:libc.musl-x86_64.so.1"]);
    assert_eq!(busybox.provides, vec!["/bin/sh", "cmd:sh"]);
    assert!(!busybox.is_virtual());
}

#[test]
fn test_missing_index_is_empty() {
    let work = TestWork::new();
    let store = IndexStore::new();
    assert!(load_records(&work.local_index()).unwrap().is_none());
    assert!(store
        .providers("musl", &work.config.index_files(pmbuild::Arch::X86_64))
        .unwrap()
        .is_empty());
    assert!(!store.is_cached(&work.local_index()));
}

#[test]
fn test_higher_version_wins_in_either_file_order() {
    let work = TestWork::new();
    let old = work.dir.path().join("old/APKINDEX.tar.gz");
    let new = work.dir.path().join("new/APKINDEX.tar.gz");
    write_index_archive(&old, &[IndexBlock::package("zlib", "1.3-r0")]);
    write_index_archive(&new, &[IndexBlock::package("zlib", "1.3.1-r0")]);

    let store = IndexStore::new();
    for order in [vec![old.clone(), new.clone()], vec![new.clone(), old.clone()]] {
        let found = store.package("zlib", &order).unwrap().unwrap();
        assert_eq!(found.version, "1.3.1-r0");
    }
}

#[test]
fn test_equal_versions_keep_first_index() {
    let work = TestWork::new();
    let first = work.dir.path().join("first/APKINDEX");
    let second = work.dir.path().join("second/APKINDEX");
    write_plain_index(&first, &[IndexBlock::package("zlib", "1.3-r0").with_origin("zlib")]);
    write_plain_index(
        &second,
        &[IndexBlock::package("zlib", "1.3-r0").with_origin("zlib-mirror")],
    );

    let store = IndexStore::new();
    let found = store.package("zlib", &[first, second]).unwrap().unwrap();
    assert_eq!(found.origin.as_deref(), Some("zlib"));
}

#[test]
fn test_virtual_entries_only_provide() {
    let work = TestWork::new();
    work.write_mirror(&[
        IndexBlock::virtual_package(".pmbuild-virtual", "0-r0", &["sh-provider"]),
        IndexBlock::package("dash", "0.5.12-r0").with_provides(&["sh-provider"]),
    ]);

    let store = IndexStore::new();
    let indexes = work.config.index_files(pmbuild::Arch::X86_64);
    assert!(store.providers(".pmbuild-virtual", &indexes).unwrap().is_empty());

    let providers = store.providers("sh-provider", &indexes).unwrap();
    assert_eq!(providers.len(), 2);
    assert!(providers[".pmbuild-virtual"].is_virtual());
}

#[test]
fn test_records_serialize_to_json() {
    let work = TestWork::new();
    let path = work.dir.path().join("APKINDEX");
    write_plain_index(
        &path,
        &[IndexBlock::package("dash", "0.5.12-r0")
            .with_provides(&["/bin/sh"])
            .with_priority(5)],
    );

    let records = load_records(&path).unwrap().unwrap();
    let json = serde_json::to_value(&records).unwrap();
    assert_eq!(json[0]["pkgname"], "dash");
    assert_eq!(json[0]["provides"], serde_json::json!(["/bin/sh"]));
    assert_eq!(json[0]["provider_priority"], 5);
    assert_eq!(json[0]["arch"], "x86_64");
}

#[test]
fn test_provider_priority_across_indexes() {
    let work = TestWork::new();
    work.write_local(&[IndexBlock::package("mesa-egl", "24.1.0-r0")
        .with_provides(&["so:libEGL.so.1"])
        .with_priority(10)]);
    work.write_mirror(&[IndexBlock::package("libglvnd", "1.7.0-r0")
        .with_provides(&["so:libEGL.so.1"])
        .with_priority(100)]);

    let store = IndexStore::new();
    let indexes = work.config.index_files(pmbuild::Arch::X86_64);
    let providers = store.providers("so:libEGL.so.1", &indexes).unwrap();
    let keys: Vec<&str> = providers.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["mesa-egl", "libglvnd"]);

    let choice = pick_provider("so:libEGL.so.1", &providers, &ProviderContext::new()).unwrap();
    assert_eq!(choice.record.pkgname, "libglvnd");
    assert_eq!(choice.reason, PickReason::HighestPriority);

    let pinned = ProviderContext::new().with_pins(
        work.config
            .clone()
            .with_provider("so:libEGL.so.1", "mesa-egl")
            .providers,
    );
    let choice = pick_provider("so:libEGL.so.1", &providers, &pinned).unwrap();
    assert_eq!(choice.record.pkgname, "mesa-egl");
    assert_eq!(choice.reason, PickReason::Pinned);
}

#[test]
fn test_require_providers_names_missing_package() {
    let work = TestWork::new();
    work.write_mirror(&[IndexBlock::package("musl", "1.2.5-r0")]);

    let store = IndexStore::new();
    let indexes = work.config.index_files(pmbuild::Arch::X86_64);
    let err = store.require_providers("ghost>=1.0", &indexes).unwrap_err();
    assert!(matches!(err, Error::UnresolvedPackage { ref name, .. } if name == "ghost"));
}

#[test]
fn test_cache_is_reused_until_invalidated() {
    let work = TestWork::new();
    work.write_local(&[IndexBlock::package("hello", "1.0-r0")]);
    let local = work.local_index();

    let store = IndexStore::new();
    let first = store.load_shared(&local).unwrap();
    let second = store.load_shared(&local).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(store.is_cached(&local));

    // A rewrite within the same mtime tick is only seen after invalidation
    work.write_local(&[
        IndexBlock::package("hello", "1.0-r0"),
        IndexBlock::package("world", "2.0-r0"),
    ]);
    assert!(store.invalidate(&local));
    assert!(!store.is_cached(&local));
    let reloaded = store.load_shared(&local).unwrap();
    assert!(reloaded.contains("world"));
    assert!(!store.invalidate(&work.mirror_index()));
}

#[test]
fn test_load_returns_independent_copy() {
    let work = TestWork::new();
    work.write_local(&[IndexBlock::package("hello", "1.0-r0")]);
    let local = work.local_index();

    let store = IndexStore::new();
    let mut copy = store.load(&local).unwrap();
    assert!(copy.remove("hello").is_some());
    assert!(store.load_shared(&local).unwrap().contains("hello"));
}

#[test]
fn test_relative_and_absolute_paths_share_cache() {
    let dir = tempfile::tempdir_in(".").unwrap();
    let relative = dir
        .path()
        .strip_prefix(std::env::current_dir().unwrap())
        .unwrap_or(dir.path())
        .join("APKINDEX.tar.gz");
    assert!(relative.is_relative());
    write_index_archive(&relative, &[IndexBlock::package("hello", "1.0-r0")]);
    let absolute = std::path::absolute(&relative).unwrap();

    let store = IndexStore::new();
    let first = store.load_shared(&relative).unwrap();
    let second = store.load_shared(&absolute).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(store.is_cached(&absolute));
    assert!(store.invalidate(&relative));
    assert!(!store.is_cached(&absolute));
}

#[test]
fn test_malformed_index_reports_location() {
    let work = TestWork::new();
    let path = work.dir.path().join("APKINDEX");
    std::fs::write(&path, "C:Q1abc=\nP:hello\nV:1.0-r0\n\nC:Q1def=\nP:broken\nA:x86_64\n").unwrap();

    let store = IndexStore::new();
    let err = store.load_shared(&path).unwrap_err();
    match err {
        Error::IndexParse { line, reason, .. } => {
            assert_eq!(line, 1);
            assert!(reason.contains("arch"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
