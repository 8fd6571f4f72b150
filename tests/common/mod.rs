// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use pmbuild::{Arch, ResolverConfig};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Mirror used by [`TestWork`] for upstream packages
pub const MIRROR: &str = "main";

/// One index block, rendered with [`IndexBlock::render`]
#[derive(Debug, Clone)]
pub struct IndexBlock {
    pub pkgname: String,
    pub version: String,
    pub arch: Arch,
    pub depends: Vec<String>,
    pub provides: Vec<String>,
    pub provider_priority: Option<u32>,
    pub origin: Option<String>,
    pub timestamp: Option<String>,
}

impl IndexBlock {
    /// A real binary package (has a build timestamp)
    pub fn package(pkgname: &str, version: &str) -> Self {
        Self {
            pkgname: pkgname.to_string(),
            version: version.to_string(),
            arch: Arch::X86_64,
            depends: Vec::new(),
            provides: Vec::new(),
            provider_priority: None,
            origin: Some(pkgname.to_string()),
            timestamp: Some("1700000000".to_string()),
        }
    }

    /// A provides-only entry without a build timestamp
    pub fn virtual_package(pkgname: &str, version: &str, provides: &[&str]) -> Self {
        let mut block = Self::package(pkgname, version).with_provides(provides);
        block.timestamp = None;
        block.origin = None;
        block
    }

    pub fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = arch;
        self
    }

    pub fn with_depends(mut self, depends: &[&str]) -> Self {
        self.depends = depends.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_provides(mut self, provides: &[&str]) -> Self {
        self.provides = provides.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.provider_priority = Some(priority);
        self
    }

    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_string());
        self
    }

    pub fn render(&self) -> String {
        let mut out = format!("C:Q1checksum{}=\n", self.pkgname);
        out.push_str(&format!("P:{}\n", self.pkgname));
        out.push_str(&format!("V:{}\n", self.version));
        out.push_str(&format!("A:{}\n", self.arch));
        out.push_str("S:1024\nI:4096\nT:test package\nL:MIT\n");
        if let Some(origin) = &self.origin {
            out.push_str(&format!("o:{}\n", origin));
        }
        if let Some(timestamp) = &self.timestamp {
            out.push_str(&format!("t:{}\n", timestamp));
        }
        if !self.depends.is_empty() {
            out.push_str(&format!("D:{}\n", self.depends.join(" ")));
        }
        if !self.provides.is_empty() {
            out.push_str(&format!("p:{}\n", self.provides.join(" ")));
        }
        if let Some(priority) = self.provider_priority {
            out.push_str(&format!("k:{}\n", priority));
        }
        out
    }
}

/// Render blocks as index text, blank line after each block
pub fn render_index(blocks: &[IndexBlock]) -> String {
    blocks.iter().map(|b| format!("{}\n", b.render())).collect()
}

/// Write index text as a plain file
pub fn write_plain_index(path: &Path, blocks: &[IndexBlock]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, render_index(blocks)).unwrap();
}

/// Write index text as a gzip-compressed tar archive with an APKINDEX member
pub fn write_index_archive(path: &Path, blocks: &[IndexBlock]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let text = render_index(blocks);

    let file = std::fs::File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let description = b"test repository\n";
    let mut header = tar::Header::new_gnu();
    header.set_size(description.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "DESCRIPTION", &description[..])
        .unwrap();

    let mut header = tar::Header::new_gnu();
    header.set_size(text.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "APKINDEX", text.as_bytes())
        .unwrap();

    builder.into_inner().unwrap().finish().unwrap();
}

/// Temporary work directory with a local channel and one mirror
///
/// Keep the value alive for the duration of the test to prevent cleanup.
pub struct TestWork {
    pub dir: TempDir,
    pub config: ResolverConfig,
}

impl TestWork {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ResolverConfig::new()
            .with_work(dir.path())
            .with_mirror(MIRROR)
            .with_native_arch(Arch::X86_64);
        Self { dir, config }
    }

    pub fn local_index(&self) -> PathBuf {
        self.config.local_index(Arch::X86_64)
    }

    pub fn mirror_index(&self) -> PathBuf {
        self.config.mirror_index(MIRROR, Arch::X86_64)
    }

    /// Publish locally built packages
    pub fn write_local(&self, blocks: &[IndexBlock]) {
        write_index_archive(&self.local_index(), blocks);
    }

    /// Publish upstream packages
    pub fn write_mirror(&self, blocks: &[IndexBlock]) {
        write_index_archive(&self.mirror_index(), blocks);
    }
}

/// Names of a build queue, in order
pub fn queue_names(queue: &[pmbuild::BuildQueueItem]) -> Vec<String> {
    queue.iter().map(|item| item.name.clone()).collect()
}

/// Owned package list from string literals
pub fn packages(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
