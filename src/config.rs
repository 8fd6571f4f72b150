// src/config.rs

//! Resolver configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid:
//!
//! ```toml
//! work = "/var/lib/pmbuild"
//! channel = "edge"
//! mirrors = ["alpine-main", "alpine-community"]
//! native_arch = "aarch64"
//!
//! [providers]
//! "so:libEGL.so.1" = "mesa-egl"
//! ```

use crate::arch::Arch;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Packages needed to build anything else, built first in this order
pub const DEFAULT_BOOTSTRAP_PACKAGES: [&str; 6] =
    ["abuild", "apk-tools", "build-base", "ccache", "git", "hexdump"];

/// File name of a local channel index
pub const LOCAL_INDEX: &str = "APKINDEX.tar.gz";

/// Settings shared by every resolution run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Work directory holding local packages and downloaded indexes
    pub work: PathBuf,

    /// Channel locally built packages are published to
    pub channel: String,

    /// Identifiers of downloaded upstream indexes, in precedence order
    pub mirrors: Vec<String>,

    /// Architecture of the build host
    pub native_arch: Arch,

    /// Always-first build packages, in build order
    pub bootstrap_packages: Vec<String>,

    /// Provider pins: logical name -> pkgname
    pub providers: BTreeMap<String, String>,

    /// Recipe tree used by the CLI
    pub recipes: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            work: PathBuf::from("/var/lib/pmbuild"),
            channel: "edge".to_string(),
            mirrors: Vec::new(),
            native_arch: Arch::native().unwrap_or(Arch::X86_64),
            bootstrap_packages: DEFAULT_BOOTSTRAP_PACKAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            providers: BTreeMap::new(),
            recipes: None,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    pub fn with_work(mut self, work: impl Into<PathBuf>) -> Self {
        self.work = work.into();
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_mirror(mut self, mirror: impl Into<String>) -> Self {
        self.mirrors.push(mirror.into());
        self
    }

    pub fn with_native_arch(mut self, arch: Arch) -> Self {
        self.native_arch = arch;
        self
    }

    pub fn with_bootstrap_packages(mut self, packages: &[&str]) -> Self {
        self.bootstrap_packages = packages.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Pin the provider of a logical name
    pub fn with_provider(mut self, name: impl Into<String>, pkgname: impl Into<String>) -> Self {
        self.providers.insert(name.into(), pkgname.into());
        self
    }

    pub fn with_recipes(mut self, recipes: impl Into<PathBuf>) -> Self {
        self.recipes = Some(recipes.into());
        self
    }

    /// Directory locally built packages of `arch` land in
    pub fn local_repo(&self, arch: Arch) -> PathBuf {
        self.work
            .join("packages")
            .join(&self.channel)
            .join(arch.as_str())
    }

    /// Index of locally built packages for `arch`
    pub fn local_index(&self, arch: Arch) -> PathBuf {
        self.local_repo(arch).join(LOCAL_INDEX)
    }

    /// Index of one downloaded mirror for `arch`
    pub fn mirror_index(&self, mirror: &str, arch: Arch) -> PathBuf {
        self.work
            .join(format!("cache_apk_{}", arch))
            .join(format!("APKINDEX.{}.tar.gz", mirror))
    }

    /// Every index consulted for `arch`, local channel first
    ///
    /// The files need not exist yet.
    pub fn index_files(&self, arch: Arch) -> Vec<PathBuf> {
        std::iter::once(self.local_index(arch))
            .chain(self.mirrors.iter().map(|m| self.mirror_index(m, arch)))
            .collect()
    }

    pub fn is_bootstrap_package(&self, pkgname: &str) -> bool {
        self.bootstrap_packages.iter().any(|p| p == pkgname)
    }
}
