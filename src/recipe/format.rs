// src/recipe/format.rs

//! Recipe record definitions
//!
//! Recipes are TOML files carrying the fields the resolver consumes:
//!
//! ```toml
//! pkgname = "hello"
//! pkgver = "2.12"
//! pkgrel = 1
//! arch = ["all", "!s390x"]
//! makedepends = ["gettext-dev"]
//! depends = ["musl"]
//! options = ["!check"]
//!
//! [subpackages.hello-doc]
//!
//! [subpackages.hello-lang]
//! depends = ["gettext"]
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Option marker disabling the check phase (and its dependencies)
pub const SKIP_CHECK: &str = "!check";

/// Build recipe of one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub pkgname: String,

    pub pkgver: String,

    /// Package revision
    #[serde(default)]
    pub pkgrel: u32,

    /// Architecture tags, may contain `all`, `noarch` and `!arch`
    #[serde(default = "default_arch")]
    pub arch: Vec<String>,

    /// Runtime dependencies
    #[serde(default)]
    pub depends: Vec<String>,

    /// Unified build dependencies, overrides the build/host split when set
    #[serde(default)]
    pub makedepends: Vec<String>,

    #[serde(default)]
    pub makedepends_build: Vec<String>,

    #[serde(default)]
    pub makedepends_host: Vec<String>,

    #[serde(default)]
    pub checkdepends: Vec<String>,

    /// Side packages produced by this recipe, with their own runtime depends
    #[serde(default)]
    pub subpackages: IndexMap<String, Subpackage>,

    #[serde(default)]
    pub options: BTreeSet<String>,

    /// Extra names this recipe's package satisfies
    #[serde(default)]
    pub provides: Vec<String>,

    /// Repository directory the recipe was loaded from
    #[serde(skip)]
    pub repo: Option<String>,
}

/// Subpackage entry of a recipe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subpackage {
    /// Explicit runtime depends; `None` means the subpackage declares none
    #[serde(default)]
    pub depends: Option<Vec<String>>,
}

fn default_arch() -> Vec<String> {
    vec!["all".to_string()]
}

impl Recipe {
    /// Create a recipe buildable for every architecture
    pub fn new(pkgname: impl Into<String>, pkgver: impl Into<String>) -> Self {
        Self {
            pkgname: pkgname.into(),
            pkgver: pkgver.into(),
            pkgrel: 0,
            arch: default_arch(),
            depends: Vec::new(),
            makedepends: Vec::new(),
            makedepends_build: Vec::new(),
            makedepends_host: Vec::new(),
            checkdepends: Vec::new(),
            subpackages: IndexMap::new(),
            options: BTreeSet::new(),
            provides: Vec::new(),
            repo: None,
        }
    }

    /// Full version as it appears in a binary index (`pkgver-rpkgrel`)
    pub fn version(&self) -> String {
        format!("{}-r{}", self.pkgver, self.pkgrel)
    }

    /// Whether the check phase is disabled
    pub fn skips_check(&self) -> bool {
        self.options.contains(SKIP_CHECK)
    }

    /// Whether `name` is one of this recipe's subpackages
    pub fn has_subpackage(&self, name: &str) -> bool {
        self.subpackages.contains_key(name)
    }

    pub fn with_pkgrel(mut self, pkgrel: u32) -> Self {
        self.pkgrel = pkgrel;
        self
    }

    pub fn with_arch(mut self, arch: &[&str]) -> Self {
        self.arch = to_strings(arch);
        self
    }

    pub fn with_depends(mut self, depends: &[&str]) -> Self {
        self.depends = to_strings(depends);
        self
    }

    pub fn with_makedepends(mut self, makedepends: &[&str]) -> Self {
        self.makedepends = to_strings(makedepends);
        self
    }

    pub fn with_split_makedepends(mut self, build: &[&str], host: &[&str]) -> Self {
        self.makedepends_build = to_strings(build);
        self.makedepends_host = to_strings(host);
        self
    }

    pub fn with_checkdepends(mut self, checkdepends: &[&str]) -> Self {
        self.checkdepends = to_strings(checkdepends);
        self
    }

    pub fn with_option(mut self, option: &str) -> Self {
        self.options.insert(option.to_string());
        self
    }

    pub fn with_subpackage(mut self, name: &str, depends: Option<&[&str]>) -> Self {
        self.subpackages.insert(
            name.to_string(),
            Subpackage {
                depends: depends.map(to_strings),
            },
        );
        self
    }

    pub fn with_provides(mut self, provides: &[&str]) -> Self {
        self.provides = to_strings(provides);
        self
    }

    pub fn with_repo(mut self, repo: &str) -> Self {
        self.repo = Some(repo.to_string());
        self
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
