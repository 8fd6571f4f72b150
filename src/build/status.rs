// src/build/status.rs

//! Whether a recipe needs to be (re)built

use crate::arch::Arch;
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::recipe::Recipe;
use crate::repository::IndexStore;
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, warn};

/// Verdict of a [`BuildStatusOracle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// No binary package exists yet
    New,
    /// The binary package is older than the recipe
    Outdated,
    /// The recipe can't target the architecture, a binary exists instead
    CantBuild,
    /// The binary package is up to date
    Unnecessary,
}

impl BuildStatus {
    /// Whether a build has to happen
    pub fn necessary(&self) -> bool {
        matches!(self, Self::New | Self::Outdated)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Outdated => write!(f, "outdated"),
            Self::CantBuild => write!(f, "can't build"),
            Self::Unnecessary => write!(f, "unnecessary"),
        }
    }
}

/// Decides whether a recipe must be built for an architecture
pub trait BuildStatusOracle {
    fn status(&self, recipe: &Recipe, arch: Arch) -> Result<BuildStatus>;
}

impl<F> BuildStatusOracle for F
where
    F: Fn(&Recipe, Arch) -> BuildStatus,
{
    fn status(&self, recipe: &Recipe, arch: Arch) -> Result<BuildStatus> {
        Ok(self(recipe, arch))
    }
}

/// Oracle comparing recipes against the configured binary indexes
#[derive(Debug, Clone, Copy)]
pub struct IndexBuildStatus<'a> {
    store: &'a IndexStore,
    config: &'a ResolverConfig,
}

impl<'a> IndexBuildStatus<'a> {
    pub fn new(store: &'a IndexStore, config: &'a ResolverConfig) -> Self {
        Self { store, config }
    }
}

impl BuildStatusOracle for IndexBuildStatus<'_> {
    fn status(&self, recipe: &Recipe, arch: Arch) -> Result<BuildStatus> {
        let indexes = self.config.index_files(arch);
        let Some(binary) = self.store.package(&recipe.pkgname, &indexes)? else {
            return Ok(BuildStatus::New);
        };

        if !arch.allowed_by(&recipe.arch) {
            return Ok(BuildStatus::CantBuild);
        }

        let source_version = recipe.version();
        let status = match self
            .store
            .comparator()
            .compare(&binary.version, &source_version)
        {
            Ordering::Greater => {
                warn!(
                    "{}: binary package ({}) is newer than the recipe ({}), \
                     channel or mirror state may be stale",
                    recipe.pkgname, binary.version, source_version
                );
                BuildStatus::Unnecessary
            }
            Ordering::Less => BuildStatus::Outdated,
            Ordering::Equal => BuildStatus::Unnecessary,
        };
        debug!("{}/{}: build status {}", arch, recipe.pkgname, status);
        Ok(status)
    }
}
