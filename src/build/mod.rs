// src/build/mod.rs

//! Build planning
//!
//! Turns a list of requested packages into an ordered build queue:
//!
//! 1. [`DependencyExpander`] walks recipes and binary indexes and collects
//!    every package that needs building.
//! 2. [`BuildScheduler`] orders those packages so dependencies come first,
//!    breaking dependency cycles with existing binary packages.
//!
//! # Example
//!
//! ```ignore
//! use pmbuild::build::{BuildContext, BuildOptions, BuildPlanner};
//!
//! let ctx = BuildContext::new(&config, &store, &recipes);
//! let plan = BuildPlanner::new(&ctx).plan(&["hello".to_string()], &BuildOptions::default())?;
//! for item in &plan.queue {
//!     println!("{}", item);
//! }
//! ```

mod expand;
mod queue;
mod schedule;
mod status;

pub use expand::{DependencyExpander, Expansion};
pub use queue::{output_path, source_pkgver, BuildQueueItem, Diagnostic};
pub use schedule::{BuildScheduler, PackageLookup};
pub use status::{BuildStatus, BuildStatusOracle, IndexBuildStatus};

use crate::arch::Arch;
use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::recipe::{Recipe, RecipeLookup};
use crate::repository::{IndexRecord, IndexStore};
use crate::version::strip_operators;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Per-run switches
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Target architecture, autodetected per recipe when unset
    pub arch: Option<Arch>,
    /// Build requested packages even if up to date, and accept downgrades
    pub force: bool,
    /// Never build outdated bootstrap packages implicitly
    pub strict: bool,
    /// Build from a local source override
    pub from_src: bool,
    /// Never build dependencies, they must exist as binaries
    pub no_depends: bool,
    /// Leave runtime `depends` out of the dependency walk
    pub ignore_depends: bool,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = Some(arch);
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_from_src(mut self, from_src: bool) -> Self {
        self.from_src = from_src;
        self
    }

    pub fn with_no_depends(mut self, no_depends: bool) -> Self {
        self.no_depends = no_depends;
        self
    }

    pub fn with_ignore_depends(mut self, ignore_depends: bool) -> Self {
        self.ignore_depends = ignore_depends;
        self
    }
}

/// Everything a planning run reads from
pub struct BuildContext<'a> {
    pub config: &'a ResolverConfig,
    pub indexes: &'a IndexStore,
    pub recipes: &'a dyn RecipeLookup,
    oracle: Option<&'a dyn BuildStatusOracle>,
}

impl<'a> BuildContext<'a> {
    /// Context using [`IndexBuildStatus`] to decide what needs building
    pub fn new(
        config: &'a ResolverConfig,
        indexes: &'a IndexStore,
        recipes: &'a dyn RecipeLookup,
    ) -> Self {
        Self {
            config,
            indexes,
            recipes,
            oracle: None,
        }
    }

    /// Replace the build status oracle
    pub fn with_oracle(mut self, oracle: &'a dyn BuildStatusOracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn index_files(&self, arch: Arch) -> Vec<PathBuf> {
        self.config.index_files(arch)
    }

    /// Build status of `recipe` for `arch`
    pub fn status(&self, recipe: &Recipe, arch: Arch) -> Result<BuildStatus> {
        match self.oracle {
            Some(oracle) => oracle.status(recipe, arch),
            None => IndexBuildStatus::new(self.indexes, self.config).status(recipe, arch),
        }
    }

    /// Best binary package for `name`
    pub fn binary(&self, name: &str, arch: Arch) -> Result<Option<IndexRecord>> {
        self.indexes.package(name, &self.index_files(arch))
    }

    /// Whether any real (non-virtual) binary package provides `name`
    pub fn has_binary_provider(&self, name: &str, arch: Arch) -> Result<bool> {
        Ok(self
            .indexes
            .providers(name, &self.index_files(arch))?
            .values()
            .any(|record| !record.is_virtual()))
    }

    /// Architecture to build `recipe` for when none was requested
    ///
    /// The native architecture when the recipe allows it, otherwise the
    /// first architecture the recipe lists.
    pub fn default_arch(&self, recipe: &Recipe) -> Arch {
        let native = self.config.native_arch;
        if recipe
            .arch
            .iter()
            .any(|a| a == "noarch" || a == "all" || a == native.as_str())
        {
            return native;
        }
        recipe
            .arch
            .first()
            .and_then(|a| a.parse().ok())
            .unwrap_or(native)
    }

    /// Whether `recipe` should be built for `arch`
    ///
    /// False when the recipe excludes `arch` but a binary package stands in
    /// for it; an error when neither is available.
    pub fn check_build_for_arch(&self, recipe: &Recipe, arch: Arch) -> Result<bool> {
        if arch.allowed_by(&recipe.arch) {
            return Ok(true);
        }
        if let Some(binary) = self.binary(&recipe.pkgname, arch)? {
            debug!(
                "{}: found recipe ({}) and binary package ({}), recipe can't be built \
                 for {}, using binary package",
                recipe.pkgname,
                recipe.version(),
                binary.version,
                arch
            );
            return Ok(false);
        }
        Err(Error::UnbuildableForArchitecture {
            pkgname: recipe.pkgname.clone(),
            arch: arch.to_string(),
        })
    }

    /// Map dependency names to the pkgnames owning them
    ///
    /// Unknown names are kept as-is so scheduling can report them with
    /// their referrer.
    pub fn translate_depends(
        &self,
        recipe: &Recipe,
        depends: &[String],
        arch: Arch,
    ) -> Result<Vec<String>> {
        let mut translated = BTreeSet::new();
        for dep in depends {
            let owner = self
                .owner(dep, arch)?
                .unwrap_or_else(|| strip_operators(dep).to_string());
            if owner != recipe.pkgname && !recipe.has_subpackage(&owner) {
                translated.insert(owner);
            }
        }
        Ok(translated.into_iter().collect())
    }

    /// Drop the cached local index after `item` was built into it
    pub fn mark_built(&self, item: &BuildQueueItem) -> bool {
        self.indexes.invalidate(&self.config.local_index(item.arch))
    }
}

impl PackageLookup for BuildContext<'_> {
    fn owner(&self, name: &str, arch: Arch) -> Result<Option<String>> {
        let name = strip_operators(name);
        let recipe = self.recipes.recipe(name);
        if let Some(recipe) = recipe {
            if arch.allowed_by(&recipe.arch) {
                return Ok(Some(recipe.pkgname.clone()));
            }
        }
        if let Some(binary) = self.binary(name, arch)? {
            return Ok(Some(binary.pkgname));
        }
        Ok(recipe.map(|r| r.pkgname.clone()))
    }
}

impl fmt::Debug for BuildContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("config", self.config)
            .field("indexes", self.indexes)
            .field("custom_oracle", &self.oracle.is_some())
            .finish()
    }
}

/// Ordered build queue for a set of requested packages
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildPlan {
    pub queue: Vec<BuildQueueItem>,
    /// Every dependency name walked during expansion
    pub dependencies: Vec<String>,
    /// Requested packages that are part of the queue
    pub requested_queued: Vec<String>,
}

impl BuildPlan {
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Runs expansion and scheduling together
pub struct BuildPlanner<'a> {
    ctx: &'a BuildContext<'a>,
}

impl<'a> BuildPlanner<'a> {
    pub fn new(ctx: &'a BuildContext<'a>) -> Self {
        Self { ctx }
    }

    /// Expand `requested` and order the packages that need building
    pub fn plan(&self, requested: &[String], options: &BuildOptions) -> Result<BuildPlan> {
        if options.from_src && requested.len() > 1 {
            return Err(Error::SourceOverride(
                "can't build multiple packages from one source override".to_string(),
            ));
        }

        let expansion = DependencyExpander::new(self.ctx, options).expand(requested)?;
        if expansion.items.is_empty() {
            info!("Nothing to build");
            return Ok(BuildPlan {
                queue: Vec::new(),
                dependencies: expansion.dependencies,
                requested_queued: Vec::new(),
            });
        }

        let queue = BuildScheduler::new(&self.ctx.config.bootstrap_packages, self.ctx)
            .schedule(expansion.items)?;

        info!(
            "Building {} package{}",
            queue.len(),
            if queue.len() > 1 { "s" } else { "" }
        );
        for item in &queue {
            info!("   * {}/{}", item.channel, item.name);
        }

        if options.from_src && queue.len() > 1 {
            return Err(Error::SourceOverride(
                "additional packages need building, build them first and then build \
                 the package from source again"
                    .to_string(),
            ));
        }

        Ok(BuildPlan {
            queue,
            dependencies: expansion.dependencies,
            requested_queued: expansion.requested_queued,
        })
    }
}
