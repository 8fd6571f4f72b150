// src/lib.rs

//! pmbuild: dependency resolution and build scheduling for distribution bootstrapping
//!
//! Given a set of requested packages, pmbuild works out which of them (and of
//! their transitive dependencies) have to be built from local recipes, and in
//! which order.
//!
//! # Architecture
//!
//! - Binary indexes: line-oriented package indexes, parsed once per session
//!   and cached by path and modification time
//! - Providers: every name (pkgname or `provides` alias) maps to its providing
//!   packages; one is picked with a fixed priority policy
//! - Expansion: requested packages are walked with a work list, consulting
//!   recipes and a build status oracle
//! - Scheduling: candidates are ordered dependencies-first, cycles are broken
//!   with existing binary packages

pub mod arch;
pub mod build;
pub mod config;
mod error;
pub mod recipe;
pub mod repository;
pub mod version;

pub use arch::Arch;
pub use build::{
    BuildContext, BuildOptions, BuildPlan, BuildPlanner, BuildQueueItem, BuildScheduler,
    BuildStatus, BuildStatusOracle, DependencyExpander, Diagnostic, Expansion, IndexBuildStatus,
    PackageLookup,
};
pub use config::ResolverConfig;
pub use error::{Error, Result};
pub use recipe::{direct_dependencies, Recipe, RecipeBook, RecipeLookup};
pub use repository::{
    pick_provider, IndexRecord, IndexStore, PickReason, ProviderChoice, ProviderContext,
    ProviderTable, Providers,
};
pub use version::{ApkVersion, VersionComparator};
