// src/error.rs

//! Error types for index parsing, dependency expansion and build scheduling

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving and scheduling package builds
///
/// Every variant aborts the current resolution pass. Warnings (stale
/// binaries, broken cycles) are logged and attached to queue items instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading an index or recipe
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed index block
    #[error("Failed to parse index '{}' (block at line {line}): {reason}", path.display())]
    IndexParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Unknown architecture tag
    #[error("Invalid architecture: {0}")]
    InvalidArch(String),

    /// Recipe file could not be loaded
    #[error("Failed to parse recipe '{}': {reason}", path.display())]
    RecipeParse { path: PathBuf, reason: String },

    /// Configuration file could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// No recipe and no binary provider exist for a name
    #[error("Could not find recipe or binary package for '{name}'{}", referrer_suffix(referrer))]
    UnresolvedPackage {
        name: String,
        referrer: Option<String>,
    },

    /// Recipe exists but excludes the architecture and no binary substitutes it
    #[error(
        "Can't build '{pkgname}' for architecture {arch}: add {arch} to the arch list of its \
         recipe, or build for a different architecture"
    )]
    UnbuildableForArchitecture { pkgname: String, arch: String },

    /// Scheduler made no progress and no cycle could be broken with a binary
    #[error("Unresolved dependencies, cannot order build queue:\n{}", format_edges(edges))]
    CyclicDependencyUnbreakable { edges: Vec<(String, String)> },

    /// Building would downgrade the repository
    #[error(
        "Binary package of '{pkgname}' is newer than its recipe ({binary_version} > \
         {source_version}), bump pkgrel or use force to build anyway"
    )]
    VersionRegression {
        pkgname: String,
        binary_version: String,
        source_version: String,
    },

    /// Dependency building is disabled but a dependency has no binary
    #[error("Missing binary package for dependency '{dependency}' of '{parent}' ({arch})")]
    MissingBinaryDependency {
        dependency: String,
        parent: String,
        arch: String,
    },

    /// Dependency building is disabled but a dependency binary is outdated
    #[error("Binary package for dependency '{dependency}' of '{parent}' is outdated")]
    OutdatedBinaryDependency { dependency: String, parent: String },

    /// Building from source requires a local recipe
    #[error("Package '{pkgname}' has no local recipe, fork it before building from source")]
    NotForked { pkgname: String },

    /// Strict mode refuses to build outdated bootstrap packages implicitly
    #[error(
        "Strict mode enabled and build package '{pkgname}' needs building, build it manually \
         first or build without strict mode"
    )]
    BootstrapPackageOutdated { pkgname: String },

    /// Conflicting request while building from a source override
    #[error("Source override: {0}")]
    SourceOverride(String),
}

fn referrer_suffix(referrer: &Option<String>) -> String {
    match referrer {
        Some(parent) => format!(" (needed by '{}')", parent),
        None => String::new(),
    }
}

fn format_edges(edges: &[(String, String)]) -> String {
    edges
        .iter()
        .map(|(pkg, dep)| format!("  {} -> {}", pkg, dep))
        .collect::<Vec<_>>()
        .join("\n")
}
