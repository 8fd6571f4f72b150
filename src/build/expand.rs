// src/build/expand.rs

//! Dependency expansion
//!
//! Walks requested packages and their dependencies with a work list and
//! collects every package that has to be built. Each expander owns its
//! per-architecture visited sets, so independent runs never share state.

use crate::arch::Arch;
use crate::build::queue::{output_path, source_pkgver, BuildQueueItem, Diagnostic};
use crate::build::status::BuildStatus;
use crate::build::{BuildContext, BuildOptions};
use crate::error::{Error, Result};
use crate::recipe::{direct_dependencies, subpackage_dependencies, Recipe};
use crate::version::strip_operators;
use chrono::Local;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info, trace, warn};

/// Result of expanding a set of requested packages
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    /// Packages that must be built, in discovery order
    pub items: Vec<BuildQueueItem>,
    /// Every dependency name walked, in first-seen order
    pub dependencies: Vec<String>,
    /// Requested names that ended up in `items`
    pub requested_queued: Vec<String>,
}

/// Expands requested packages into build queue candidates
pub struct DependencyExpander<'a> {
    ctx: &'a BuildContext<'a>,
    options: &'a BuildOptions,
    visited: BTreeMap<Arch, BTreeSet<String>>,
    seen_dependencies: BTreeSet<String>,
    expansion: Expansion,
}

impl<'a> DependencyExpander<'a> {
    pub fn new(ctx: &'a BuildContext<'a>, options: &'a BuildOptions) -> Self {
        Self {
            ctx,
            options,
            visited: BTreeMap::new(),
            seen_dependencies: BTreeSet::new(),
            expansion: Expansion::default(),
        }
    }

    /// Expand `requested` into build candidates
    ///
    /// Also queues outdated bootstrap packages unless building from a source
    /// override.
    pub fn expand(mut self, requested: &[String]) -> Result<Expansion> {
        debug!("Expanding dependencies of: {}", requested.join(", "));
        for name in requested {
            self.process_package(name)?;
        }

        if !self.options.from_src {
            self.queue_bootstrap_packages(requested)?;
        }

        self.expansion.requested_queued = requested
            .iter()
            .filter(|name| {
                self.expansion
                    .items
                    .iter()
                    .any(|item| &item.name == *name)
            })
            .cloned()
            .collect();

        info!(
            "{} package(s) need building, {} dependencies walked",
            self.expansion.items.len(),
            self.expansion.dependencies.len()
        );
        Ok(self.expansion)
    }

    /// Mark `name` visited for `arch`; false if it already was
    fn mark_visited(&mut self, arch: Arch, name: &str) -> bool {
        let fresh = self
            .visited
            .entry(arch)
            .or_default()
            .insert(name.to_string());
        if !fresh {
            trace!("{}/{}: already visited", arch, name);
        }
        fresh
    }

    fn record_dependency(&mut self, name: &str) {
        if self.seen_dependencies.insert(name.to_string()) {
            self.expansion.dependencies.push(name.to_string());
        }
    }

    fn process_package(&mut self, name: &str) -> Result<()> {
        let ctx = self.ctx;
        let options = self.options;

        let Some(base) = ctx.recipes.recipe(name) else {
            let fallback = options.arch.unwrap_or(ctx.config.native_arch);
            if ctx.has_binary_provider(name, fallback)? {
                if options.from_src {
                    return Err(Error::NotForked {
                        pkgname: name.to_string(),
                    });
                }
                debug!("{}: no recipe, using binary package", name);
                return Ok(());
            }
            return Err(Error::UnresolvedPackage {
                name: name.to_string(),
                referrer: None,
            });
        };

        let arch = options.arch.unwrap_or_else(|| ctx.default_arch(base));
        if !self.mark_visited(arch, name) && !options.force {
            return Ok(());
        }

        debug!("{}/{}: generating dependency tree", arch, name);
        let base_depends = direct_dependencies(base, options.ignore_depends);

        let mut status = if options.force {
            BuildStatus::New
        } else {
            ctx.status(base, arch)?
        };
        if status.necessary() && !ctx.check_build_for_arch(base, arch)? {
            status = BuildStatus::Unnecessary;
        }
        if status.necessary() {
            self.queue_build(base, &base_depends, arch)?;
        }

        // Subpackage depends are walked but not needed to build the base
        let mut work: VecDeque<String> = base_depends
            .into_iter()
            .chain(subpackage_dependencies(base))
            .collect();
        let mut parent = name.to_string();

        while let Some(dep) = work.pop_front() {
            let dep = strip_operators(&dep).to_string();
            if !self.mark_visited(arch, &dep) {
                continue;
            }
            self.record_dependency(&dep);

            let Some(recipe) = ctx.recipes.recipe(&dep) else {
                continue;
            };

            if options.no_depends && ctx.binary(&dep, arch)?.is_none() {
                return Err(Error::MissingBinaryDependency {
                    dependency: dep,
                    parent,
                    arch: arch.to_string(),
                });
            }

            let mut status = ctx.status(recipe, arch)?;
            if status.necessary() && !ctx.check_build_for_arch(recipe, arch)? {
                status = BuildStatus::Unnecessary;
            }
            if !status.necessary() || ctx.config.is_bootstrap_package(&dep) {
                continue;
            }
            if options.no_depends {
                return Err(Error::OutdatedBinaryDependency {
                    dependency: dep,
                    parent,
                });
            }

            let deps = direct_dependencies(recipe, options.ignore_depends);
            debug!(
                "{}/{}: queued as dependency of {} ({})",
                arch, dep, parent, status
            );
            self.queue_build(recipe, &deps, arch)?;

            let subpkg_deps = subpackage_dependencies(recipe);
            trace!(
                "{}/{}: inserting {} dependencies and {} from subpackages",
                arch,
                dep,
                deps.len(),
                subpkg_deps.len()
            );
            for next in subpkg_deps.into_iter().chain(deps).rev() {
                work.push_front(next);
            }
            parent = dep;
        }

        Ok(())
    }

    fn queue_bootstrap_packages(&mut self, requested: &[String]) -> Result<()> {
        let ctx = self.ctx;
        for pkgname in &ctx.config.bootstrap_packages {
            if requested.contains(pkgname) {
                continue;
            }
            let Some(recipe) = ctx.recipes.recipe(pkgname) else {
                continue;
            };
            let arch = self
                .options
                .arch
                .unwrap_or_else(|| ctx.default_arch(recipe));
            if !ctx.status(recipe, arch)?.necessary() {
                continue;
            }
            if self.options.strict {
                return Err(Error::BootstrapPackageOutdated {
                    pkgname: pkgname.clone(),
                });
            }
            let deps = direct_dependencies(recipe, self.options.ignore_depends);
            debug!("{}/{}: queued bootstrap package", arch, pkgname);
            self.queue_build(recipe, &deps, arch)?;
        }
        Ok(())
    }

    /// Turn a recipe into a queue candidate unless it is already queued
    fn queue_build(&mut self, recipe: &Recipe, depends: &[String], arch: Arch) -> Result<()> {
        let ctx = self.ctx;
        let options = self.options;

        if self
            .expansion
            .items
            .iter()
            .any(|item| item.name == recipe.pkgname && item.arch == arch)
        {
            return Ok(());
        }

        let pkgver = if options.from_src {
            source_pkgver(&recipe.pkgver, &Local::now())
        } else {
            recipe.pkgver.clone()
        };
        let version = format!("{}-r{}", pkgver, recipe.pkgrel);

        let binary = ctx.binary(&recipe.pkgname, arch)?;
        let mut diagnostics = Vec::new();
        if let Some(binary) = &binary {
            if ctx.indexes.comparator().compare(&binary.version, &version) == Ordering::Greater {
                if !options.force {
                    return Err(Error::VersionRegression {
                        pkgname: recipe.pkgname.clone(),
                        binary_version: binary.version.clone(),
                        source_version: version,
                    });
                }
                warn!(
                    "A binary package for {} has a newer version ({}) than the source ({}), \
                     the new build won't be installed automatically",
                    recipe.pkgname, binary.version, version
                );
                diagnostics.push(Diagnostic::NewerBinary {
                    binary_version: binary.version.clone(),
                    source_version: version.clone(),
                });
            }
        }

        let depends = ctx.translate_depends(recipe, depends, arch)?;
        self.expansion.items.push(BuildQueueItem {
            name: recipe.pkgname.clone(),
            arch,
            recipe: recipe.clone(),
            has_binary: binary.is_some(),
            depends,
            output: output_path(arch, &recipe.pkgname, &pkgver, recipe.pkgrel),
            version,
            repo: recipe.repo.clone(),
            channel: ctx.config.channel.clone(),
            diagnostics,
        });
        Ok(())
    }
}
