// src/recipe/depends.rs

//! Direct dependencies of a recipe

use crate::recipe::format::Recipe;
use crate::version::strip_operators;
use std::collections::BTreeSet;
use tracing::trace;

/// Names a recipe needs before it can be built
///
/// Uses the unified `makedepends` when present, otherwise the build and host
/// lists together. Check dependencies are added unless checks are disabled,
/// runtime `depends` unless `ignore_runtime` is set. The result is sorted
/// and never contains the recipe itself, one of its subpackages, or a
/// `!conflict` marker.
pub fn direct_dependencies(recipe: &Recipe, ignore_runtime: bool) -> Vec<String> {
    let build_deps: Vec<&String> = if recipe.makedepends.is_empty() {
        recipe
            .makedepends_build
            .iter()
            .chain(&recipe.makedepends_host)
            .collect()
    } else {
        recipe.makedepends.iter().collect()
    };

    let mut names: BTreeSet<&str> = build_deps
        .into_iter()
        .map(|dep| strip_operators(dep))
        .collect();
    if !recipe.skips_check() {
        names.extend(recipe.checkdepends.iter().map(|dep| strip_operators(dep)));
    }
    if !ignore_runtime {
        names.extend(recipe.depends.iter().map(|dep| strip_operators(dep)));
    }

    names
        .into_iter()
        .filter(|name| {
            let own = *name == recipe.pkgname || recipe.has_subpackage(name);
            if own {
                trace!("{}: ignoring dependency on itself: {}", recipe.pkgname, name);
            }
            !own && !name.is_empty() && !name.starts_with('!')
        })
        .map(str::to_string)
        .collect()
}

/// Runtime depends declared by the recipe's subpackages, in declaration order
pub fn subpackage_dependencies(recipe: &Recipe) -> Vec<String> {
    let mut seen = BTreeSet::new();
    recipe
        .subpackages
        .values()
        .filter_map(|sub| sub.depends.as_ref())
        .flatten()
        .map(|dep| strip_operators(dep))
        .filter(|dep| !dep.is_empty() && !dep.starts_with('!'))
        .filter(|dep| seen.insert(*dep))
        .map(str::to_string)
        .collect()
}
