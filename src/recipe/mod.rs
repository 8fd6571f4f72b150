// src/recipe/mod.rs

//! Build recipes
//!
//! Recipes are consumed as plain records: the resolver only reads names,
//! versions, dependency lists, subpackages, options and the arch list. They
//! come from a [`RecipeLookup`]; [`RecipeBook`] is the in-memory
//! implementation, filled directly or from a directory of TOML files.

mod depends;
mod format;
pub mod parser;

pub use depends::{direct_dependencies, subpackage_dependencies};
pub use format::{Recipe, Subpackage, SKIP_CHECK};
pub use parser::{load_recipe_dir, parse_recipe, parse_recipe_file};

use std::collections::BTreeMap;
use tracing::debug;

/// Resolves a package name to the recipe that builds it
pub trait RecipeLookup {
    /// Recipe for `name`, which may be a pkgname, a subpackage or a provided name
    fn recipe(&self, name: &str) -> Option<&Recipe>;
}

/// In-memory recipe collection
///
/// Lookups try the pkgname first, then subpackage names, then `provides`.
/// When two recipes claim the same alias, the first one inserted keeps it.
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: BTreeMap<String, Recipe>,
    subpackages: BTreeMap<String, String>,
    provides: BTreeMap<String, String>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipe, replacing an earlier one with the same pkgname
    pub fn insert(&mut self, recipe: Recipe) {
        for sub in recipe.subpackages.keys() {
            self.subpackages
                .entry(sub.clone())
                .or_insert_with(|| recipe.pkgname.clone());
        }
        for alias in &recipe.provides {
            let alias = crate::version::strip_operators(alias).to_string();
            self.provides
                .entry(alias)
                .or_insert_with(|| recipe.pkgname.clone());
        }
        if self.recipes.contains_key(&recipe.pkgname) {
            debug!("Replacing recipe {}", recipe.pkgname);
        }
        self.recipes.insert(recipe.pkgname.clone(), recipe);
    }

    pub fn with_recipe(mut self, recipe: Recipe) -> Self {
        self.insert(recipe);
        self
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Recipes sorted by pkgname
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }
}

impl FromIterator<Recipe> for RecipeBook {
    fn from_iter<I: IntoIterator<Item = Recipe>>(iter: I) -> Self {
        let mut book = Self::new();
        for recipe in iter {
            book.insert(recipe);
        }
        book
    }
}

impl RecipeLookup for RecipeBook {
    fn recipe(&self, name: &str) -> Option<&Recipe> {
        if let Some(recipe) = self.recipes.get(name) {
            return Some(recipe);
        }
        self.subpackages
            .get(name)
            .or_else(|| self.provides.get(name))
            .and_then(|owner| self.recipes.get(owner))
    }
}
