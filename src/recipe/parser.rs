// src/recipe/parser.rs

//! Recipe file loading
//!
//! A recipe tree is laid out as `<root>/<repo>/<pkgname>/recipe.toml`. The
//! top-level directory name becomes the recipe's repository; recipes placed
//! directly under `<root>/<pkgname>/` have none.

use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use crate::recipe::RecipeBook;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// File name recipes are stored under
pub const RECIPE_FILE: &str = "recipe.toml";

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str, path: &Path) -> Result<Recipe> {
    let recipe: Recipe = toml::from_str(content).map_err(|e| Error::RecipeParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if recipe.pkgname.is_empty() || recipe.pkgver.is_empty() {
        return Err(Error::RecipeParse {
            path: path.to_path_buf(),
            reason: "pkgname and pkgver must not be empty".to_string(),
        });
    }
    Ok(recipe)
}

/// Parse a recipe from a file
pub fn parse_recipe_file(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path)?;
    parse_recipe(&content, path)
}

/// Load every recipe below `root`
///
/// Directories are walked in sorted order so alias ownership does not depend
/// on filesystem iteration order.
pub fn load_recipe_dir(root: &Path) -> Result<RecipeBook> {
    let mut book = RecipeBook::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::RecipeParse {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() || entry.file_name() != RECIPE_FILE {
            continue;
        }

        let path = entry.path();
        let mut recipe = parse_recipe_file(path)?;
        let relative = path.strip_prefix(root).unwrap_or(path);
        // <repo>/<pkgname>/recipe.toml
        if relative.components().count() >= 3 {
            recipe.repo = relative
                .components()
                .next()
                .map(|c| c.as_os_str().to_string_lossy().to_string());
        }
        debug!("Loaded recipe {} from {}", recipe.pkgname, path.display());
        book.insert(recipe);
    }

    info!("Loaded {} recipes from {}", book.len(), root.display());
    Ok(book)
}
