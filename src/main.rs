// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pmbuild::build::{BuildContext, BuildOptions, BuildPlanner};
use pmbuild::recipe::{load_recipe_dir, RecipeBook};
use pmbuild::repository::{load_records, pick_provider, IndexStore, ProviderContext};
use pmbuild::{Arch, ResolverConfig};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "pmbuild")]
#[command(author, version, about = "Plan package builds from recipes and binary indexes", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Recipe tree, overrides the configured one
    #[arg(short, long, global = true)]
    recipes: Option<PathBuf>,

    /// Log decisions at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the build queue for the given packages
    Plan {
        /// Packages to build
        #[arg(required = true)]
        packages: Vec<String>,
        /// Target architecture (default: per recipe)
        #[arg(short, long)]
        arch: Option<Arch>,
        /// Build even if up to date
        #[arg(long)]
        force: bool,
        /// Don't implicitly build outdated bootstrap packages
        #[arg(long)]
        strict: bool,
        /// Build from a local source override
        #[arg(long)]
        src: bool,
        /// Never build dependencies
        #[arg(long)]
        no_depends: bool,
        /// Ignore runtime depends while walking dependencies
        #[arg(long)]
        ignore_depends: bool,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which package provides a name
    Provider {
        name: String,
        /// Architecture of the indexes to search (default: native)
        #[arg(short, long)]
        arch: Option<Arch>,
        /// Packages about to be installed
        #[arg(short, long)]
        install: Vec<String>,
    },
    /// List the names provided by an index file
    Index {
        path: PathBuf,
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> Result<ResolverConfig> {
    let mut config = match &cli.config {
        Some(path) => ResolverConfig::load(path)?,
        None => ResolverConfig::default(),
    };
    if let Some(recipes) = &cli.recipes {
        config.recipes = Some(recipes.clone());
    }
    Ok(config)
}

fn load_recipes(config: &ResolverConfig) -> Result<RecipeBook> {
    match &config.recipes {
        Some(dir) => load_recipe_dir(dir)
            .with_context(|| format!("Failed to load recipes from {}", dir.display())),
        None => {
            debug!("No recipe tree configured");
            Ok(RecipeBook::new())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = load_config(&cli)?;
    let store = IndexStore::new();

    match cli.command {
        Commands::Plan {
            packages,
            arch,
            force,
            strict,
            src,
            no_depends,
            ignore_depends,
            json,
        } => {
            let recipes = load_recipes(&config)?;
            let ctx = BuildContext::new(&config, &store, &recipes);
            let mut options = BuildOptions::new()
                .with_force(force)
                .with_strict(strict)
                .with_from_src(src)
                .with_no_depends(no_depends)
                .with_ignore_depends(ignore_depends);
            options.arch = arch;

            let plan = BuildPlanner::new(&ctx).plan(&packages, &options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
                return Ok(());
            }
            if plan.is_empty() {
                println!("Nothing to build");
                return Ok(());
            }
            for item in &plan.queue {
                println!(
                    "{}/{} {} -> {}",
                    item.channel,
                    item.name,
                    item.version,
                    item.output.display()
                );
                for diagnostic in &item.diagnostics {
                    println!("    note: {}", diagnostic);
                }
            }
            info!("Requested and queued: {}", plan.requested_queued.join(", "));
            Ok(())
        }
        Commands::Provider {
            name,
            arch,
            install,
        } => {
            let arch = arch.unwrap_or(config.native_arch);
            let providers = store.providers(&name, &config.index_files(arch))?;
            let context = ProviderContext::new()
                .with_install_set(install)
                .with_pins(config.providers.clone());
            match pick_provider(&name, &providers, &context) {
                Some(choice) => println!(
                    "{} {} ({})",
                    choice.record.pkgname, choice.record.version, choice.reason
                ),
                None => println!("No provider for {}", name),
            }
            Ok(())
        }
        Commands::Index { path, json } => {
            let Some(records) = load_records(&path)? else {
                println!("No index at {}", path.display());
                return Ok(());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            for record in &records {
                let kind = if record.is_virtual() { " (virtual)" } else { "" };
                println!("{} {}{}", record.pkgname, record.version, kind);
                for alias in &record.provides {
                    println!("    provides {}", alias);
                }
            }
            Ok(())
        }
    }
}
