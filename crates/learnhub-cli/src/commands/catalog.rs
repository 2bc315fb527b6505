use std::path::PathBuf;

use clap::Subcommand;
use learnhub_core::{Catalog, Config};

use super::print_json;

#[derive(Subcommand)]
pub enum CatalogAction {
    /// List modules and their tasks
    Modules,
    /// List reward tools and their unlock conditions
    Tools,
    /// Validate a catalog file without installing it
    Check {
        /// Path to a catalog TOML file
        path: PathBuf,
    },
}

pub fn run(action: CatalogAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CatalogAction::Modules => {
            let catalog = config.catalog()?;
            print_json(&catalog.modules())?;
        }
        CatalogAction::Tools => {
            let catalog = config.catalog()?;
            print_json(&catalog.tools().collect::<Vec<_>>())?;
        }
        CatalogAction::Check { path } => {
            let catalog = Catalog::load(&path)?;
            println!(
                "ok: {} modules, {} tasks, {} tools",
                catalog.modules().len(),
                catalog.total_tasks(),
                catalog.tools().count()
            );
        }
    }
    Ok(())
}
