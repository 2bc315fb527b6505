use clap::Subcommand;
use learnhub_core::{Config, UnlockEngine};

use super::{open, print_json, require_user};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Mark a task complete and unlock any tools it earns
    Complete {
        /// Learner email
        email: String,
        /// Module id (e.g. "foundation")
        module: String,
        /// Task number within the module
        task: u32,
    },
    /// Show completed tasks, for one module or all of them
    Show {
        /// Learner email
        email: String,
        /// Module id
        module: Option<String>,
    },
    /// XP and per-module completion
    Summary {
        /// Learner email
        email: String,
    },
}

pub fn run(action: ProgressAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (catalog, db) = open(config)?;
    let engine = UnlockEngine::new(&catalog, &db);

    match action {
        ProgressAction::Complete {
            email,
            module,
            task,
        } => {
            let user = require_user(&db, &email)?;
            let outcome = engine.complete_task(&user.id, &module, task)?;
            print_json(&outcome)?;
        }
        ProgressAction::Show { email, module } => {
            let user = require_user(&db, &email)?;
            let progress = engine.progress();
            match module {
                Some(module) => print_json(&progress.get_progress(&user.id, &module)?)?,
                None => print_json(&progress.list_progress(&user.id)?)?,
            }
        }
        ProgressAction::Summary { email } => {
            let user = require_user(&db, &email)?;
            print_json(&engine.progress().course_summary(&user.id)?)?;
        }
    }
    Ok(())
}
