use clap::Subcommand;
use learnhub_core::{Config, UnlockEngine};

use super::{open, print_json, require_user};

#[derive(Subcommand)]
pub enum ToolsAction {
    /// List every tool with the learner's unlock status
    List {
        /// Learner email
        email: String,
        /// Only show unlocked tools
        #[arg(long)]
        unlocked: bool,
    },
    /// Re-check a module and grant any tools it earns
    Unlock {
        /// Learner email
        email: String,
        /// Module id
        module: String,
    },
    /// Open an unlocked tool (counts one use)
    Use {
        /// Learner email
        email: String,
        /// Tool id
        tool: String,
    },
}

pub fn run(action: ToolsAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (catalog, db) = open(config)?;
    let engine = UnlockEngine::new(&catalog, &db);

    match action {
        ToolsAction::List { email, unlocked } => {
            let user = require_user(&db, &email)?;
            let mut statuses = engine.tool_statuses(&user.id)?;
            if unlocked {
                statuses.retain(|s| s.is_unlocked);
            }
            print_json(&statuses)?;
        }
        ToolsAction::Unlock { email, module } => {
            let user = require_user(&db, &email)?;
            let unlocked = engine.evaluate_and_grant(&user.id, &module)?;
            if unlocked.is_empty() {
                eprintln!("no new tools unlocked");
            }
            print_json(&unlocked)?;
        }
        ToolsAction::Use { email, tool } => {
            let user = require_user(&db, &email)?;
            let record = engine.use_tool(&user.id, &tool)?;
            let content = catalog.tool(&tool).map(|t| t.content.clone());
            print_json(&serde_json::json!({
                "unlock": record,
                "content": content,
            }))?;
        }
    }
    Ok(())
}
