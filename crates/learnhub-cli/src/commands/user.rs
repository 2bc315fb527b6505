use clap::Subcommand;
use learnhub_core::Config;

use super::{open, print_json, require_user};

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a learner
    Create {
        /// Email address (unique)
        email: String,
        /// Display name
        #[arg(long, default_value = "")]
        name: String,
    },
    /// List all learners
    List,
    /// Show one learner
    Show {
        /// Email address
        email: String,
    },
}

pub fn run(action: UserAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (_, db) = open(config)?;

    match action {
        UserAction::Create { email, name } => {
            let user = db.create_user(&email, &name)?;
            print_json(&user)?;
        }
        UserAction::List => {
            print_json(&db.list_users()?)?;
        }
        UserAction::Show { email } => {
            print_json(&require_user(&db, &email)?)?;
        }
    }
    Ok(())
}
