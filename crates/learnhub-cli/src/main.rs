use clap::{Parser, Subcommand};
use learnhub_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "learnhub", version, about = "LearnHub CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learner accounts
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Task completion and course progress
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Reward tools and unlocks
    Tools {
        #[command(subcommand)]
        action: commands::tools::ToolsAction,
    },
    /// Inspect or check course catalogs
    Catalog {
        #[command(subcommand)]
        action: commands::catalog::CatalogAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr so JSON on stdout stays machine-readable.
///
/// `LEARNHUB_LOG` takes precedence over the configured `log.level`.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env("LEARNHUB_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config);
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::User { action } => commands::user::run(action, &config),
        Commands::Progress { action } => commands::progress::run(action, &config),
        Commands::Tools { action } => commands::tools::run(action, &config),
        Commands::Catalog { action } => commands::catalog::run(action, &config),
        Commands::Config { action } => commands::config::run(action, config),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
