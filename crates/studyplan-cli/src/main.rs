use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studyplan-cli", version, about = "Studyplan CLI")]
struct Cli {
    /// Config file to use instead of ~/.config/studyplan/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate or update a study plan from a JSON snapshot
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Energy curve and personal overrides
    Energy {
        #[command(subcommand)]
        action: commands::energy::EnergyAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Plan { action } => commands::plan::run(action, config_path),
        Commands::Energy { action } => commands::energy::run(action, config_path),
        Commands::Config { action } => commands::config::run(action, config_path),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
