use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use conductor::cmd;
use conductor::config::{CliOverrides, Config};
use conductor::stack::Stack;

#[derive(Parser)]
#[command(name = "conductor")]
#[command(version, about = "Multi-session autonomous coding workflow driver")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Path to an explicit config file (default: .conductor.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run sessions until the project reaches a terminal phase
    Run {
        /// Path to the spec file
        #[arg(long)]
        spec_file: Option<PathBuf>,

        /// Inline goal, used when no spec file is given
        #[arg(long)]
        goal: Option<String>,

        /// Number of features for the initializer to produce
        #[arg(long)]
        features: Option<u32>,

        /// Tech stack (node, python); auto-detected if not specified
        #[arg(long)]
        stack: Option<Stack>,

        /// Model passed to the assistant CLI
        #[arg(long)]
        model: Option<String>,

        /// Stop after this many sessions
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Require an architecture lock before implementation
        #[arg(long)]
        require_architecture: bool,
    },
    /// Show phase, feature progress, and warnings
    Status,
    /// Show drift metrics and trend indicators
    Metrics,
    /// Validate a shell command against the active policy (hook entry point)
    Guard {
        /// The command line to check, given after `--`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
    /// View or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<cmd::config::ConfigCommands>,
    },
    /// Remove generated project state
    Reset {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let base_overrides = cli_overrides_base(&cli);

    match cli.command {
        Commands::Run {
            spec_file,
            goal,
            features,
            stack,
            model,
            max_iterations,
            require_architecture,
        } => {
            let overrides = CliOverrides {
                spec_file,
                goal,
                features,
                stack,
                model,
                max_iterations,
                config_path: cli.config.clone(),
                require_architecture: require_architecture.then_some(true),
            };
            let config = Config::merge(&project_dir, overrides)?;
            cmd::cmd_run(&project_dir, config).await?;
        }
        Commands::Status => {
            let config = Config::merge(&project_dir, base_overrides)?;
            cmd::cmd_status(&project_dir, &config)?;
        }
        Commands::Metrics => cmd::cmd_metrics(&project_dir)?,
        Commands::Guard { command } => {
            let config = Config::merge(&project_dir, base_overrides)?;
            cmd::cmd_guard(&config, &command)?;
        }
        Commands::Config { command } => cmd::cmd_config(&project_dir, command)?,
        Commands::Reset { force } => cmd::cmd_reset(&project_dir, force)?,
    }

    Ok(())
}

fn cli_overrides_base(cli: &Cli) -> CliOverrides {
    CliOverrides {
        config_path: cli.config.clone(),
        ..CliOverrides::default()
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("conductor={default_filter}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
