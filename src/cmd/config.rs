//! `conductor config`: show, validate, or initialize configuration.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use crate::config::{self, Config, CONFIG_FILENAME};

#[derive(clap::Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the merged configuration
    Show,
    /// Parse the config file and report problems
    Validate,
    /// Write a commented starter config file
    Init,
}

pub fn cmd_config(project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    match command.unwrap_or(ConfigCommands::Show) {
        ConfigCommands::Show => {
            let config = Config::merge(project_dir, Default::default())?;
            let rendered =
                serde_yaml::to_string(&config).context("failed to render configuration")?;
            print!("{rendered}");
        }
        ConfigCommands::Validate => match Config::find_file(project_dir) {
            Some(path) => {
                Config::load_file(&path)?;
                println!("{} {}", style("ok").green().bold(), path.display());
            }
            None => {
                println!(
                    "No config file found; defaults apply. Run {} to create one.",
                    style("conductor config init").cyan()
                );
            }
        },
        ConfigCommands::Init => {
            let path = project_dir.join(CONFIG_FILENAME);
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            std::fs::write(&path, config::config_template())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Created {}", path.display());
        }
    }
    Ok(())
}
