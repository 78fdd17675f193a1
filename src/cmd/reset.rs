//! `conductor reset`: remove generated project state.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;

use crate::architecture;
use crate::features::FEATURE_LIST_FILENAME;
use crate::history::VALIDATION_HISTORY_FILENAME;
use crate::metrics::METRICS_FILENAME;

pub fn cmd_reset(project_dir: &Path, force: bool) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Remove all conductor state in {}?",
                project_dir.display()
            ))
            .default(false)
            .interact()
            .context("reset confirmation failed")?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let mut removed = 0;
    let lock_name = format!("{METRICS_FILENAME}.lock");
    for name in [
        FEATURE_LIST_FILENAME,
        METRICS_FILENAME,
        lock_name.as_str(),
        VALIDATION_HISTORY_FILENAME,
    ] {
        let path = project_dir.join(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            removed += 1;
        }
    }

    // Incomplete architecture dirs go too; a complete lock is kept.
    if architecture::cleanup_partial(project_dir) {
        removed += 1;
    }

    println!(
        "{} removed {removed} artifact(s)",
        style("reset:").green().bold()
    );
    Ok(())
}
