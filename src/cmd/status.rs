//! `conductor status` and `conductor metrics`: read-only project reports.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::metrics::{self, DriftIndicators};
use crate::resolver::{self, ProjectSnapshot};
use crate::ui;

pub fn cmd_status(project_dir: &Path, config: &Config) -> Result<()> {
    let snapshot = ProjectSnapshot::gather(project_dir, config.require_architecture)
        .context("failed to gather project snapshot")?;

    ui::print_warnings(&snapshot.warnings);
    ui::print_phase(resolver::resolve(&snapshot));
    ui::print_progress(&snapshot.counts);

    if let Some(verdict) = snapshot.latest_verdict {
        println!("Latest verdict: {}", verdict.as_str());
    }
    Ok(())
}

pub fn cmd_metrics(project_dir: &Path) -> Result<()> {
    let history = metrics::load_history(project_dir);
    let indicators = DriftIndicators::compute(&history);
    ui::print_drift_report(&history, &indicators);
    Ok(())
}
