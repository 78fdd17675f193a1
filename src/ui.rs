//! Terminal output for the operator.
//!
//! Styled via `console`, with an `indicatif` bar for feature progress.
//! Everything here is presentation; nothing feeds back into resolution.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Config;
use crate::evaluation::AgentRole;
use crate::features::FeatureCounts;
use crate::metrics::{DriftHistory, DriftIndicators, VelocityTrend};
use crate::resolver::Phase;
use crate::stack::Stack;

pub fn print_banner(config: &Config, stack: Stack) {
    println!();
    println!("{}", style("conductor").cyan().bold());
    println!("  project: {}", config.project_dir.display());
    println!("  stack:   {stack}");
    println!("  model:   {}", config.agent.model);
    match config.agent.max_iterations {
        Some(cap) => println!("  sessions: up to {cap}"),
        None => println!("  sessions: until done"),
    }
    println!();
}

pub fn print_session_header(session_id: u32, phase: Phase, role: AgentRole) {
    println!(
        "{} {} {} {}",
        style(format!("[session {session_id}]")).bold(),
        style(phase.as_str()).yellow(),
        style("->").dim(),
        style(role.as_str()).green()
    );
}

/// One-shot progress bar of passing features, plus the split by kind.
pub fn print_progress(counts: &FeatureCounts) {
    if counts.total == 0 {
        println!("{}", style("No features yet.").dim());
        return;
    }

    let bar = ProgressBar::new(counts.total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░"),
    );
    bar.set_prefix("Features");
    bar.set_position(counts.passing as u64);
    bar.abandon();

    println!(
        "  automated {}/{}  manual {}/{}  blocked {}",
        counts.automated_passing,
        counts.automated_total,
        counts.manual_passing,
        counts.manual_total,
        counts.blocked
    );
}

pub fn print_phase(phase: Phase) {
    let styled = match phase {
        Phase::Done => style(phase.as_str()).green().bold(),
        Phase::Error => style(phase.as_str()).red().bold(),
        _ => style(phase.as_str()).yellow(),
    };
    println!("Phase: {styled}");
}

fn format_rate(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

/// Drift report for the `metrics` subcommand.
pub fn print_drift_report(history: &DriftHistory, indicators: &DriftIndicators) {
    println!("{}", style("Drift metrics").bold());
    println!(
        "  sessions: {}  validations: {}  regressions caught: {}",
        history.total_sessions,
        history.validation_attempts.len(),
        history.total_regressions_caught
    );
    println!(
        "  avg features/session: {:.2}",
        history.average_features_per_session
    );

    let trend = match indicators.velocity_trend {
        VelocityTrend::Increasing => style("increasing").green(),
        VelocityTrend::Stable => style("stable").dim(),
        VelocityTrend::Decreasing => style("decreasing").red(),
        VelocityTrend::InsufficientData => style("insufficient data").dim(),
    };
    println!("  velocity trend: {trend}");
    println!("  regression rate: {}", format_rate(indicators.regression_rate));
    println!("  rejection rate: {}", format_rate(indicators.rejection_rate));
    println!(
        "  multi-feature sessions: {}",
        format_rate(indicators.multi_feature_rate)
    );
    println!(
        "  incomplete evaluations: {}",
        format_rate(indicators.incomplete_evaluation_rate)
    );
}

pub fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        println!("{} {warning}", style("warning:").yellow().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rate_is_percent() {
        assert_eq!(format_rate(0.5), "50%");
        assert_eq!(format_rate(0.0), "0%");
        assert_eq!(format_rate(1.0), "100%");
    }
}
