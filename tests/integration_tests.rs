//! Integration tests for the conductor CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn conductor() -> Command {
    cargo_bin_cmd!("conductor")
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

fn write_feature_list(dir: &TempDir, json: &str) {
    fs::write(dir.path().join("feature_list.json"), json).unwrap();
}

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        conductor().arg("--help").assert().success();
    }

    #[test]
    fn test_version() {
        conductor().arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        conductor().arg("frobnicate").assert().failure();
    }
}

mod status {
    use super::*;

    #[test]
    fn test_status_fresh_project_needs_init() {
        let dir = create_temp_project();
        conductor()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("needs_init"));
    }

    #[test]
    fn test_status_with_failing_feature_is_implementing() {
        let dir = create_temp_project();
        write_feature_list(
            &dir,
            r#"[{"description": "login works", "steps": ["open app"], "category": "functional", "passes": false}]"#,
        );

        conductor()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("implementing"));
    }

    #[test]
    fn test_status_all_passing_needs_validation() {
        let dir = create_temp_project();
        write_feature_list(
            &dir,
            r#"[{"description": "login works", "steps": ["open app"], "category": "functional", "passes": true}]"#,
        );

        conductor()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("needs_validation"));
    }

    #[test]
    fn test_status_empty_feature_list_is_error() {
        let dir = create_temp_project();
        write_feature_list(&dir, "[]");

        conductor()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("error"));
    }

    #[test]
    fn test_status_malformed_feature_list_degrades_to_error() {
        let dir = create_temp_project();
        write_feature_list(&dir, "{ not json");

        conductor()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("warning:"))
            .stdout(predicate::str::contains("error"));
    }

    #[test]
    fn test_status_approved_verdict_is_done() {
        let dir = create_temp_project();
        write_feature_list(
            &dir,
            r#"[{"description": "login works", "steps": ["open app"], "category": "functional", "passes": true}]"#,
        );
        fs::write(
            dir.path().join("validation-history.json"),
            r#"{"attempts": [{"timestamp": "2026-08-01T00:00:00Z", "result": "approved", "rejected_indices": [], "summary": "all pass"}]}"#,
        )
        .unwrap();

        conductor()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("done"));
    }
}

mod metrics {
    use super::*;

    #[test]
    fn test_metrics_empty_project() {
        let dir = create_temp_project();
        conductor()
            .current_dir(dir.path())
            .arg("metrics")
            .assert()
            .success()
            .stdout(predicate::str::contains("insufficient data"));
    }

    #[test]
    fn test_metrics_reads_history() {
        let dir = create_temp_project();
        fs::write(
            dir.path().join("drift-metrics.json"),
            r#"{
  "sessions": [
    {"session_id": 1, "timestamp": "2026-08-01T00:00:00Z", "features_attempted": 2, "features_completed": 1, "regressions_caught": 1}
  ],
  "validation_attempts": [],
  "total_sessions": 1,
  "total_regressions_caught": 1,
  "average_features_per_session": 1.0,
  "rejection_count": 0
}"#,
        )
        .unwrap();

        conductor()
            .current_dir(dir.path())
            .arg("metrics")
            .assert()
            .success()
            .stdout(predicate::str::contains("regressions caught: 1"));
    }
}

mod config {
    use super::*;

    #[test]
    fn test_config_init_writes_template() {
        let dir = create_temp_project();
        conductor()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(dir.path().join(".conductor.yaml").exists());
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = create_temp_project();
        fs::write(dir.path().join(".conductor.yaml"), "features: 3\n").unwrap();
        conductor()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .failure();
    }

    #[test]
    fn test_config_validate_reports_ok() {
        let dir = create_temp_project();
        fs::write(dir.path().join(".conductor.yaml"), "features: 3\n").unwrap();
        conductor()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ok"));
    }

    #[test]
    fn test_config_validate_rejects_malformed() {
        let dir = create_temp_project();
        fs::write(dir.path().join(".conductor.yaml"), "features: [oops\n").unwrap();
        conductor()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .failure();
    }

    #[test]
    fn test_config_show_includes_defaults() {
        let dir = create_temp_project();
        conductor()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("features: 50"));
    }
}

mod reset {
    use super::*;

    #[test]
    fn test_reset_force_removes_artifacts() {
        let dir = create_temp_project();
        write_feature_list(&dir, "[]");
        fs::write(dir.path().join("drift-metrics.json"), "{}").unwrap();
        fs::write(dir.path().join("validation-history.json"), "{}").unwrap();

        conductor()
            .current_dir(dir.path())
            .args(["reset", "--force"])
            .assert()
            .success();

        assert!(!dir.path().join("feature_list.json").exists());
        assert!(!dir.path().join("drift-metrics.json").exists());
        assert!(!dir.path().join("validation-history.json").exists());
    }

    #[test]
    fn test_reset_force_removes_partial_architecture() {
        let dir = create_temp_project();
        let arch = dir.path().join("architecture");
        fs::create_dir(&arch).unwrap();
        fs::write(arch.join("contracts.yaml"), "contracts: []\n").unwrap();

        conductor()
            .current_dir(dir.path())
            .args(["reset", "--force"])
            .assert()
            .success();
        assert!(!arch.exists());
    }
}

mod guard {
    use super::*;

    #[test]
    fn test_guard_allows_base_command() {
        let dir = create_temp_project();
        conductor()
            .current_dir(dir.path())
            .args(["guard", "--", "ls", "-la"])
            .assert()
            .success();
    }

    #[test]
    fn test_guard_blocks_denylisted_command() {
        let dir = create_temp_project();
        conductor()
            .current_dir(dir.path())
            .args(["guard", "--", "rm", "-rf", "/"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("denied"));
    }

    #[test]
    fn test_guard_blocks_command_substitution() {
        let dir = create_temp_project();
        conductor()
            .current_dir(dir.path())
            .args(["guard", "--", "echo", "$(whoami)"])
            .assert()
            .code(2);
    }

    #[test]
    fn test_guard_honors_extra_commands() {
        let dir = create_temp_project();
        fs::write(
            dir.path().join(".conductor.yaml"),
            "security:\n  extra_commands: [cowsay]\n",
        )
        .unwrap();

        conductor()
            .current_dir(dir.path())
            .args(["guard", "--", "cowsay", "moo"])
            .assert()
            .success();
    }
}

mod run {
    use super::*;

    #[test]
    fn test_run_with_unavailable_agent_fails_cleanly() {
        let dir = create_temp_project();
        conductor()
            .current_dir(dir.path())
            .env("CONDUCTOR_AGENT_CMD", "definitely-not-a-real-command")
            .args(["run", "--max-iterations", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("definitely-not-a-real-command"));
    }
}
