//! Layered configuration.
//!
//! Settings merge from three sources, highest priority first: CLI
//! arguments, a `.conductor.yaml` (or `.yml`) file in the project
//! directory, and built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::stack::Stack;

pub const CONFIG_FILENAME: &str = ".conductor.yaml";
pub const CONFIG_FILENAME_ALT: &str = ".conductor.yml";

/// Agent invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Session cap; `None` runs until a terminal phase.
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Seconds to pause between sessions.
    #[serde(default = "default_auto_continue_delay")]
    pub auto_continue_delay: u64,
}

fn default_model() -> String {
    "claude-opus-4-5".to_string()
}

fn default_max_turns() -> u32 {
    1000
}

fn default_auto_continue_delay() -> u64 {
    3
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_iterations: None,
            max_turns: default_max_turns(),
            auto_continue_delay: default_auto_continue_delay(),
        }
    }
}

/// Security settings layered on top of the built-in command policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Extra allowed executables. Entries on the built-in denylist are
    /// ignored.
    #[serde(default)]
    pub extra_commands: Vec<String>,
}

/// Merged configuration for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub project_dir: PathBuf,
    /// Path to the specification file, relative paths resolved against
    /// the project directory.
    #[serde(default)]
    pub spec_file: Option<PathBuf>,
    /// Inline goal text, used when no spec file is given.
    #[serde(default)]
    pub goal: Option<String>,
    /// Target number of features for the initializer to produce.
    #[serde(default = "default_features")]
    pub features: u32,
    /// Tech stack; auto-detected from marker files when unset.
    #[serde(default)]
    pub stack: Option<Stack>,
    /// Whether the architecture lock must exist before implementation.
    #[serde(default)]
    pub require_architecture: bool,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

fn default_features() -> u32 {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::new(),
            spec_file: None,
            goal: None,
            features: default_features(),
            stack: None,
            require_architecture: false,
            agent: AgentConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// CLI-provided overrides; `None` means not specified.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub spec_file: Option<PathBuf>,
    pub goal: Option<String>,
    pub features: Option<u32>,
    pub stack: Option<Stack>,
    pub model: Option<String>,
    pub max_iterations: Option<u32>,
    pub config_path: Option<PathBuf>,
    pub require_architecture: Option<bool>,
}

impl Config {
    /// Locate the config file in the project directory, preferring the
    /// `.yaml` spelling.
    pub fn find_file(project_dir: &Path) -> Option<PathBuf> {
        for name in [CONFIG_FILENAME, CONFIG_FILENAME_ALT] {
            let candidate = project_dir.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }

    pub fn load_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Merge defaults, config file, and CLI overrides for a project.
    pub fn merge(project_dir: &Path, cli: CliOverrides) -> Result<Config> {
        let mut config = match cli.config_path.clone().or_else(|| Self::find_file(project_dir)) {
            Some(path) => Self::load_file(&path)?,
            None => Config::default(),
        };
        config.project_dir = project_dir.to_path_buf();

        if let Some(spec) = &config.spec_file
            && spec.is_relative()
        {
            config.spec_file = Some(project_dir.join(spec));
        }

        if let Some(spec) = cli.spec_file {
            config.spec_file = Some(spec);
        }
        if let Some(goal) = cli.goal {
            config.goal = Some(goal);
        }
        if let Some(features) = cli.features {
            config.features = features;
        }
        if let Some(stack) = cli.stack {
            config.stack = Some(stack);
        }
        if let Some(model) = cli.model {
            config.agent.model = model;
        }
        if let Some(max_iterations) = cli.max_iterations {
            config.agent.max_iterations = Some(max_iterations);
        }
        if let Some(require) = cli.require_architecture {
            config.require_architecture = require;
        }

        Ok(config)
    }

    /// Spec text for the initializer: file contents if a spec file is
    /// set and readable, otherwise the inline goal.
    pub fn spec_content(&self) -> Option<String> {
        if let Some(path) = &self.spec_file
            && let Ok(content) = std::fs::read_to_string(path)
        {
            return Some(content);
        }
        self.goal.clone()
    }

    /// Resolve the stack, auto-detecting when unconfigured.
    pub fn resolved_stack(&self) -> Stack {
        self.stack
            .unwrap_or_else(|| crate::stack::detect_stack(&self.project_dir))
    }
}

/// Commented starter config written by `conductor config init`.
pub fn config_template() -> &'static str {
    r#"# Conductor configuration

# Specification: provide either spec_file or goal
# spec_file: ./docs/SPEC.md
# goal: "Build a REST API with authentication"

# Number of features to generate (default: 50)
features: 50

# Tech stack, auto-detected if not specified
# Options: node, python
# stack: python

# Require an architecture lock before implementation begins
# require_architecture: true

# Agent settings
agent:
  model: claude-opus-4-5
  # max_iterations: 10     # Limit sessions (default: unlimited)
  # auto_continue_delay: 3 # Seconds between sessions

# Security settings
security:
  extra_commands: []
  # Additional allowed commands:
  # extra_commands:
  #   - docker
  #   - make
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_no_file() {
        let dir = tempdir().unwrap();
        let config = Config::merge(dir.path(), CliOverrides::default()).unwrap();
        assert_eq!(config.features, 50);
        assert_eq!(config.agent.max_turns, 1000);
        assert!(config.agent.max_iterations.is_none());
        assert!(!config.require_architecture);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            "features: 12\nstack: python\nagent:\n  model: test-model\n",
        )
        .unwrap();

        let config = Config::merge(dir.path(), CliOverrides::default()).unwrap();
        assert_eq!(config.features, 12);
        assert_eq!(config.stack, Some(Stack::Python));
        assert_eq!(config.agent.model, "test-model");
        // Unset fields keep their defaults.
        assert_eq!(config.agent.auto_continue_delay, 3);
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "features: 12\n").unwrap();

        let cli = CliOverrides {
            features: Some(7),
            model: Some("cli-model".into()),
            ..CliOverrides::default()
        };
        let config = Config::merge(dir.path(), cli).unwrap();
        assert_eq!(config.features, 7);
        assert_eq!(config.agent.model, "cli-model");
    }

    #[test]
    fn test_yml_spelling_found() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME_ALT), "features: 3\n").unwrap();
        let found = Config::find_file(dir.path()).unwrap();
        assert!(found.ends_with(CONFIG_FILENAME_ALT));
    }

    #[test]
    fn test_relative_spec_file_resolved() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "spec_file: docs/SPEC.md\n").unwrap();
        let config = Config::merge(dir.path(), CliOverrides::default()).unwrap();
        assert_eq!(config.spec_file, Some(dir.path().join("docs/SPEC.md")));
    }

    #[test]
    fn test_spec_content_prefers_file_over_goal() {
        let dir = tempdir().unwrap();
        let spec = dir.path().join("SPEC.md");
        std::fs::write(&spec, "the real spec").unwrap();

        let config = Config {
            project_dir: dir.path().to_path_buf(),
            spec_file: Some(spec),
            goal: Some("the goal".into()),
            ..Config::default()
        };
        assert_eq!(config.spec_content().as_deref(), Some("the real spec"));
    }

    #[test]
    fn test_spec_content_falls_back_to_goal() {
        let config = Config {
            spec_file: Some(PathBuf::from("/nonexistent/SPEC.md")),
            goal: Some("the goal".into()),
            ..Config::default()
        };
        assert_eq!(config.spec_content().as_deref(), Some("the goal"));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "features: [not a number\n").unwrap();
        assert!(Config::merge(dir.path(), CliOverrides::default()).is_err());
    }

    #[test]
    fn test_template_parses() {
        let config: Config = serde_yaml::from_str(config_template()).unwrap();
        assert_eq!(config.features, 50);
        assert!(config.security.extra_commands.is_empty());
    }
}
