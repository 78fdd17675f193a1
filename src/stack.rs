//! Tech stack detection.
//!
//! Auto-detects the project tech stack from marker files and exposes the
//! per-stack command sets the security policy is built from.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A supported tech stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stack {
    Node,
    Python,
}

impl Stack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stack::Node => "node",
            Stack::Python => "python",
        }
    }

    pub fn parse(name: &str) -> Option<Stack> {
        match name {
            "node" => Some(Stack::Node),
            "python" => Some(Stack::Python),
            _ => None,
        }
    }

    pub fn all() -> &'static [Stack] {
        &[Stack::Node, Stack::Python]
    }

    /// Marker files whose presence identifies this stack.
    fn markers(&self) -> &'static [&'static str] {
        match self {
            Stack::Node => &[
                "package.json",
                "tsconfig.json",
                "package-lock.json",
                "yarn.lock",
                "pnpm-lock.yaml",
            ],
            Stack::Python => &[
                "pyproject.toml",
                "setup.py",
                "requirements.txt",
                "Pipfile",
                "poetry.lock",
                "uv.lock",
            ],
        }
    }

    /// Executables the stack adds on top of the base allowlist.
    pub fn commands(&self) -> &'static [&'static str] {
        match self {
            Stack::Node => &["npm", "npx", "node", "yarn", "pnpm"],
            Stack::Python => &[
                "python", "python3", "pip", "pip3", "uv", "poetry", "pytest", "ruff",
            ],
        }
    }

    /// Dev-server process names `pkill` may target for this stack.
    pub fn pkill_targets(&self) -> &'static [&'static str] {
        match self {
            Stack::Node => &["node", "npm", "npx", "vite", "next", "webpack"],
            Stack::Python => &["python", "python3", "uvicorn", "gunicorn", "flask"],
        }
    }

    /// Default dependency-install command shown to the operator.
    pub fn init_command(&self) -> &'static str {
        match self {
            Stack::Node => "npm install",
            Stack::Python => "pip install -r requirements.txt",
        }
    }

    /// Default dev-server command shown to the operator.
    pub fn dev_command(&self) -> &'static str {
        match self {
            Stack::Node => "npm run dev",
            Stack::Python => "python main.py",
        }
    }
}

impl std::fmt::Display for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stack {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stack::parse(&s.to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Invalid stack '{}'. Valid values: node, python", s))
    }
}

impl Default for Stack {
    /// Node is the default for new or unrecognized projects.
    fn default() -> Self {
        Stack::Node
    }
}

/// Detect the tech stack from marker files in the project directory.
///
/// Returns the first stack with a matching marker; defaults to node for
/// new or unrecognized projects.
pub fn detect_stack(project_dir: &Path) -> Stack {
    if !project_dir.exists() {
        return Stack::default();
    }

    for stack in Stack::all() {
        for marker in stack.markers() {
            if project_dir.join(marker).exists() {
                return *stack;
            }
        }
    }

    Stack::default()
}
