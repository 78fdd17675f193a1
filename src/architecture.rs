//! Architecture lock files.
//!
//! The architecture phase writes three YAML documents under
//! `architecture/`: `contracts.yaml` (API contracts), `schemas.yaml`
//! (data schemas), and `decisions.yaml` (decision records). The resolver
//! only consumes their presence and validity; a malformed file degrades to
//! "absent" for that file alone, with a warning carried back to the
//! caller.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::decisions;
use crate::errors::ArtifactError;

pub const ARCH_DIR_NAME: &str = "architecture";
pub const CONTRACTS_FILE: &str = "contracts.yaml";
pub const SCHEMAS_FILE: &str = "schemas.yaml";
pub const DECISIONS_FILE: &str = "decisions.yaml";
pub const REQUIRED_FILES: &[&str] = &[CONTRACTS_FILE, SCHEMAS_FILE, DECISIONS_FILE];

/// A single endpoint in an API contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEndpoint {
    pub path: String,
    pub method: String,
}

/// An API contract definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub endpoints: Vec<ContractEndpoint>,
}

/// A field in a data schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// A data schema definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Deserialize)]
struct ContractsFile {
    #[serde(default)]
    contracts: Vec<Contract>,
}

#[derive(Debug, Deserialize)]
struct SchemasFile {
    #[serde(default)]
    schemas: Vec<Schema>,
}

pub fn architecture_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(ARCH_DIR_NAME)
}

/// Load and validate `contracts.yaml`. A missing file is an empty list.
pub fn load_contracts(project_dir: &Path) -> Result<Vec<Contract>, ArtifactError> {
    let path = architecture_dir(project_dir).join(CONTRACTS_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ArtifactError::ReadFailed {
        name: "contracts.yaml",
        path: path.clone(),
        source,
    })?;

    let file: ContractsFile =
        serde_yaml::from_str(&content).map_err(|e| ArtifactError::ParseFailed {
            name: "contracts.yaml",
            message: e.to_string(),
        })?;

    for (index, contract) in file.contracts.iter().enumerate() {
        if contract.name.trim().is_empty() {
            return Err(ArtifactError::MissingField {
                name: "contracts.yaml",
                field: "name",
                index,
            });
        }
    }

    Ok(file.contracts)
}

/// Load and validate `schemas.yaml`. A missing file is an empty list.
pub fn load_schemas(project_dir: &Path) -> Result<Vec<Schema>, ArtifactError> {
    let path = architecture_dir(project_dir).join(SCHEMAS_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ArtifactError::ReadFailed {
        name: "schemas.yaml",
        path: path.clone(),
        source,
    })?;

    let file: SchemasFile =
        serde_yaml::from_str(&content).map_err(|e| ArtifactError::ParseFailed {
            name: "schemas.yaml",
            message: e.to_string(),
        })?;

    for (index, schema) in file.schemas.iter().enumerate() {
        if schema.name.trim().is_empty() {
            return Err(ArtifactError::MissingField {
                name: "schemas.yaml",
                field: "name",
                index,
            });
        }
    }

    Ok(file.schemas)
}

/// Outcome of checking the architecture lock.
///
/// `locked` means all three files exist and parse; `warnings` collects
/// per-file degradations so the caller can surface them instead of
/// silently treating a corrupt lock as absent.
#[derive(Debug, Clone, Default)]
pub struct LockStatus {
    pub locked: bool,
    pub warnings: Vec<String>,
}

/// Check whether the architecture lock is present and valid.
///
/// Each file is checked independently: a missing or malformed file makes
/// that file count as absent (degrading the lock to not-locked) and adds a
/// warning, but never aborts the check.
pub fn check_lock(project_dir: &Path) -> LockStatus {
    let arch_dir = architecture_dir(project_dir);
    let mut status = LockStatus::default();

    if !arch_dir.exists() {
        return status;
    }

    let mut all_valid = true;

    for filename in REQUIRED_FILES {
        if !arch_dir.join(filename).exists() {
            all_valid = false;
            status.warnings.push(format!("Missing required file: {filename}"));
        }
    }

    if !all_valid {
        return status;
    }

    if let Err(e) = load_contracts(project_dir) {
        all_valid = false;
        status.warnings.push(e.to_string());
    }
    if let Err(e) = load_schemas(project_dir) {
        all_valid = false;
        status.warnings.push(e.to_string());
    }
    if let Err(e) = decisions::load_decisions(project_dir) {
        all_valid = false;
        status.warnings.push(e.to_string());
    }

    status.locked = all_valid;
    status
}

/// Remove an incomplete `architecture/` directory left by a failed
/// architecture phase, so the next session does not see a partial lock.
///
/// Refuses to touch symlinks or anything that resolves outside the
/// project directory. Returns whether cleanup was performed.
pub fn cleanup_partial(project_dir: &Path) -> bool {
    let arch_dir = architecture_dir(project_dir);

    if !arch_dir.exists() || !arch_dir.is_dir() || arch_dir.is_symlink() {
        return false;
    }

    let (Ok(resolved_arch), Ok(resolved_project)) =
        (arch_dir.canonicalize(), project_dir.canonicalize())
    else {
        return false;
    };
    if !resolved_arch.starts_with(&resolved_project) {
        return false;
    }

    let all_exist = REQUIRED_FILES.iter().all(|f| arch_dir.join(f).exists());
    if all_exist {
        // Complete lock, nothing to clean.
        return false;
    }

    std::fs::remove_dir_all(&arch_dir).is_ok()
}
