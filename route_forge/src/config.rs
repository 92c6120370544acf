//! Project-level settings for the `forge-cli` tool.
//!
//! Looked up in `forge.toml` at the project root, then in
//! `[package.metadata.route_forge]` of the project's `Cargo.toml`. Missing
//! keys fall back to the defaults below.

use crate::batch::default_workers;
use crate::compiler::{Compiler, DEFAULT_API_PREFIX};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "forge.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub definitions_dir: PathBuf,
    pub output_dir: PathBuf,
    pub api_prefix: String,
    pub workers: Option<usize>,
    pub log_level: String,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            definitions_dir: PathBuf::from("definitions"),
            output_dir: PathBuf::from("generated/routes"),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            workers: None,
            log_level: "info".to_string(),
        }
    }
}

impl ForgeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Loads the configuration of the project rooted at `project_root`.
    pub fn load(project_root: &Path) -> Result<Self> {
        let forge_toml = project_root.join(CONFIG_FILE);
        if forge_toml.is_file() {
            debug!(path = %forge_toml.display(), "loading config");
            return Self::from_toml_str(&std::fs::read_to_string(forge_toml)?);
        }

        let cargo_toml = project_root.join("Cargo.toml");
        if cargo_toml.is_file() {
            let manifest: toml::Table = toml::from_str(&std::fs::read_to_string(&cargo_toml)?)?;
            let metadata = manifest
                .get("package")
                .and_then(|package| package.get("metadata"))
                .and_then(|metadata| metadata.get("route_forge"));
            if let Some(metadata) = metadata {
                debug!(path = %cargo_toml.display(), "loading config from package metadata");
                return Ok(metadata.clone().try_into()?);
            }
        }

        Ok(Self::default())
    }

    pub fn compiler(&self) -> Compiler {
        Compiler::with_api_prefix(&self.api_prefix)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.filter(|n| *n > 0).unwrap_or_else(default_workers)
    }

    /// Makes the relative directories absolute against `project_root`.
    pub fn resolve_paths(mut self, project_root: &Path) -> Self {
        if self.definitions_dir.is_relative() {
            self.definitions_dir = project_root.join(&self.definitions_dir);
        }
        if self.output_dir.is_relative() {
            self.output_dir = project_root.join(&self.output_dir);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_is_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = ForgeConfig::load(dir.path()).unwrap();
        assert_eq!(config, ForgeConfig::default());
        assert_eq!(config.compiler().api_prefix(), "/api");
    }

    #[test]
    fn test_forge_toml_wins_over_cargo_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"tools\"\n\n[package.metadata.route_forge]\napi_prefix = \"/meta\"\n",
        )
        .unwrap();
        assert_eq!(ForgeConfig::load(dir.path()).unwrap().api_prefix, "/meta");

        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "api_prefix = \"/v2\"\nworkers = 3\ndefinitions_dir = \"modules\"\n",
        )
        .unwrap();
        let config = ForgeConfig::load(dir.path()).unwrap();
        assert_eq!(config.api_prefix, "/v2");
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.definitions_dir, PathBuf::from("modules"));
        assert_eq!(config.output_dir, PathBuf::from("generated/routes"));
    }

    #[test]
    fn test_resolve_paths() {
        let config = ForgeConfig::default().resolve_paths(Path::new("/work/tools"));
        assert_eq!(config.definitions_dir, PathBuf::from("/work/tools/definitions"));
        assert_eq!(config.output_dir, PathBuf::from("/work/tools/generated/routes"));
    }
}
