//! Project configuration in `.specgraph/config.json`.

use serde::{Deserialize, Serialize};
use specgraph_graph::{CompileOptions, ContextConfig, ReferencePolicy, DEFAULT_GRAPH_VERSION};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Directory holding project configuration, relative to the project root.
pub const CONFIG_DIR: &str = ".specgraph";
const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Settings shared by every command. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecgraphConfig {
    /// Directory holding entities.json, workflows.json and friends.
    pub specs_dir: PathBuf,
    /// Where the compiled graph document is written.
    pub graph_path: PathBuf,
    pub graph_version: String,
    pub reference_policy: ReferencePolicy,
}

impl Default for SpecgraphConfig {
    fn default() -> Self {
        Self {
            specs_dir: PathBuf::from("specs"),
            graph_path: PathBuf::from("src/data/graph.json"),
            graph_version: DEFAULT_GRAPH_VERSION.to_string(),
            reference_policy: ReferencePolicy::Permissive,
        }
    }
}

impl SpecgraphConfig {
    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Reads the config under `root`, falling back to defaults when the
    /// project has not been initialized.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(root);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Writes the config under `root`, creating the config directory.
    pub fn save(&self, root: &Path) -> Result<(), ConfigError> {
        let path = Self::path(root);
        let io_err = |source| ConfigError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(io_err)
    }

    /// Location of the compiled graph, resolved against `root`.
    pub fn graph_path(&self, root: &Path) -> PathBuf {
        root.join(&self.graph_path)
    }

    /// Resolves relative paths against `root`.
    pub fn context_config(&self, root: &Path) -> ContextConfig {
        ContextConfig::new(root.join(&self.specs_dir), self.graph_path(root))
            .with_compile_options(CompileOptions {
                version: self.graph_version.clone(),
                reference_policy: self.reference_policy,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempdir().unwrap();
        let config = SpecgraphConfig::load(dir.path()).unwrap();
        assert_eq!(config, SpecgraphConfig::default());
        assert_eq!(config.graph_path, PathBuf::from("src/data/graph.json"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let config = SpecgraphConfig {
            specs_dir: PathBuf::from("model"),
            reference_policy: ReferencePolicy::Strict,
            ..SpecgraphConfig::default()
        };
        config.save(dir.path()).unwrap();

        assert!(dir.path().join(".specgraph").join("config.json").exists());
        assert_eq!(SpecgraphConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        fs::write(
            SpecgraphConfig::path(dir.path()),
            r#"{"reference_policy": "strict"}"#,
        )
        .unwrap();

        let config = SpecgraphConfig::load(dir.path()).unwrap();
        assert_eq!(config.reference_policy, ReferencePolicy::Strict);
        assert_eq!(config.specs_dir, PathBuf::from("specs"));
        assert_eq!(config.graph_version, "2.0");
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        fs::write(SpecgraphConfig::path(dir.path()), "{").unwrap();

        let err = SpecgraphConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_context_config_resolves_against_root() {
        let root = Path::new("/project");
        let context = SpecgraphConfig::default().context_config(root);
        assert_eq!(context.specs_dir, PathBuf::from("/project/specs"));
        assert_eq!(context.graph_path, PathBuf::from("/project/src/data/graph.json"));
        assert_eq!(context.compile.version, "2.0");
    }
}
