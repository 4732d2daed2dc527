use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

use crate::{error::ExoError, graph::Recipes};

/// File name the CLI looks for when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "exo.toml";

/// Project settings, read from `exo.toml`.
///
/// ```toml
/// content_root = "notes"
/// graph_file = "build/graph.json"
///
/// [recipes.predicates.in]
/// pagerank = true
/// degree = { }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExoConfig {
    /// Directory holding the markup documents
    pub content_root: PathBuf,
    /// Where the built graph is saved to and loaded from
    pub graph_file: PathBuf,
    /// File extension identifying documents, without the dot
    pub extension: String,
    pub recipes: Recipes,
}

impl Default for ExoConfig {
    fn default() -> Self {
        ExoConfig {
            content_root: PathBuf::from("content"),
            graph_file: PathBuf::from("graph.json"),
            extension: "md".to_string(),
            recipes: Recipes::default(),
        }
    }
}

impl ExoConfig {
    pub fn load(path: &Path) -> Result<ExoConfig, ExoError> {
        TomlConfigProvider::new(path.to_path_buf()).get_config()
    }

    pub fn save(&self, path: &Path) -> Result<(), ExoError> {
        TomlConfigProvider::new(path.to_path_buf()).set_config(self)
    }

    /// Anchor relative paths at `base`, normally the directory holding the config file.
    pub fn relative_to(&self, base: &Path) -> ExoConfig {
        let anchor = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base.join(p)
            }
        };
        ExoConfig {
            content_root: anchor(&self.content_root),
            graph_file: anchor(&self.graph_file),
            ..self.clone()
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<ExoConfig, ExoError>;
    fn set_config(&self, config: &ExoConfig) -> Result<(), ExoError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<ExoConfig, ExoError> {
        tracing::debug!("Attempting to read config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(ExoConfig::default());
        }
        let config: ExoConfig = toml::from_str(&get_content(&self.path)?)
            .map_err(|e| ExoError::Config(format!("{}: {e}", self.path.display())))?;
        if config.extension.is_empty() || config.extension.starts_with('.') {
            return Err(ExoError::Config(format!(
                "extension must be non-empty and given without a leading dot, got '{}'",
                config.extension
            )));
        }
        Ok(config)
    }

    fn set_config(&self, config: &ExoConfig) -> Result<(), ExoError> {
        tracing::debug!("Attempting to write config to: {:?}", &self.path);
        write(&self.path, toml::to_string(config)?)?;
        Ok(())
    }
}

pub fn get_content<P: AsRef<Path>>(path: P) -> Result<String, ExoError> {
    tracing::debug!("Reading {:?}", path.as_ref());
    Ok(read_to_string(path)?)
}
