//! File-based configuration provider (YAML)
//!
//! Supports user-level (~/.config/kubricate/config.yaml) and
//! workspace-level (<root>/kubricate.config.yaml) config files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{ConfigError, ConfigResult, KubricateConfig};

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/kubricate/config.yaml)
    User,
    /// Workspace-level config (kubricate.config.yaml in the project root)
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }
}

/// Reads and writes [`KubricateConfig`] from a YAML file.
///
/// A missing file is not an error; it loads as the default config. Reads
/// are cached until [`reload`](Self::reload) or a save.
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<KubricateConfig>>,
}

impl FileConfigProvider {
    /// Create a provider for a specific path.
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// User-level config provider (~/.config/kubricate/config.yaml).
    pub fn user() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        let path = config_dir.join("kubricate").join("config.yaml");
        Self::new(path, ConfigLevel::User)
    }

    /// Workspace-level config provider (<root>/kubricate.config.yaml).
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root.as_ref().join("kubricate.config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ConfigResult<KubricateConfig> {
        if !self.path.exists() {
            return Ok(KubricateConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let config: KubricateConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Other(format!("Failed to parse YAML: {}", e)))?;

        Ok(config)
    }

    /// Get cached or load config.
    pub fn get_config(&self) -> ConfigResult<KubricateConfig> {
        let cache = self.cache.read().unwrap();
        if let Some(config) = cache.as_ref() {
            return Ok(config.clone());
        }
        drop(cache);

        let config = self.load()?;
        let mut cache = self.cache.write().unwrap();
        *cache = Some(config.clone());
        Ok(config)
    }

    /// Reload config from disk (invalidate cache).
    pub fn reload(&self) -> ConfigResult<KubricateConfig> {
        let config = self.load()?;
        let mut cache = self.cache.write().unwrap();
        *cache = Some(config.clone());
        Ok(config)
    }

    /// Save config to file and refresh the cache.
    pub fn save(&self, config: &KubricateConfig) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(config)
            .map_err(|e| ConfigError::Other(format!("Failed to serialize YAML: {}", e)))?;

        fs::write(&self.path, content)?;

        let mut cache = self.cache.write().unwrap();
        *cache = Some(config.clone());

        Ok(())
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}
