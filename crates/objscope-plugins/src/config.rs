use std::path::{Path, PathBuf};

use objscope_plugin_api::OBJSCOPE_MAX_PLUGINS;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Manager settings, loadable from a JSON file next to the executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManagerConfig {
    /// Subdirectory of the working directory scanned for plugin modules.
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: PathBuf,

    /// Discovery stops registering once this many plugins are loaded.
    #[serde(default = "default_max_plugins")]
    pub max_plugins: usize,
}

impl Default for PluginManagerConfig {
    fn default() -> Self {
        Self {
            plugin_dir: default_plugin_dir(),
            max_plugins: default_max_plugins(),
        }
    }
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from("plugins")
}

fn default_max_plugins() -> usize {
    OBJSCOPE_MAX_PLUGINS
}

impl PluginManagerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
        serde_json::from_str(&raw).map_err(|e| Error::json_at(path, e))
    }

    /// Read the config file if present; a missing or malformed file falls
    /// back to defaults with a warning rather than blocking startup.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable plugin manager config, using defaults");
                Self::default()
            }
        }
    }
}
