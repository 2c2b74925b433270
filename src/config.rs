//! Configuration loaded from `jobvault.toml`.
//!
//! Missing keys fall back to defaults. The `JOBVAULT_STORE` environment
//! variable takes precedence over the file for the store location.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration loaded from `jobvault.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// Path of the JSON store snapshot.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Deadline applied by `create` when none is given, in hours from now.
    #[serde(default = "default_deadline_hours")]
    pub default_deadline_hours: i64,
}

fn default_store_path() -> String {
    "jobvault.json".to_string()
}

fn default_deadline_hours() -> i64 {
    72
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            default_deadline_hours: default_deadline_hours(),
        }
    }
}

impl VaultConfig {
    /// Load configuration from `jobvault.toml` in the current directory,
    /// falling back to defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Path::new("jobvault.toml");
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<VaultConfig>(&contents)?
        } else {
            Self::default()
        };

        // Environment variable takes precedence over the file.
        if let Ok(store) = std::env::var("JOBVAULT_STORE")
            && !store.is_empty()
        {
            config.store_path = store;
        }

        Ok(config)
    }
}
