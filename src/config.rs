//! Account configuration management.
//!
//! Holds the per-account settings the host platform supplies: upstream base
//! URL, stored tokens, and the poll interval. Configuration is stored at
//! `~/.config/carwings-bridge/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_BASE;

/// Application name used for the config directory path
const APP_NAME: &str = "carwings-bridge";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default poll interval in minutes.
pub const DEFAULT_SCAN_INTERVAL_MIN: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub username: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_minutes: u64,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_MIN
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: None,
            access_token: None,
            refresh_token: None,
            scan_interval_minutes: default_scan_interval(),
        }
    }
}

impl AccountConfig {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Poll interval for the host's scheduler.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_minutes * 60)
    }
}
