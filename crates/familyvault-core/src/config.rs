//! Proxy configuration management.
//!
//! The compiled defaults are the FamilyVault deployment: cache version,
//! asset manifest, excluded API domain and scope. Any of them can be
//! overridden by `~/.config/familyvault/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "familyvault";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Current cache version. Bumping it evicts every older namespace on activate.
pub const CACHE_VERSION: &str = "familyvault-v2";

/// Requests whose URL contains this are never intercepted (Apps Script backend)
pub const EXCLUDED_DOMAIN: &str = "script.google.com";

/// Origin the app is served from; relative manifest entries resolve against it
pub const DEFAULT_SCOPE: &str = "http://localhost:8080/";

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Assets pre-cached on install
pub const ASSETS: &[&str] = &[
    "./",
    "./index.html",
    "./manifest.json",
    "https://fonts.googleapis.com/css2?family=Playfair+Display:wght@400;700;900&family=DM+Sans:ital,wght@0,300;0,400;0,500;0,600;1,400&display=swap",
    "https://cdnjs.cloudflare.com/ajax/libs/Chart.js/4.4.1/chart.umd.min.js",
    "https://cdnjs.cloudflare.com/ajax/libs/qrcodejs/1.0.0/qrcode.min.js",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache_version: String,
    pub scope: String,
    pub assets: Vec<String>,
    pub excluded_domain: String,
    pub request_timeout_secs: u64,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_version: CACHE_VERSION.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            assets: ASSETS.iter().map(|a| a.to_string()).collect(),
            excluded_domain: EXCLUDED_DOMAIN.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cache_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Root of the on-disk cache store
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
