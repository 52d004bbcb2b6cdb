//! Configuration loaded from `config.toml`.
//!
//! ```toml
//! store = "file"            # or "memory"
//! data_dir = "/var/lib/gridcalc"
//! log_level = "info"
//! cycle_policy = "propagate" # or "flag"
//! ```

use directories::ProjectDirs;
use gridcalc_engine::engine::{CyclePolicy, RecalcOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GridcalcError, Result};

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

/// Which [`crate::storage::GridStore`] backs the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    Memory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Directory for `.grd` grid files; defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    pub store: StoreKind,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub log_level: String,
    pub cycle_policy: CyclePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: None,
            store: StoreKind::default(),
            log_level: "info".to_string(),
            cycle_policy: CyclePolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the user config file when no
    /// path is given. A missing user config file yields defaults; a missing
    /// explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config_path = path.map(Path::to_path_buf).or_else(default_config_path);
        let Some(config_path) = config_path else {
            return Ok(Config::default());
        };

        if !config_path.exists() {
            if path.is_some() {
                return Err(GridcalcError::Config(format!(
                    "Config file not found: {}",
                    config_path.display()
                )));
            }
            return Ok(Config::default());
        }

        let meta = std::fs::metadata(&config_path)?;
        if meta.len() > MAX_CONFIG_FILE_BYTES {
            return Err(GridcalcError::Config(format!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                config_path.display(),
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            )));
        }

        let content = std::fs::read_to_string(&config_path)?;
        Config::from_toml_str(&content).map_err(|e| match e {
            GridcalcError::Config(msg) => {
                GridcalcError::Config(format!("Failed to parse {}: {}", config_path.display(), msg))
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Config> {
        toml::from_str::<Config>(content).map_err(|e| GridcalcError::Config(e.to_string()))
    }

    /// Directory the file store writes to.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("", "", "gridcalc")
            .map(|proj| proj.data_dir().to_path_buf())
            .ok_or_else(|| {
                GridcalcError::Config("Could not determine a data directory; set data_dir".to_string())
            })
    }

    pub fn recalc_options(&self) -> RecalcOptions {
        RecalcOptions {
            cycle_policy: self.cycle_policy,
        }
    }
}

/// `<config_dir>/config.toml` for the current user, if a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "gridcalc")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}
