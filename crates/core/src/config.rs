//! Application configuration layered from defaults, a TOML file and
//! `CIVCALC_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::SituationStore;

/// Directory under the user's config directory holding `config.toml`.
pub const CONFIG_DIR: &str = "civcalc";

const CONFIG_FILE: &str = "config.toml";

/// Settings shared by every frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory scanned for rule data files.
    pub rules_dir: PathBuf,
    /// Directory holding persisted situations.
    pub saves_dir: PathBuf,
    /// Language for card names and explanations.
    pub language: String,
    /// Rules used when a new situation is created.
    pub default_rules: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules_dir: config_root().join("rules"),
            saves_dir: SituationStore::default_root(),
            language: "en".to_string(),
            default_rules: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from `path`, which may be missing.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("rules_dir", defaults.rules_dir.to_string_lossy().to_string())?
            .set_default("saves_dir", defaults.saves_dir.to_string_lossy().to_string())?
            .set_default("language", defaults.language)?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("CIVCALC"))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }
}

/// Root directory for configuration and data.
pub fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}

/// Location of the configuration file.
pub fn config_path() -> PathBuf {
    config_root().join(CONFIG_FILE)
}

/// Write a starter configuration file unless one already exists.
pub fn ensure_default_config() -> Result<()> {
    ensure_config_at(config_path())
}

/// Write a starter configuration file at `path` unless one already exists.
pub fn ensure_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }

    let defaults = AppConfig::default();
    let contents = format!(
        "# civcalc configuration\n\
         rules_dir = {:?}\n\
         saves_dir = {:?}\n\
         language = {:?}\n\
         # default_rules = \"mega\"\n",
        defaults.rules_dir.to_string_lossy(),
        defaults.saves_dir.to_string_lossy(),
        defaults.language,
    );
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}
