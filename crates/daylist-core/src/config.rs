use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tracing::{debug, info};

const CONFIG_FILE: &str = "daylist.toml";
const CONFIG_ENV_VAR: &str = "DAYLIST_CONFIG";
const DATA_DIR_ENV_VAR: &str = "DAYLIST_DATA_DIR";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Loads `daylist.toml` from the override path, `DAYLIST_CONFIG`, or the
    /// platform config directory. A missing file yields the defaults; a
    /// malformed one is an error.
    #[tracing::instrument(skip(override_path))]
    pub fn load(override_path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = resolve_config_path(override_path) else {
            debug!("no config location available; using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            debug!(file = %path.display(), "config file not found; using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        info!(file = %path.display(), "loaded config");
        Ok(cfg)
    }
}

fn resolve_config_path(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path.to_path_buf());
    }

    if let Ok(raw) = std::env::var(CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    dirs::config_dir().map(|dir| dir.join("daylist").join(CONFIG_FILE))
}

/// Where the task table lives: a direct override wins, then
/// `DAYLIST_DATA_DIR`, then the config file, then the platform data
/// directory. The directory is created on first use.
#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(env_dir) = data_dir_from_env() {
        env_dir
    } else if let Some(cfg_dir) = &cfg.data_dir {
        expand_tilde(cfg_dir)
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

fn data_dir_from_env() -> Option<PathBuf> {
    let raw = std::env::var(DATA_DIR_ENV_VAR).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| anyhow!("cannot determine platform data directory"))?;
    Ok(base.join("daylist"))
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
