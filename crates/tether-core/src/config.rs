use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the project data directory.
pub const DATA_DIR_ENV: &str = "TETHER_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// Where project files live. Defaults to `<platform data dir>/tether`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub cascade: CascadeConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    #[serde(default = "default_true")]
    pub auto_complete: bool,
    #[serde(default)]
    pub require_drop_reason: bool,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            auto_complete: default_true(),
            require_drop_reason: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksConfig {
    #[serde(default = "default_true")]
    pub sweep_on_load: bool,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            sweep_on_load: default_true(),
        }
    }
}

/// Immutable knobs handed to every engine call.
///
/// The engine reads nothing from the process environment; everything it
/// needs beyond the project and the clock arrives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Honor task `auto_complete` flags during propagation.
    pub auto_complete: bool,
    /// Refuse to drop an item without a reason.
    pub require_drop_reason: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            auto_complete: true,
            require_drop_reason: false,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub const fn from_config(config: &UserConfig) -> Self {
        Self {
            auto_complete: config.cascade.auto_complete,
            require_drop_reason: config.cascade.require_drop_reason,
        }
    }
}

/// Config after applying environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub user: UserConfig,
    pub data_dir: PathBuf,
    pub engine: EngineOptions,
}

/// Path of the user config file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tether/config.toml"))
}

pub fn load_user_config() -> Result<UserConfig> {
    match user_config_path() {
        Some(path) => load_config_file(&path),
        None => Ok(UserConfig::default()),
    }
}

/// Load a config file; a missing file yields defaults.
pub fn load_config_file(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the effective configuration.
///
/// Data directory precedence (highest wins): `dir_flag`, `TETHER_DIR`,
/// `data_dir` from config, platform data dir.
pub fn resolve_config(user: UserConfig, dir_flag: Option<&Path>) -> Result<EffectiveConfig> {
    let env_dir = env::var_os(DATA_DIR_ENV).map(PathBuf::from);
    let data_dir = resolve_data_dir(
        dir_flag.map(Path::to_path_buf),
        env_dir,
        user.data_dir.clone(),
        dirs::data_dir(),
    )?;
    let engine = EngineOptions::from_config(&user);

    Ok(EffectiveConfig {
        user,
        data_dir,
        engine,
    })
}

fn resolve_data_dir(
    flag: Option<PathBuf>,
    env_dir: Option<PathBuf>,
    config_dir: Option<PathBuf>,
    platform_dir: Option<PathBuf>,
) -> Result<PathBuf> {
    flag.or(env_dir)
        .or(config_dir)
        .or_else(|| platform_dir.map(|dir| dir.join("tether")))
        .context("No data directory: set TETHER_DIR or data_dir in config.toml")
}

const fn default_true() -> bool {
    true
}
