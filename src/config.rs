// src/config.rs

//! arkctl configuration
//!
//! Settings come from three layers, later ones winning:
//! 1. `~/.arkctl.toml` (or the file given with `--config`)
//! 2. `ARKCTL_INSTALL_DIR` / `ARKCTL_STEAMCMD` environment variables
//! 3. command-line flags
//!
//! ```toml
//! install_dir = "~/ARK"
//! steamcmd = "~/steamcmd/steamcmd.sh"
//! app_id = 376030
//! mod_app_id = 346110
//! mods = [731604991, 895711211]
//! output = "stdout"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name inside the home directory
pub const DEFAULT_CONFIG_FILE: &str = ".arkctl.toml";

/// ARK: Survival Evolved dedicated server
pub const DEFAULT_APP_ID: u32 = 376030;

/// ARK: Survival Evolved (workshop items live under the game's app id)
pub const DEFAULT_MOD_APP_ID: u32 = 346110;

pub const ENV_INSTALL_DIR: &str = "ARKCTL_INSTALL_DIR";
pub const ENV_STEAMCMD: &str = "ARKCTL_STEAMCMD";

/// `output` value selecting standard output
pub const STDOUT_OUTPUT: &str = "stdout";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot determine home directory to expand {0}")]
    NoHome(String),
}

/// Where user-facing status lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Server install root (`force_install_dir`)
    pub install_dir: PathBuf,
    /// SteamCMD launcher script
    pub steamcmd: PathBuf,
    pub app_id: u32,
    pub mod_app_id: u32,
    /// Workshop items to keep installed
    pub mods: Vec<u64>,
    pub output: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from("~/ARK"),
            steamcmd: PathBuf::from("~/steamcmd/steamcmd.sh"),
            app_id: DEFAULT_APP_ID,
            mod_app_id: DEFAULT_MOD_APP_ID,
            mods: Vec::new(),
            output: STDOUT_OUTPUT.to_string(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub install_dir: Option<PathBuf>,
    pub steamcmd: Option<PathBuf>,
    pub output: Option<String>,
}

/// Replace a leading `~` with the home directory
fn expand_home(path: &Path, home: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = home.ok_or_else(|| ConfigError::NoHome(path.display().to_string()))?;
    Ok(home.join(rest))
}

impl Config {
    /// Parse TOML text; `origin` names the source in errors
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read a config file, or the defaults when an implicit file is absent
    pub fn read(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text, path),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Apply environment and command-line layers, then expand `~`
    pub fn resolve<E>(
        mut self,
        overrides: &Overrides,
        env: E,
        home: Option<&Path>,
    ) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = env(ENV_INSTALL_DIR).filter(|v| !v.is_empty()) {
            self.install_dir = PathBuf::from(dir);
        }
        if let Some(steamcmd) = env(ENV_STEAMCMD).filter(|v| !v.is_empty()) {
            self.steamcmd = PathBuf::from(steamcmd);
        }

        if let Some(dir) = &overrides.install_dir {
            self.install_dir = dir.clone();
        }
        if let Some(steamcmd) = &overrides.steamcmd {
            self.steamcmd = steamcmd.clone();
        }
        if let Some(output) = &overrides.output {
            self.output = output.clone();
        }

        self.install_dir = expand_home(&self.install_dir, home)?;
        self.steamcmd = expand_home(&self.steamcmd, home)?;
        if self.output != STDOUT_OUTPUT {
            self.output = expand_home(Path::new(&self.output), home)?
                .display()
                .to_string();
        }
        Ok(self)
    }

    pub fn output_target(&self) -> OutputTarget {
        if self.output.is_empty() || self.output == STDOUT_OUTPUT {
            OutputTarget::Stdout
        } else {
            OutputTarget::File(PathBuf::from(&self.output))
        }
    }
}

/// Load the effective configuration for this process
pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> Result<Config, ConfigError> {
    let home = dirs::home_dir();
    let config = match explicit {
        Some(path) => Config::read(path, true)?,
        None => match &home {
            Some(home) => Config::read(&home.join(DEFAULT_CONFIG_FILE), false)?,
            None => Config::default(),
        },
    };
    config.resolve(overrides, |key| std::env::var(key).ok(), home.as_deref())
}
