//! Where model.json, policy.json and the learning record come from.
//!
//! Config files are looked up in this order, first hit wins:
//! 1. `--model` / `--policy` (must exist)
//! 2. `--config-dir` (the directory must exist, the file need not)
//! 3. `CRISK_MODEL` / `CRISK_POLICY`
//! 4. `CRISK_CONFIG_DIR`
//! 5. `$XDG_CONFIG_HOME/concentration-risk`
//! 6. `/etc/concentration-risk`
//!
//! Nothing found means the built-in defaults. The learning record may not
//! exist yet, so its path is picked without probing the filesystem:
//! `--state`, then `CRISK_STATE`, then the XDG data dir, then the working
//! directory.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const ENV_MODEL_PATH: &str = "CRISK_MODEL";
pub const ENV_POLICY_PATH: &str = "CRISK_POLICY";
pub const ENV_CONFIG_DIR: &str = "CRISK_CONFIG_DIR";
pub const ENV_STATE_PATH: &str = "CRISK_STATE";

pub const STATE_FILENAME: &str = "learning_data.json";

const APP_NAME: &str = "concentration-risk";

/// The two JSON config files crisk reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFile {
    Model,
    Policy,
}

impl ConfigFile {
    pub fn file_name(self) -> &'static str {
        match self {
            ConfigFile::Model => "model.json",
            ConfigFile::Policy => "policy.json",
        }
    }

    fn env_var(self) -> &'static str {
        match self {
            ConfigFile::Model => ENV_MODEL_PATH,
            ConfigFile::Policy => ENV_POLICY_PATH,
        }
    }
}

/// Which layer supplied a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    Environment,
    User,
    System,
    #[default]
    Builtin,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigSource::Cli => "cli",
            ConfigSource::Environment => "env",
            ConfigSource::User => "user",
            ConfigSource::System => "system",
            ConfigSource::Builtin => "builtin",
        })
    }
}

/// A config file location, or `None` when the built-in default applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Located {
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

impl Located {
    pub fn is_default(&self) -> bool {
        self.path.is_none()
    }
}

/// Paths given on the command line.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub config_dir: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub policy: Option<PathBuf>,
    pub state: Option<PathBuf>,
}

/// Every path a crisk run needs, with provenance.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub model: Located,
    pub policy: Located,
    pub state: PathBuf,
    pub state_source: ConfigSource,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("config file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("config directory not found: {}", .0.display())]
    MissingDir(PathBuf),
}

/// Resolve against the process environment.
pub fn resolve_paths(overrides: &PathOverrides) -> Result<ConfigPaths, ResolveError> {
    resolve_paths_with(overrides, |key| std::env::var(key).ok())
}

/// Resolve with an explicit environment lookup. Empty values count as unset.
pub fn resolve_paths_with<F>(overrides: &PathOverrides, env: F) -> Result<ConfigPaths, ResolveError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| env(key).filter(|value| !value.is_empty());

    if let Some(dir) = &overrides.config_dir {
        if !dir.is_dir() {
            return Err(ResolveError::MissingDir(dir.clone()));
        }
    }
    let config_dir = overrides.config_dir.as_deref();

    let model = locate(ConfigFile::Model, overrides.model.as_deref(), config_dir, &lookup)?;
    let policy = locate(ConfigFile::Policy, overrides.policy.as_deref(), config_dir, &lookup)?;

    let (state, state_source) = match (&overrides.state, lookup(ENV_STATE_PATH)) {
        (Some(path), _) => (path.clone(), ConfigSource::Cli),
        (None, Some(path)) => (PathBuf::from(path), ConfigSource::Environment),
        (None, None) => match user_data_dir() {
            Some(dir) => (dir.join(STATE_FILENAME), ConfigSource::User),
            None => (PathBuf::from(STATE_FILENAME), ConfigSource::Builtin),
        },
    };

    Ok(ConfigPaths {
        model,
        policy,
        state,
        state_source,
    })
}

fn locate(
    file: ConfigFile,
    explicit: Option<&Path>,
    config_dir: Option<&Path>,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<Located, ResolveError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ResolveError::MissingFile(path.to_path_buf()));
        }
        return Ok(Located {
            path: Some(path.to_path_buf()),
            source: ConfigSource::Cli,
        });
    }

    let name = file.file_name();
    let candidates = [
        (ConfigSource::Cli, config_dir.map(|dir| dir.join(name))),
        (ConfigSource::Environment, env(file.env_var()).map(PathBuf::from)),
        (
            ConfigSource::Environment,
            env(ENV_CONFIG_DIR).map(|dir| PathBuf::from(dir).join(name)),
        ),
        (ConfigSource::User, user_config_dir().map(|dir| dir.join(name))),
        (ConfigSource::System, Some(system_config_dir().join(name))),
    ];

    Ok(candidates
        .into_iter()
        .find_map(|(source, path)| {
            path.filter(|p| p.is_file()).map(|path| Located {
                path: Some(path),
                source,
            })
        })
        .unwrap_or_default())
}

/// `$XDG_CONFIG_HOME/concentration-risk`.
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// `$XDG_DATA_HOME/concentration-risk`.
pub fn user_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_NAME))
}

pub fn system_config_dir() -> PathBuf {
    Path::new("/etc").join(APP_NAME)
}
