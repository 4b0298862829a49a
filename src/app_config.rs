//! Module for application configuration settings.
//!
//! User configurations may be specified in a configuration file.

use secrecy::SecretString;
use thiserror::Error;
use tracing::debug;

use std::path::{Path, PathBuf};

use serde::Deserialize;

fn current_uid() -> u32 {
    nix::unistd::Uid::current().as_raw()
}

fn current_gid() -> u32 {
    nix::unistd::Gid::current().as_raw()
}

/// Application configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Base URL of the wiki, e.g. `https://wiki.example.org`.
    pub url: Option<String>,

    /// Username for basic authentication.
    pub user: Option<String>,

    /// Password for basic authentication.
    pub password: Option<SecretString>,

    /// Bearer token, used instead of user and password when present.
    pub token: Option<SecretString>,

    /// Where to mount the wiki tree.
    pub mount_point: Option<PathBuf>,

    /// Namespace prefix the mount is confined to, e.g. `team:docs`.
    #[serde(default)]
    pub chroot: String,

    /// The owner the mounted entries report. Defaults to the current user.
    #[serde(default = "current_uid")]
    pub uid: u32,

    /// The group the mounted entries report. Defaults to the current group.
    #[serde(default = "current_gid")]
    pub gid: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            password: None,
            token: None,
            mount_point: None,
            chroot: String::new(),
            uid: current_uid(),
            gid: current_gid(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Config {
    /// Validate the correctness of the configuration.
    ///
    /// Returns:
    /// - `Ok(())` if the configuration is valid.
    /// - `Err(Vec<String>)` containing a list of validation error messages.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match &self.url {
            None => errors.push("No wiki URL configured; set `url` or pass --url.".to_owned()),
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                errors.push(format!("Wiki URL '{url}' must start with http:// or https://."));
            }
            Some(_) => {}
        }

        if self.mount_point.is_none() {
            errors.push(
                "No mount point configured; set `mount-point` or pass --mount-point.".to_owned(),
            );
        }

        if self.password.is_some() && self.user.is_none() {
            errors.push("A password is configured without a user.".to_owned());
        }

        if self.user.is_some() && self.password.is_none() {
            errors.push("A user is configured without a password.".to_owned());
        }

        if self.token.is_some() && (self.user.is_some() || self.password.is_some()) {
            errors.push(
                "Both a token and user credentials are configured; use one or the other."
                    .to_owned(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Chroot reduced to bare colon-joined segments. Stray separators
    /// and whitespace in the configured value are dropped.
    pub fn normalized_chroot(&self) -> String {
        self.chroot
            .split(':')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Returns config file paths in descending priority order.
    /// On macOS, skips `dirs::config_dir()` (resolves to ~/Library/Application Support/).
    fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(not(target_os = "macos"))]
        if let Some(xdg) = dirs::config_dir() {
            paths.push(xdg.join("dokufs").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("dokufs").join("config.toml"));
        }

        paths.push(PathBuf::from("/etc/dokufs/config.toml"));

        paths
    }

    /// Finds the first existing config file from search paths.
    fn find_config_file() -> Option<PathBuf> {
        Self::config_search_paths().into_iter().find(|p| p.exists())
    }

    /// Loads config from a single TOML file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = ?path, "Loading configuration file.");
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads configuration from the first found config file, or the external path if given.
    pub fn load(external_config_path: Option<&Path>) -> Option<Result<Self, ConfigError>> {
        if let Some(path) = external_config_path {
            return Some(Self::load_from_file(path));
        }

        Self::find_config_file().map(|path| Self::load_from_file(&path))
    }

    /// Loads config, falling back to defaults when no file exists.
    /// Errors if a config file exists but is malformed.
    pub fn load_or_default(external_config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match Self::load(external_config_path) {
            Some(result) => result,
            None => {
                debug!("No configuration file found, starting from defaults.");
                Ok(Self::default())
            }
        }
    }
}
