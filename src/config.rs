use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
pub const DEFAULT_AUTH_URL: &str =
    "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";
pub const DEFAULT_IMAP_HOST: &str = "outlook.office365.com";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub token_url: String,
    pub auth_url: String,
    pub imap_host: String,
    pub imap_port: u16,
    pub mailbox: String,
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            imap_host: DEFAULT_IMAP_HOST.to_string(),
            imap_port: 993,
            mailbox: "INBOX".to_string(),
            http_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("outlook_reader"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load settings from `path`, or from the default location when `path` is
/// `None`. Only an explicit path is required to exist.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = default_config_path()?;
            if !p.exists() {
                return Ok(Settings::default());
            }
            p
        }
    };

    let s = fs::read_to_string(&path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    parse_settings(&s).with_context(|| format!("parsing settings in {}", path.display()))
}

pub fn parse_settings(s: &str) -> Result<Settings> {
    Ok(toml::from_str(s)?)
}
