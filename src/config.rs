use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;
use url::Url;

use crate::error::{HelpdeskError, Result};

#[derive(Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub page_size: Option<usize>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).map_err(|e| HelpdeskError::ConfigRead {
                path: config_path.clone(),
                source: e,
            })?;

        toml::from_str(&contents).map_err(|e| HelpdeskError::ConfigParse {
            path: config_path,
            source: e,
        })
    }

    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "helpdesk")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(HelpdeskError::NoConfigDir)
    }

    /// Path of the persisted session snapshot, next to the config file.
    pub fn session_path() -> Result<PathBuf> {
        Config::config_path().map(|p| p.with_file_name("session.json"))
    }

    /// Get API base URL with env var taking precedence over config file.
    pub fn api_url(&self) -> Result<Url> {
        let raw = match std::env::var("HELPDESK_API_URL") {
            Ok(value) => value,
            Err(_) => self.api_url.clone().ok_or(HelpdeskError::MissingApiUrl)?,
        };

        // A trailing slash matters to Url::join; normalize it away here.
        let trimmed = raw.trim_end_matches('/');
        Url::parse(trimmed).map_err(|_| HelpdeskError::InvalidApiUrl(raw))
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(6)
    }
}
