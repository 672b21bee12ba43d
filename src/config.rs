//! Configuration management for Panelsmith.
//!
//! Handles provider endpoints, file locations, and persistence of user
//! preferences.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Panelsmith configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Port the relay listens on (the `PORT` environment variable and the
    /// `--port` flag override this at startup)
    #[serde(default = "default_port")]
    pub port: u16,
    /// JSON file holding the saved stories
    #[serde(default = "default_stories_path")]
    pub stories_path: PathBuf,
    /// Directory with the built frontend bundle, served as static fallback
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Upstream provider settings
    #[serde(default)]
    pub providers: ProviderSettings,
}

/// Upstream endpoints and model selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_deepseek_base_url")]
    pub deepseek_base_url: String,
    #[serde(default = "default_deepseek_model")]
    pub deepseek_model: String,
    /// Hard bound on each DeepSeek call, in seconds
    #[serde(default = "default_deepseek_timeout_secs")]
    pub deepseek_timeout_secs: u64,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_gemini_text_model")]
    pub gemini_text_model: String,
    #[serde(default = "default_gemini_image_model")]
    pub gemini_image_model: String,
}

fn default_port() -> u16 {
    3002
}

fn default_stories_path() -> PathBuf {
    PathBuf::from("stories.json")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_deepseek_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

fn default_deepseek_timeout_secs() -> u64 {
    120
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_text_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_image_model() -> String {
    "gemini-2.0-flash-exp-image-generation".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            stories_path: default_stories_path(),
            static_dir: default_static_dir(),
            providers: ProviderSettings::default(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            deepseek_base_url: default_deepseek_base_url(),
            deepseek_model: default_deepseek_model(),
            deepseek_timeout_secs: default_deepseek_timeout_secs(),
            gemini_base_url: default_gemini_base_url(),
            gemini_text_model: default_gemini_text_model(),
            gemini_image_model: default_gemini_image_model(),
        }
    }
}

impl Config {
    /// Get the config file path (~/.panelsmith/config.toml)
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".panelsmith").join("config.toml"))
    }

    /// Load config from disk, or return None if it doesn't exist
    pub fn load() -> Result<Option<Self>> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(Some(config))
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, content).context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3002);
        assert_eq!(config.stories_path, PathBuf::from("stories.json"));
        assert_eq!(config.providers.deepseek_timeout_secs, 120);
        assert_eq!(config.providers.deepseek_model, "deepseek-chat");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("port = 4000\n").unwrap();
        assert_eq!(parsed.port, 4000);
        assert_eq!(parsed.static_dir, PathBuf::from("public"));
        assert_eq!(
            parsed.providers.gemini_base_url,
            "https://generativelanguage.googleapis.com"
        );
    }
}
