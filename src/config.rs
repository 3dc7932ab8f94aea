//! Configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Built-in user agents offered in the settings
pub const USER_AGENTS: &[(&str, &str)] = &[
    ("Chrome (Windows)", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36"),
    ("Firefox (Windows)", "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:140.0) Gecko/20100101 Firefox/140.0"),
    ("Safari (macOS)", "Mozilla/5.0 (Macintosh; Intel Mac OS X 15_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.4 Safari/605.1.15"),
    ("Edge (Windows)", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36 Edg/138.0.3351.83"),
    ("Chrome (Android)", "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Mobile Safari/537.36"),
    ("VLC", "VLC/3.0.20 LibVLC/3.0.20"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// URL or path of the events/channels document
    #[serde(default = "default_data_source")]
    pub data_source: String,
    /// Empty means ffplay
    #[serde(default)]
    pub external_player: String,
    #[serde(default = "default_true")]
    pub start_muted: bool,
    #[serde(default = "default_true")]
    pub hw_accel: bool,
    #[serde(default = "default_true")]
    pub dark_mode: bool,
    #[serde(default)]
    pub selected_user_agent: usize,
    #[serde(default)]
    pub custom_user_agent: String,
    #[serde(default)]
    pub use_custom_user_agent: bool,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_data_source() -> String { "data.json".to_string() }
fn default_true() -> bool { true }
fn default_timeout() -> u64 { 30 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_source: default_data_source(),
            external_player: String::new(),
            start_muted: true,
            hw_accel: true,
            dark_mode: true,
            selected_user_agent: 0,
            custom_user_agent: String::new(),
            use_custom_user_agent: false,
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("fstv");
        fs::create_dir_all(&path).ok();
        path.push("config.json");
        path
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Missing or unreadable files fall back to defaults
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => log::warn!("Ignoring corrupt config {}: {}", path.display(), e),
                },
                Err(e) => log::warn!("Failed to read config {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        log::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn user_agent(&self) -> String {
        if self.use_custom_user_agent && !self.custom_user_agent.trim().is_empty() {
            self.custom_user_agent.trim().to_string()
        } else {
            USER_AGENTS
                .get(self.selected_user_agent)
                .unwrap_or(&USER_AGENTS[0])
                .1
                .to_string()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig {
            data_source: "https://example.com/data.json".to_string(),
            external_player: "mpv".to_string(),
            start_muted: false,
            request_timeout_secs: 10,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path), config);
    }

    #[test]
    fn test_missing_and_corrupt_files_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"external_player":"vlc"}"#).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.external_player, "vlc");
        assert_eq!(config.data_source, "data.json");
        assert!(config.start_muted);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_user_agent_selection() {
        let mut config = AppConfig::default();
        assert_eq!(config.user_agent(), USER_AGENTS[0].1);

        config.selected_user_agent = 99;
        assert_eq!(config.user_agent(), USER_AGENTS[0].1);

        config.use_custom_user_agent = true;
        config.custom_user_agent = "  FSTV/1.0 ".to_string();
        assert_eq!(config.user_agent(), "FSTV/1.0");

        config.custom_user_agent = String::new();
        config.selected_user_agent = 5;
        assert_eq!(config.user_agent(), USER_AGENTS[5].1);
    }
}
