use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Name of the active media-server backend ("plex" or "emby").
    #[serde(default)]
    pub mediaserver: String,
    #[serde(default)]
    pub plex: Option<PlexConfig>,
    #[serde(default)]
    pub emby: Option<EmbyConfig>,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlexConfig {
    pub enabled: bool,
    pub host: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbyConfig {
    pub enabled: bool,
    pub host: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cron expression for scheduled catalog syncs.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

fn default_schedule() -> String {
    // Every six hours
    "0 0 */6 * * *".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            run_on_startup: default_true(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    pub fn load_default() -> Result<Self> {
        let path_manager = crate::PathManager::default();
        Self::load(&path_manager.config_file())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {:?}", path))?;
        Ok(())
    }
}

impl PlexConfig {
    pub fn normalized_host(&self) -> String {
        normalize_host(&self.host)
    }
}

impl EmbyConfig {
    pub fn normalized_host(&self) -> String {
        normalize_host(&self.host)
    }
}

/// Ensure a configured host carries a scheme and a trailing slash.
pub fn normalize_host(host: &str) -> String {
    if host.is_empty() {
        return String::new();
    }
    let mut host = host.to_string();
    if !host.ends_with('/') {
        host.push('/');
    }
    if !host.starts_with("http") {
        host = format!("http://{}", host);
    }
    host
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_host_adds_scheme_and_slash() {
        assert_eq!(normalize_host("10.0.0.2:32400"), "http://10.0.0.2:32400/");
        assert_eq!(
            normalize_host("https://plex.local/"),
            "https://plex.local/"
        );
        assert_eq!(normalize_host(""), "");
    }

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            mediaserver: "plex".to_string(),
            plex: Some(PlexConfig {
                enabled: true,
                host: "10.0.0.2:32400".to_string(),
                token: "secret".to_string(),
            }),
            emby: None,
            scheduler: Some(SchedulerConfig::default()),
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.mediaserver, "plex");
        let plex = loaded.plex.unwrap();
        assert!(plex.enabled);
        assert_eq!(plex.normalized_host(), "http://10.0.0.2:32400/");
        assert_eq!(loaded.scheduler.unwrap().schedule, "0 0 */6 * * *");
    }

    #[test]
    fn missing_sections_default_to_none() {
        let config: Config = toml::from_str("mediaserver = \"emby\"").unwrap();
        assert_eq!(config.mediaserver, "emby");
        assert!(config.plex.is_none());
        assert!(config.emby.is_none());
        assert!(config.scheduler.is_none());
    }
}
