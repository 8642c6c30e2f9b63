use crate::storage::project_dirs;
use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Leftmost column of the month grid.
    pub first_weekday: Weekday,
    /// Show the tutorial on startup until it has been finished once.
    pub show_tutorial: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            first_weekday: Weekday::Sun,
            show_tutorial: true,
        }
    }
}

impl Config {
    /// Loads `config.yml` from the user config directory, falling back to
    /// defaults when it is missing or broken.
    pub fn load() -> Self {
        match default_config_path().and_then(|path| Config::load_from(&path)) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("using default config: {:#}", err);
                Config::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        let config = serde_yaml::from_str(&data).with_context(|| format!("parsing {:?}", path))?;
        Ok(config)
    }

    pub fn with_first_weekday(mut self, weekday: Option<Weekday>) -> Self {
        if let Some(day) = weekday {
            self.first_weekday = day;
        }
        self
    }
}

pub fn parse_weekday(input: &str) -> Result<Weekday> {
    input
        .trim()
        .parse::<Weekday>()
        .map_err(|_| anyhow::anyhow!("unknown weekday: {} (use e.g. sun, mon)", input))
}

fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.yml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "first_weekday: Mon\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.first_weekday, Weekday::Mon);
        assert!(config.show_tutorial);
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "first_weekday: [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn weekday_names_parse_loosely() {
        assert_eq!(parse_weekday("monday").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday(" Sun ").unwrap(), Weekday::Sun);
        assert!(parse_weekday("someday").is_err());
    }

    #[test]
    fn override_replaces_configured_weekday() {
        let config = Config::default().with_first_weekday(Some(Weekday::Sat));
        assert_eq!(config.first_weekday, Weekday::Sat);
        let config = config.with_first_weekday(None);
        assert_eq!(config.first_weekday, Weekday::Sat);
    }
}
