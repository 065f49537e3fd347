//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Main configuration struct matching the tickerbook.yml schema
///
/// Every section is optional; an empty file yields the layout the knowledge
/// base uses by default (`companies/`, `sectors/`, `russia/macro.md`, `docs/`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub governance: GovernanceConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_title() -> String {
    String::from("Инвестиционный дашборд")
}

fn default_lang() -> String {
    String::from("ru")
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            lang: default_lang(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_companies")]
    pub companies: PathBuf,

    #[serde(default = "default_sectors")]
    pub sectors: PathBuf,

    #[serde(default = "default_macro_file")]
    pub macro_file: PathBuf,

    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_companies() -> PathBuf {
    PathBuf::from("companies")
}

fn default_sectors() -> PathBuf {
    PathBuf::from("sectors")
}

fn default_macro_file() -> PathBuf {
    PathBuf::from("russia/macro.md")
}

fn default_output() -> PathBuf {
    PathBuf::from("docs")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            companies: default_companies(),
            sectors: default_sectors(),
            macro_file: default_macro_file(),
            output: default_output(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// How far back the "recent events" table reaches
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
}

fn default_lookback_days() -> i64 {
    180
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Sanctions matches scoring above this are listed in the screening table
    #[serde(default = "default_score_threshold")]
    pub sanctions_score_threshold: f64,

    /// Number of individual payments in the "recent payments" table
    #[serde(default = "default_recent_payments")]
    pub recent_payments: usize,
}

fn default_score_threshold() -> f64 {
    0.7
}

fn default_recent_payments() -> usize {
    10
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            sanctions_score_threshold: default_score_threshold(),
            recent_payments: default_recent_payments(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&contents)?
        };

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Load the config file if it exists, otherwise use defaults relative to
    /// the working directory
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!("No config at {:?}; using defaults", path);
            Ok(Self::default())
        }
    }

    /// Directory holding one folder per ticker
    pub fn companies_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.companies)
    }

    pub fn sectors_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.sectors)
    }

    /// Markdown file with the central bank meeting schedule
    pub fn macro_file(&self) -> PathBuf {
        self.resolve_path(&self.paths.macro_file)
    }

    /// Where the static dashboard is written
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(parent) = self.config_path.as_deref().and_then(Path::parent) {
            parent.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.companies_dir(), PathBuf::from("companies"));
        assert_eq!(config.output_dir(), PathBuf::from("docs"));
        assert_eq!(config.events.lookback_days, 180);
        assert_eq!(config.governance.recent_payments, 10);
        assert_eq!(config.site.lang, "ru");
    }

    #[test]
    fn test_paths_resolve_relative_to_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tickerbook.yml");
        fs::write(
            &path,
            "site:\n  title: Портфель\npaths:\n  output: public\nevents:\n  lookback_days: 90\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.site.title, "Портфель");
        assert_eq!(config.output_dir(), dir.path().join("public"));
        assert_eq!(config.companies_dir(), dir.path().join("companies"));
        assert_eq!(config.events.lookback_days, 90);
        assert_eq!(config.governance.sanctions_score_threshold, 0.7);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tickerbook.yml");
        fs::write(&path, "").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.macro_file(), dir.path().join("russia/macro.md"));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.yml")).unwrap();
        assert_eq!(config.sectors_dir(), PathBuf::from("sectors"));
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tickerbook.yml");
        fs::write(&path, "paths: [").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
