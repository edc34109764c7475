use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub media: MediaConfig,

    /// Directory for file-based logging. When unset, the logging setup
    /// picks its platform default.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Primary store, an embedded SQLite file.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,

    /// Fallback store, a single JSON document.
    #[serde(default = "default_document_path")]
    pub document_path: PathBuf,
}

fn default_sqlite_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photolog")
        .join("photolog.db")
}

fn default_document_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photolog")
        .join("photolog.json")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
            document_path: default_document_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Root of the managed media tree; thumbnails live in a
    /// `thumbnails/` subdirectory beneath it.
    #[serde(default = "default_photos_dir")]
    pub photos_dir: PathBuf,

    #[serde(default = "default_thumbnail_max_size")]
    pub thumbnail_max_size: u32,

    #[serde(default = "default_thumbnail_quality")]
    pub thumbnail_quality: u8,
}

fn default_photos_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photolog")
        .join("photos")
}

fn default_thumbnail_max_size() -> u32 {
    200
}

fn default_thumbnail_quality() -> u8 {
    90
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            photos_dir: default_photos_dir(),
            thumbnail_max_size: default_thumbnail_max_size(),
            thumbnail_quality: default_thumbnail_quality(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            media: MediaConfig::default(),
            log_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("photolog")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.database.sqlite_path.ends_with("photolog/photolog.db"));
        assert!(config.media.photos_dir.ends_with("photolog/photos"));
        assert_eq!(config.media.thumbnail_max_size, 200);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [media]
            photos_dir = "/srv/photos"
            "#,
        )
        .unwrap();
        assert_eq!(config.media.photos_dir, PathBuf::from("/srv/photos"));
        assert_eq!(config.media.thumbnail_quality, 90);
        assert!(config.database.document_path.ends_with("photolog.json"));
    }

    #[test]
    fn log_dir_is_optional_and_honored_when_set() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.log_dir.is_none());

        let config: Config = toml::from_str(r#"log_dir = "/var/log/photolog""#).unwrap();
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/photolog")));
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.database.sqlite_path = PathBuf::from("/tmp/x.db");

        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.database.sqlite_path, PathBuf::from("/tmp/x.db"));
    }
}
