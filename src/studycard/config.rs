use crate::error::{CardError, Result};
use crate::model::ExportFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";

pub const KEYS: [&str; 5] = [
    "default_format",
    "output_dir",
    "scale",
    "transparent_background",
    "rasterize_timeout_secs",
];

/// Configuration for studycard, stored in `<data dir>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StudyCardConfig {
    /// Format for a brand new draft
    pub default_format: ExportFormat,

    /// Where exported files go; the working directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Pixel density multiplier (1-4)
    pub scale: u32,

    /// Keep the area outside the rounded card transparent in PNG output
    pub transparent_background: bool,

    /// Give up on rendering after this many seconds; 0 waits forever
    pub rasterize_timeout_secs: u64,
}

impl Default for StudyCardConfig {
    fn default() -> Self {
        Self {
            default_format: ExportFormat::Png,
            output_dir: None,
            scale: 2,
            transparent_background: true,
            rasterize_timeout_secs: 30,
        }
    }
}

impl StudyCardConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: StudyCardConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "default_format" => Some(self.default_format.to_string()),
            "output_dir" => Some(
                self.output_dir
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
            "scale" => Some(self.scale.to_string()),
            "transparent_background" => Some(self.transparent_background.to_string()),
            "rasterize_timeout_secs" => Some(self.rasterize_timeout_secs.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = |expected: &str| {
            CardError::Validation(format!(
                "invalid value `{}` for {} (expected {})",
                value, key, expected
            ))
        };
        match key {
            "default_format" => self.default_format = value.parse()?,
            "output_dir" => {
                let value = value.trim();
                self.output_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "scale" => {
                let scale: u32 = value.trim().parse().map_err(|_| invalid("1-4"))?;
                if !(1..=4).contains(&scale) {
                    return Err(invalid("1-4"));
                }
                self.scale = scale;
            }
            "transparent_background" => {
                self.transparent_background =
                    value.trim().parse().map_err(|_| invalid("true or false"))?;
            }
            "rasterize_timeout_secs" => {
                self.rasterize_timeout_secs =
                    value.trim().parse().map_err(|_| invalid("a whole number of seconds"))?;
            }
            _ => {
                return Err(CardError::Validation(format!(
                    "unknown config key `{}` (known keys: {})",
                    key,
                    KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn rasterize_timeout(&self) -> Option<Duration> {
        (self.rasterize_timeout_secs > 0).then(|| Duration::from_secs(self.rasterize_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = StudyCardConfig::default();
        assert_eq!(config.default_format, ExportFormat::Png);
        assert_eq!(config.scale, 2);
        assert!(config.transparent_background);
        assert_eq!(config.rasterize_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempdir().unwrap();
        let config = StudyCardConfig::load(dir.path()).unwrap();
        assert_eq!(config, StudyCardConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("data");

        let mut config = StudyCardConfig::default();
        config.set("default_format", "jpeg").unwrap();
        config.set("output_dir", "/tmp/cards").unwrap();
        config.save(&nested).unwrap();

        let loaded = StudyCardConfig::load(&nested).unwrap();
        assert_eq!(loaded.default_format, ExportFormat::Jpg);
        assert_eq!(loaded.output_dir, Some(PathBuf::from("/tmp/cards")));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), r#"{"scale": 3}"#).unwrap();

        let config = StudyCardConfig::load(dir.path()).unwrap();
        assert_eq!(config.scale, 3);
        assert_eq!(config.rasterize_timeout_secs, 30);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = StudyCardConfig::default();
        assert!(config.set("scale", "9").is_err());
        assert!(config.set("scale", "two").is_err());
        assert!(config.set("transparent_background", "maybe").is_err());
        assert!(config.set("default_format", "gif").is_err());
        assert!(config.set("colour", "blue").is_err());
        assert_eq!(config, StudyCardConfig::default());
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let mut config = StudyCardConfig::default();
        config.set("rasterize_timeout_secs", "0").unwrap();
        assert_eq!(config.rasterize_timeout(), None);
        assert_eq!(config.get("rasterize_timeout_secs").as_deref(), Some("0"));
    }

    #[test]
    fn test_get_every_key() {
        let config = StudyCardConfig::default();
        for key in KEYS {
            assert!(config.get(key).is_some(), "{}", key);
        }
        assert_eq!(config.get("nope"), None);
    }
}
