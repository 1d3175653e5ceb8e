use anyhow::{Context, Result};
use directories::ProjectDirs;
use rnstream_core::{DenoiseConfig, PipelineConfig, ResamplerQuality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persisted defaults for `rnstream denoise`. Command-line flags override them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_input_rate")]
    pub input_rate: u32,
    /// None keeps the input rate
    #[serde(default)]
    pub output_rate: Option<u32>,
    #[serde(default)]
    pub quality: ResamplerQuality,
    #[serde(default = "default_suppression_strength")]
    pub suppression_strength: f32,
}

fn default_input_rate() -> u32 {
    48000
}

fn default_suppression_strength() -> f32 {
    1.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_rate: default_input_rate(),
            output_rate: None,
            quality: ResamplerQuality::default(),
            suppression_strength: default_suppression_strength(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from disk, or returns default if not found.
    pub fn load() -> Self {
        if let Some(path) = config_path() {
            if let Ok(content) = fs::read_to_string(&path) {
                match serde_json::from_str(&content) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring malformed {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Saves configuration to disk in JSON format.
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path().context("Could not determine config directory")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            input_rate: self.input_rate,
            output_rate: self.output_rate.unwrap_or(self.input_rate),
            quality: self.quality,
            denoise: DenoiseConfig {
                strength: self.suppression_strength,
            },
        }
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "rnstream", "rnstream").map(|dirs| dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.input_rate, 48000);
        assert_eq!(config.output_rate, None);
        assert_eq!(config.quality, ResamplerQuality::Balanced);
        assert_eq!(config.suppression_strength, 1.0);
    }

    #[test]
    fn test_config_deserialization_with_defaults() {
        // Minimal JSON - should fill in defaults
        let json = r#"{"input_rate":16000}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.input_rate, 16000);
        assert_eq!(config.output_rate, None);
        assert_eq!(config.suppression_strength, 1.0);
    }

    #[test]
    fn test_quality_serialized_lowercase() {
        let config = AppConfig {
            quality: ResamplerQuality::High,
            output_rate: Some(44100),
            ..AppConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"quality\":\"high\""));
        assert!(json.contains("\"output_rate\":44100"));

        let restored: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_output_rate_falls_back_to_input() {
        let config = AppConfig {
            input_rate: 22050,
            ..AppConfig::default()
        };
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.input_rate, 22050);
        assert_eq!(pipeline.output_rate, 22050);

        let config = AppConfig {
            output_rate: Some(8000),
            ..config
        };
        assert_eq!(config.pipeline_config().output_rate, 8000);
    }
}
