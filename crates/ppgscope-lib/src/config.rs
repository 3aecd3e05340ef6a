//! Pipeline configuration, one table per stage, loaded from TOML.

use crate::{
    arrhythmia::DetectionConfig,
    features::FeatureConfig,
    plot::{ImageFormat, DEFAULT_SIZE},
    preprocess::PreprocessConfig,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Signal plots are decimated to at most this many points.
    pub max_points: usize,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            max_points: 5000,
            width: DEFAULT_SIZE.0,
            height: DEFAULT_SIZE.1,
            format: ImageFormat::Png,
        }
    }
}

impl PlotConfig {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub features: FeatureConfig,
    pub detection: DetectionConfig,
    pub plot: PlotConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(
            PipelineConfig::from_toml_str("").unwrap(),
            PipelineConfig::default()
        );
    }

    #[test]
    fn partial_tables_override_fields() {
        let cfg = PipelineConfig::from_toml_str(
            r#"
            [preprocess]
            lowpass_hz = 6.0

            [features.beats]
            min_beat_interval_s = 0.3

            [detection]
            deviation_threshold = 0.25

            [plot]
            format = "svg"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.preprocess.lowpass_hz, 6.0);
        assert_eq!(cfg.preprocess.highpass_hz, 0.1);
        assert_eq!(cfg.features.beats.min_beat_interval_s, 0.3);
        assert_eq!(cfg.features.respiration.min_breath_interval_s, 2.0);
        assert_eq!(cfg.detection.deviation_threshold, 0.25);
        assert_eq!(cfg.plot.format, ImageFormat::Svg);
        assert_eq!(cfg.plot.size(), DEFAULT_SIZE);
    }

    #[test]
    fn unreadable_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PipelineConfig::load(&dir.path().join("missing.toml")).is_err());
        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[preprocess]\nlowpass_hz = \"fast\"\n").unwrap();
        assert!(PipelineConfig::load(&bad).is_err());
        assert_eq!(
            PipelineConfig::load_or_default(None).unwrap(),
            PipelineConfig::default()
        );
    }
}
