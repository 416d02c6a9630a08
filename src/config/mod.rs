use std::fs::File;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::FormantMode;

/// Engine configuration, optionally read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default, alias = "formantMode")]
    pub formant_mode: FormantMode,
    #[serde(default)]
    pub settings: FeatureSettings,
}

impl EngineConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let reader = File::open(path)
                    .with_context(|| format!("failed to open config file {:?}", path))?;
                serde_json::from_reader(reader)
                    .with_context(|| format!("failed to parse config file {:?}", path))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.settings.validate()
    }
}

/// Algorithm parameters. Every value participates in computed results, so a
/// running engine drops its caches when these change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    #[serde(alias = "rolloffPercent")]
    pub rolloff_percent: f64,
    #[serde(alias = "bandwidthPower")]
    pub bandwidth_power: f64,
    #[serde(alias = "mfccCount")]
    pub mfcc_count: usize,
    #[serde(alias = "melBands")]
    pub mel_bands: usize,
    #[serde(alias = "frameLength")]
    pub frame_length: usize,
    #[serde(alias = "hopLength")]
    pub hop_length: usize,
    #[serde(alias = "contrastBands")]
    pub contrast_bands: usize,
    #[serde(alias = "contrastFloor")]
    pub contrast_floor: f64,
    #[serde(alias = "pitchFloor")]
    pub pitch_floor: f64,
    #[serde(alias = "pitchCeiling")]
    pub pitch_ceiling: f64,
    #[serde(alias = "intensityFloor")]
    pub intensity_floor: f64,
    #[serde(alias = "intensityTimeStep")]
    pub intensity_time_step: f64,
    #[serde(alias = "meanIntensityFloor")]
    pub mean_intensity_floor: f64,
    #[serde(alias = "hnrFloor")]
    pub hnr_floor: f64,
    #[serde(alias = "hnrTimeStep")]
    pub hnr_time_step: f64,
    #[serde(alias = "formantCeiling")]
    pub formant_ceiling: f64,
    #[serde(alias = "maxFormants")]
    pub max_formants: usize,
    #[serde(alias = "formantTimeStep")]
    pub formant_time_step: f64,
    #[serde(alias = "formantWindow")]
    pub formant_window: f64,
    #[serde(alias = "preEmphasisFrom")]
    pub pre_emphasis_from: f64,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            rolloff_percent: 0.85,
            bandwidth_power: 2.0,
            mfcc_count: 13,
            mel_bands: 128,
            frame_length: 2048,
            hop_length: 512,
            contrast_bands: 6,
            contrast_floor: 200.0,
            pitch_floor: 75.0,
            pitch_ceiling: 600.0,
            intensity_floor: 75.0,
            intensity_time_step: 0.01,
            mean_intensity_floor: 100.0,
            hnr_floor: 75.0,
            hnr_time_step: 0.01,
            formant_ceiling: 5500.0,
            max_formants: 5,
            formant_time_step: 0.01,
            formant_window: 0.025,
            pre_emphasis_from: 50.0,
        }
    }
}

impl FeatureSettings {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.rolloff_percent > 0.0 && self.rolloff_percent < 1.0,
            "rolloff_percent must lie in (0, 1), got {}",
            self.rolloff_percent
        );
        ensure!(
            self.bandwidth_power > 0.0,
            "bandwidth_power must be positive"
        );
        ensure!(
            self.mfcc_count > 0 && self.mfcc_count <= self.mel_bands,
            "mfcc_count must be between 1 and mel_bands ({})",
            self.mel_bands
        );
        ensure!(
            self.frame_length >= 16 && self.frame_length.is_power_of_two(),
            "frame_length must be a power of two >= 16, got {}",
            self.frame_length
        );
        ensure!(
            self.hop_length > 0 && self.hop_length <= self.frame_length,
            "hop_length must be in 1..=frame_length"
        );
        ensure!(self.contrast_bands > 0, "contrast_bands must be positive");
        ensure!(self.contrast_floor > 0.0, "contrast_floor must be positive");
        ensure!(
            self.pitch_floor > 0.0 && self.pitch_ceiling > self.pitch_floor,
            "pitch range must satisfy 0 < floor < ceiling"
        );
        for (name, floor) in [
            ("intensity_floor", self.intensity_floor),
            ("mean_intensity_floor", self.mean_intensity_floor),
            ("hnr_floor", self.hnr_floor),
        ] {
            ensure!(floor > 0.0, "{} must be positive", name);
        }
        for (name, step) in [
            ("intensity_time_step", self.intensity_time_step),
            ("hnr_time_step", self.hnr_time_step),
            ("formant_time_step", self.formant_time_step),
        ] {
            ensure!(step > 0.0, "{} must be positive", name);
        }
        ensure!(
            self.formant_ceiling > 100.0,
            "formant_ceiling must exceed 100 Hz"
        );
        ensure!(
            (1..=10).contains(&self.max_formants),
            "max_formants must be between 1 and 10"
        );
        ensure!(self.formant_window > 0.0, "formant_window must be positive");
        ensure!(
            self.pre_emphasis_from >= 0.0,
            "pre_emphasis_from must be non-negative"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config.formant_mode, FormantMode::Midpoint);
        assert_eq!(config.settings.frame_length, 2048);
        assert_eq!(config.settings.mfcc_count, 13);
    }

    #[test]
    fn reads_partial_file_with_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(
            &path,
            r#"{"formantMode": "mean", "settings": {"rolloffPercent": 0.9, "pitch_floor": 60}}"#,
        )
        .unwrap();
        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.formant_mode, FormantMode::Mean);
        assert_eq!(config.settings.rolloff_percent, 0.9);
        assert_eq!(config.settings.pitch_floor, 60.0);
        assert_eq!(config.settings.hop_length, 512);
    }

    #[test]
    fn rejects_invalid_settings() {
        let settings = FeatureSettings {
            frame_length: 1000,
            ..FeatureSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = FeatureSettings {
            pitch_ceiling: 50.0,
            ..FeatureSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = EngineConfig::load(Some(Path::new("no/such/config.json"))).unwrap_err();
        assert!(err.to_string().contains("failed to open config file"));
    }
}
