//! Core types shared by the audio accessor, the feature library and the engine

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};

/// Contiguous mono audio (f32 samples in [-1.0, 1.0])
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 16000)
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.samples.len() as f64 / self.sample_rate as f64
        }
    }

    pub fn samples_f64(&self) -> Vec<f64> {
        self.samples.iter().map(|&s| s as f64).collect()
    }
}

/// A labelled time interval of one recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interval {
    pub file_id: String,
    pub label: String,
    pub start: f64, // seconds
    pub end: f64,   // seconds
}

impl Interval {
    pub fn new(file_id: impl Into<String>, label: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            file_id: file_id.into(),
            label: label.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One audio file together with the intervals annotated on it
#[derive(Debug, Clone)]
pub struct Recording {
    pub file_id: String,
    pub audio_path: PathBuf,
    pub intervals: Vec<Interval>,
}

/// Interval entry as read from a JSON interval list
#[derive(Debug, Clone, Deserialize)]
pub struct IntervalRecord {
    #[serde(default, alias = "text", alias = "mark")]
    pub label: String,
    #[serde(alias = "xmin", alias = "minTime")]
    pub start: f64,
    #[serde(alias = "xmax", alias = "maxTime")]
    pub end: f64,
}

impl IntervalRecord {
    pub fn validate(&self, index: usize) -> Result<()> {
        ensure!(
            self.start.is_finite() && self.end.is_finite(),
            "Interval {} has non-finite bounds",
            index
        );
        ensure!(
            self.start >= 0.0,
            "Interval {} start must be non-negative (got {})",
            index,
            self.start
        );
        ensure!(
            self.end >= self.start,
            "Interval {} end ({}) precedes start ({})",
            index,
            self.end,
            self.start
        );
        Ok(())
    }

    pub fn to_interval(&self, file_id: &str) -> Interval {
        Interval::new(file_id, self.label.clone(), self.start, self.end)
    }
}

/// Where formant values are sampled inside an interval
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormantMode {
    /// Single sample at the interval midpoint
    #[default]
    Midpoint,
    /// Average of five evenly spaced samples across the interval
    Mean,
}

impl FormantMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormantMode::Midpoint => "midpoint",
            FormantMode::Mean => "mean",
        }
    }
}

impl Display for FormantMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormantMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "midpoint" | "mid" => Ok(FormantMode::Midpoint),
            "mean" | "mean-over-interval" => Ok(FormantMode::Mean),
            other => bail!("Unknown formant mode '{}' (expected midpoint or mean)", other),
        }
    }
}
