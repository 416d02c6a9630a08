//! Acoustic feature extraction for labelled speech recordings.
//!
//! A [`FeatureEngine`] computes measurements such as mean F0, jitter, HNR,
//! spectral shape and formants for time intervals of audio files, caching
//! every result per file, interval and formant mode.

pub mod audio;
pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod kind;
pub mod stats;
pub mod table;
pub mod types;

pub use engine::FeatureEngine;
pub use error::{FeatureError, Result};
pub use kind::{FeatureKind, Partition};
pub use types::FormantMode;
