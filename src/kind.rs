//! The feature catalogue and its dispatch table.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::features::{self, ScalarFn};

/// Every measurement the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureKind {
    Duration,
    MidIntensity,
    MeanIntensity,
    MeanF0,
    Jitter,
    Shimmer,
    Hnr,
    Rms,
    SpectralCentroid,
    Rolloff,
    Bandwidth,
    Flatness,
    Contrast,
    Mfcc1,
    Zcr,
    F1,
    F2,
    F3,
    Cpp,
}

/// Cache partition a feature's values live in. F1, F2 and F3 share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    MidIntensity,
    MeanIntensity,
    MeanF0,
    Jitter,
    Shimmer,
    Hnr,
    Rms,
    SpectralCentroid,
    Rolloff,
    Bandwidth,
    Flatness,
    Contrast,
    Mfcc1,
    Zcr,
    Formants,
    Cpp,
}

/// How a feature is obtained.
#[derive(Clone, Copy)]
pub enum Computation {
    /// Interval duration supplied by the caller.
    Passthrough,
    Scalar(ScalarFn),
    /// One slot of the shared formant triple.
    Formant(usize),
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 19] = [
        FeatureKind::Duration,
        FeatureKind::MidIntensity,
        FeatureKind::MeanIntensity,
        FeatureKind::MeanF0,
        FeatureKind::Jitter,
        FeatureKind::Shimmer,
        FeatureKind::Hnr,
        FeatureKind::Rms,
        FeatureKind::SpectralCentroid,
        FeatureKind::Rolloff,
        FeatureKind::Bandwidth,
        FeatureKind::Flatness,
        FeatureKind::Contrast,
        FeatureKind::Mfcc1,
        FeatureKind::Zcr,
        FeatureKind::F1,
        FeatureKind::F2,
        FeatureKind::F3,
        FeatureKind::Cpp,
    ];

    /// Display name used in tables and by [`FeatureKind::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            FeatureKind::Duration => "Duration",
            FeatureKind::MidIntensity => "Mid Intensity",
            FeatureKind::MeanIntensity => "Mean Intensity",
            FeatureKind::MeanF0 => "Mean F0",
            FeatureKind::Jitter => "Jitter",
            FeatureKind::Shimmer => "Shimmer",
            FeatureKind::Hnr => "HNR",
            FeatureKind::Rms => "RMS",
            FeatureKind::SpectralCentroid => "Spectral Centroid",
            FeatureKind::Rolloff => "Rolloff",
            FeatureKind::Bandwidth => "Bandwidth",
            FeatureKind::Flatness => "Flatness",
            FeatureKind::Contrast => "Contrast",
            FeatureKind::Mfcc1 => "MFCC1",
            FeatureKind::Zcr => "ZCR",
            FeatureKind::F1 => "F1",
            FeatureKind::F2 => "F2",
            FeatureKind::F3 => "F3",
            FeatureKind::Cpp => "CPP",
        }
    }

    /// Exact display-name lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Decimal places results are rounded to.
    pub fn decimals(self) -> i32 {
        match self {
            FeatureKind::Jitter
            | FeatureKind::Shimmer
            | FeatureKind::Rms
            | FeatureKind::Flatness => 4,
            _ => 2,
        }
    }

    /// `None` for Duration, which is never cached.
    pub fn partition(self) -> Option<Partition> {
        let partition = match self {
            FeatureKind::Duration => return None,
            FeatureKind::MidIntensity => Partition::MidIntensity,
            FeatureKind::MeanIntensity => Partition::MeanIntensity,
            FeatureKind::MeanF0 => Partition::MeanF0,
            FeatureKind::Jitter => Partition::Jitter,
            FeatureKind::Shimmer => Partition::Shimmer,
            FeatureKind::Hnr => Partition::Hnr,
            FeatureKind::Rms => Partition::Rms,
            FeatureKind::SpectralCentroid => Partition::SpectralCentroid,
            FeatureKind::Rolloff => Partition::Rolloff,
            FeatureKind::Bandwidth => Partition::Bandwidth,
            FeatureKind::Flatness => Partition::Flatness,
            FeatureKind::Contrast => Partition::Contrast,
            FeatureKind::Mfcc1 => Partition::Mfcc1,
            FeatureKind::Zcr => Partition::Zcr,
            FeatureKind::F1 | FeatureKind::F2 | FeatureKind::F3 => Partition::Formants,
            FeatureKind::Cpp => Partition::Cpp,
        };
        Some(partition)
    }

    pub fn computation(self) -> Computation {
        match self {
            FeatureKind::Duration => Computation::Passthrough,
            FeatureKind::MidIntensity => Computation::Scalar(features::mid_intensity),
            FeatureKind::MeanIntensity => Computation::Scalar(features::mean_intensity),
            FeatureKind::MeanF0 => Computation::Scalar(features::mean_pitch),
            FeatureKind::Jitter => Computation::Scalar(features::jitter_local),
            FeatureKind::Shimmer => Computation::Scalar(features::shimmer_local),
            FeatureKind::Hnr => Computation::Scalar(features::harmonics_to_noise),
            FeatureKind::Rms => Computation::Scalar(features::rms_energy),
            FeatureKind::SpectralCentroid => Computation::Scalar(features::spectral_centroid),
            FeatureKind::Rolloff => Computation::Scalar(features::spectral_rolloff),
            FeatureKind::Bandwidth => Computation::Scalar(features::spectral_bandwidth),
            FeatureKind::Flatness => Computation::Scalar(features::spectral_flatness),
            FeatureKind::Contrast => Computation::Scalar(features::spectral_contrast),
            FeatureKind::Mfcc1 => Computation::Scalar(features::mfcc1),
            FeatureKind::Zcr => Computation::Scalar(features::zero_crossing_rate),
            FeatureKind::F1 => Computation::Formant(0),
            FeatureKind::F2 => Computation::Formant(1),
            FeatureKind::F3 => Computation::Formant(2),
            FeatureKind::Cpp => Computation::Scalar(features::cepstral_peak_prominence),
        }
    }
}

impl Partition {
    pub const ALL: [Partition; 16] = [
        Partition::MidIntensity,
        Partition::MeanIntensity,
        Partition::MeanF0,
        Partition::Jitter,
        Partition::Shimmer,
        Partition::Hnr,
        Partition::Rms,
        Partition::SpectralCentroid,
        Partition::Rolloff,
        Partition::Bandwidth,
        Partition::Flatness,
        Partition::Contrast,
        Partition::Mfcc1,
        Partition::Zcr,
        Partition::Formants,
        Partition::Cpp,
    ];
}

impl Display for FeatureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureKind {
    type Err = anyhow::Error;

    /// Accepts display names case-insensitively, ignoring spaces, so both
    /// "Mean F0" and "mean-f0" work on the command line.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalise(s);
        Self::ALL
            .into_iter()
            .find(|kind| normalise(kind.name()) == wanted)
            .ok_or_else(|| anyhow!("unknown feature '{s}'"))
    }
}

fn normalise(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in FeatureKind::ALL {
            assert_eq!(FeatureKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.name().parse::<FeatureKind>().unwrap(), kind);
        }
        assert_eq!(FeatureKind::from_name("Pitch"), None);
    }

    #[test]
    fn cli_spellings_parse() {
        assert_eq!("mean-f0".parse::<FeatureKind>().unwrap(), FeatureKind::MeanF0);
        assert_eq!(
            "spectral_centroid".parse::<FeatureKind>().unwrap(),
            FeatureKind::SpectralCentroid
        );
        assert!("loudness".parse::<FeatureKind>().is_err());
    }

    #[test]
    fn exact_lookup_is_case_sensitive() {
        assert_eq!(FeatureKind::from_name("mean f0"), None);
    }

    #[test]
    fn rounding_split() {
        let four: Vec<_> = FeatureKind::ALL.into_iter().filter(|k| k.decimals() == 4).collect();
        assert_eq!(
            four,
            vec![FeatureKind::Jitter, FeatureKind::Shimmer, FeatureKind::Rms, FeatureKind::Flatness]
        );
    }

    #[test]
    fn formants_share_a_partition() {
        assert_eq!(FeatureKind::F1.partition(), Some(Partition::Formants));
        assert_eq!(FeatureKind::F2.partition(), FeatureKind::F3.partition());
        assert_eq!(FeatureKind::Duration.partition(), None);
        assert!(matches!(FeatureKind::Duration.computation(), Computation::Passthrough));
        assert!(matches!(FeatureKind::F3.computation(), Computation::Formant(2)));
    }
}
