use super::contour::Contour;
use super::frames::{frame_at, gaussian, samples_for, FrameGrid};
use crate::error::{FeatureError, Result};

/// Window duration as a multiple of the longest expected pitch period.
const WINDOW_PERIODS: f64 = 3.2;
/// Reference pressure for dB SPL, squared.
const REFERENCE_POWER: f64 = 4.0e-10;
/// Value reported for frames with no energy at all.
const SILENCE_DB: f64 = -300.0;

/// Intensity contour in dB: Gaussian-weighted mean power of each frame after
/// removing the frame's weighted mean.
pub(crate) fn intensity_contour(
    samples: &[f64],
    sample_rate: u32,
    min_pitch: f64,
    time_step: f64,
) -> Result<Contour> {
    if samples.is_empty() || sample_rate == 0 {
        return Err(FeatureError::EmptySegment);
    }
    let duration = samples.len() as f64 / sample_rate as f64;
    let window_duration = WINDOW_PERIODS / min_pitch;
    let grid = FrameGrid::centred(duration, window_duration, time_step)
        .ok_or(FeatureError::Undefined("segment shorter than the intensity window"))?;
    let window = gaussian(samples_for(window_duration, sample_rate));
    let weight_sum: f64 = window.iter().sum();
    if weight_sum <= 0.0 {
        return Err(FeatureError::Undefined("degenerate intensity window"));
    }

    let values = (0..grid.count)
        .map(|frame| {
            let chunk = frame_at(samples, sample_rate, grid.time(frame), window.len())?;
            let mean = chunk.iter().zip(&window).map(|(x, w)| x * w).sum::<f64>() / weight_sum;
            let power = chunk
                .iter()
                .zip(&window)
                .map(|(x, w)| w * (x - mean).powi(2))
                .sum::<f64>()
                / weight_sum;
            Some(if power > 0.0 {
                10.0 * (power / REFERENCE_POWER).log10()
            } else {
                SILENCE_DB
            })
        })
        .collect();
    Ok(Contour::new(grid, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(amplitude: f64, seconds: f64, rate: u32) -> Vec<f64> {
        let n = (seconds * rate as f64) as usize;
        (0..n)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * 220.0 * i as f64 / rate as f64;
                amplitude * phase.sin()
            })
            .collect()
    }

    #[test]
    fn sine_intensity_matches_mean_square() {
        let samples = sine(0.5, 1.0, 16_000);
        let contour = intensity_contour(&samples, 16_000, 75.0, 0.01).unwrap();
        let expected = 10.0 * (0.125 / REFERENCE_POWER).log10();
        let mid = contour.value_at(0.5).unwrap();
        assert!((mid - expected).abs() < 0.5, "mid={mid} expected={expected}");
    }

    #[test]
    fn doubling_amplitude_adds_six_db() {
        let quiet = intensity_contour(&sine(0.1, 0.5, 16_000), 16_000, 100.0, 0.01).unwrap();
        let loud = intensity_contour(&sine(0.2, 0.5, 16_000), 16_000, 100.0, 0.01).unwrap();
        let delta = loud.value_at(0.25).unwrap() - quiet.value_at(0.25).unwrap();
        assert!((delta - 6.02).abs() < 0.05, "delta={delta}");
    }

    #[test]
    fn silence_is_far_below_zero() {
        let contour = intensity_contour(&vec![0.0; 8000], 16_000, 75.0, 0.01).unwrap();
        assert!(contour.defined().all(|v| v <= 0.0));
    }

    #[test]
    fn too_short_for_window() {
        let err = intensity_contour(&vec![0.1; 100], 16_000, 75.0, 0.01).unwrap_err();
        assert!(matches!(err, FeatureError::Undefined(_)));
    }
}
