//! Formant tracking by Burg linear prediction.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;
use tracing::debug;

use super::contour::Contour;
use super::frames::{frame_at, gaussian, samples_for, FrameGrid};
use crate::audio::resample::linear_resample;
use crate::config::FeatureSettings;
use crate::error::{FeatureError, Result};

/// Number of formants reported (F1, F2, F3).
pub const FORMANT_SLOTS: usize = 3;
/// Candidates this close to 0 Hz or to Nyquist are discarded.
const EDGE_MARGIN_HZ: f64 = 50.0;
const ROOT_ITERATIONS: usize = 500;
const ROOT_TOLERANCE: f64 = 1e-12;

/// Per-slot formant frequency contours.
#[derive(Debug, Clone)]
pub(crate) struct FormantTrack {
    slots: Vec<Contour>,
}

impl FormantTrack {
    pub fn new(slots: Vec<Contour>) -> Self {
        Self { slots }
    }

    /// Frequency of formant `slot` (0 = F1) at `time`, interpolated between
    /// frames.
    pub fn value_at(&self, slot: usize, time: f64) -> Option<f64> {
        self.slots.get(slot)?.value_at(time).filter(|f| f.is_finite())
    }
}

/// Track formants over `samples`: downsample to twice the formant ceiling,
/// pre-emphasize, then fit a Burg predictor of order `2 · max_formants` to
/// Gaussian-windowed frames and convert its roots to frequencies.
pub(crate) fn formant_track(
    samples: &[f64],
    sample_rate: u32,
    settings: &FeatureSettings,
) -> Result<FormantTrack> {
    if samples.len() < 2 || sample_rate == 0 {
        return Err(FeatureError::EmptySegment);
    }
    let target_rate = (2.0 * settings.formant_ceiling).round() as u32;
    let (samples, rate) = if target_rate > 0 && target_rate < sample_rate {
        (linear_resample(samples, sample_rate, target_rate)?, target_rate)
    } else {
        (samples.to_vec(), sample_rate)
    };
    let emphasized = pre_emphasize(&samples, rate, settings.pre_emphasis_from);

    let duration = emphasized.len() as f64 / rate as f64;
    let window_duration = 2.0 * settings.formant_window;
    let grid = FrameGrid::centred(duration, window_duration, settings.formant_time_step)
        .ok_or(FeatureError::Undefined("recording shorter than the formant window"))?;
    let window = gaussian(samples_for(window_duration, rate));
    let order = 2 * settings.max_formants;

    let mut slots = vec![Vec::with_capacity(grid.count); FORMANT_SLOTS];
    for frame in 0..grid.count {
        let frequencies = frame_at(&emphasized, rate, grid.time(frame), window.len())
            .map(|chunk| {
                let windowed: Vec<f64> = chunk.iter().zip(&window).map(|(x, w)| x * w).collect();
                frame_formants(&windowed, order, rate)
            })
            .unwrap_or_default();
        for (slot, values) in slots.iter_mut().enumerate() {
            values.push(frequencies.get(slot).copied());
        }
    }
    debug!(frames = grid.count, rate, order, "formant track");
    Ok(FormantTrack::new(
        slots.into_iter().map(|values| Contour::new(grid, values)).collect(),
    ))
}

fn pre_emphasize(samples: &[f64], sample_rate: u32, from: f64) -> Vec<f64> {
    let alpha = (-2.0 * PI * from / sample_rate as f64).exp();
    let mut output = Vec::with_capacity(samples.len());
    let mut previous = 0.0;
    for &sample in samples {
        output.push(sample - alpha * previous);
        previous = sample;
    }
    output
}

/// Formant frequencies of one windowed frame, ascending.
fn frame_formants(frame: &[f64], order: usize, sample_rate: u32) -> Vec<f64> {
    let Some(coefficients) = burg(frame, order) else {
        return Vec::new();
    };
    // x[n] ≈ Σ c_k x[n-k]  →  z^m - c_1 z^(m-1) - … - c_m
    let mut polynomial = Vec::with_capacity(order + 1);
    polynomial.push(1.0);
    polynomial.extend(coefficients.iter().map(|c| -c));

    let nyquist = 0.5 * sample_rate as f64;
    let mut frequencies: Vec<f64> = polynomial_roots(&polynomial)
        .into_iter()
        .filter(|root| root.im > 0.0)
        .map(|root| {
            let root = if root.norm() > 1.0 { root.conj().inv() } else { root };
            root.arg() * sample_rate as f64 / (2.0 * PI)
        })
        .filter(|f| *f > EDGE_MARGIN_HZ && *f < nyquist - EDGE_MARGIN_HZ)
        .collect();
    frequencies.sort_by(f64::total_cmp);
    frequencies
}

/// Burg's method: prediction coefficients `c_1..c_order`. `None` when the
/// frame carries no energy or is shorter than the order.
pub(crate) fn burg(x: &[f64], order: usize) -> Option<Vec<f64>> {
    let n = x.len();
    if order == 0 || n <= order {
        return None;
    }
    let mut forward = x[..n - 1].to_vec();
    let mut backward = x[1..].to_vec();
    let mut coefficients = vec![0.0; order + 1];
    let mut previous = vec![0.0; order + 1];

    for k in 1..=order {
        let (numerator, denominator) = forward[..n - k]
            .iter()
            .zip(&backward[..n - k])
            .fold((0.0, 0.0), |(num, den), (f, b)| (num + f * b, den + f * f + b * b));
        if denominator <= 0.0 || !denominator.is_finite() {
            return None;
        }
        coefficients[k] = 2.0 * numerator / denominator;
        for i in 1..k {
            coefficients[i] = previous[i] - coefficients[k] * previous[k - i];
        }
        if k == order {
            break;
        }
        previous[1..=k].copy_from_slice(&coefficients[1..=k]);
        for j in 0..n - k - 1 {
            forward[j] -= previous[k] * backward[j];
            backward[j] = backward[j + 1] - previous[k] * forward[j + 1];
        }
    }
    Some(coefficients.split_off(1))
}

/// All complex roots of the monic polynomial `coefficients` (highest power
/// first) by Durand–Kerner iteration.
pub(crate) fn polynomial_roots(coefficients: &[f64]) -> Vec<Complex<f64>> {
    let degree = coefficients.len().saturating_sub(1);
    if degree == 0 {
        return Vec::new();
    }
    let evaluate = |z: Complex<f64>| {
        coefficients
            .iter()
            .fold(Complex::new(0.0, 0.0), |acc, &c| acc * z + c)
    };
    let seed = Complex::new(0.4, 0.9);
    let mut roots: Vec<Complex<f64>> = (0..degree).map(|i| seed.powu(i as u32)).collect();

    for _ in 0..ROOT_ITERATIONS {
        let mut largest_step: f64 = 0.0;
        for i in 0..degree {
            let mut denominator = Complex::new(1.0, 0.0);
            for j in 0..degree {
                if i != j {
                    denominator *= roots[i] - roots[j];
                }
            }
            if denominator.norm() == 0.0 {
                denominator = Complex::new(ROOT_TOLERANCE, 0.0);
            }
            let step = evaluate(roots[i]) / denominator;
            if step.re.is_finite() && step.im.is_finite() {
                roots[i] -= step;
                largest_step = largest_step.max(step.norm());
            }
        }
        if largest_step < ROOT_TOLERANCE {
            break;
        }
    }
    roots
}
