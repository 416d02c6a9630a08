//! Windowed, normalized autocorrelation (Boersma 1993) shared by the pitch
//! tracker and the harmonicity analysis.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::frames::hann;

/// Computes `r(τ) = r_x(τ) / r_w(τ)`: the autocorrelation of a Hann-windowed
/// frame divided by the autocorrelation of the window itself.
pub(crate) struct Autocorrelator {
    window: Vec<f64>,
    window_ac: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    fft_len: usize,
}

impl Autocorrelator {
    pub fn new(frame_len: usize) -> Self {
        let fft_len = (2 * frame_len).next_power_of_two().max(2);
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);
        let window = hann(frame_len);
        let mut correlator = Self {
            window_ac: Vec::new(),
            window,
            forward,
            inverse,
            fft_len,
        };
        let raw = correlator.raw_autocorrelation(&correlator.window.clone());
        let norm = raw.first().copied().unwrap_or(0.0);
        correlator.window_ac = if norm > 0.0 {
            raw.iter().map(|v| v / norm).collect()
        } else {
            vec![0.0; raw.len()]
        };
        correlator
    }

    pub fn frame_len(&self) -> usize {
        self.window.len()
    }

    /// Longest lag whose window correction is still trustworthy.
    pub fn max_reliable_lag(&self) -> usize {
        self.window.len() / 2
    }

    /// Normalized autocorrelation of a frame, `None` for a silent frame.
    pub fn normalized(&self, frame: &[f64]) -> Option<Vec<f64>> {
        debug_assert_eq!(frame.len(), self.window.len());
        let mean = frame.iter().sum::<f64>() / frame.len().max(1) as f64;
        let windowed: Vec<f64> = frame
            .iter()
            .zip(&self.window)
            .map(|(x, w)| (x - mean) * w)
            .collect();
        let raw = self.raw_autocorrelation(&windowed);
        let energy = raw[0];
        if energy <= 0.0 || !energy.is_finite() {
            return None;
        }
        let limit = self.max_reliable_lag() + 1;
        Some(
            raw.iter()
                .zip(&self.window_ac)
                .take(limit)
                .map(|(r, w)| if *w > 1e-9 { r / energy / w } else { 0.0 })
                .collect(),
        )
    }

    fn raw_autocorrelation(&self, windowed: &[f64]) -> Vec<f64> {
        let mut buffer = vec![Complex::new(0.0, 0.0); self.fft_len];
        for (slot, &value) in buffer.iter_mut().zip(windowed) {
            *slot = Complex::new(value, 0.0);
        }
        self.forward.process(&mut buffer);
        for value in buffer.iter_mut() {
            *value = Complex::new(value.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut buffer);
        let scale = 1.0 / self.fft_len as f64;
        buffer
            .iter()
            .take(windowed.len())
            .map(|c| c.re * scale)
            .collect()
    }
}

/// A local maximum of the autocorrelation, refined by parabolic interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Peak {
    pub lag: f64,
    pub strength: f64,
}

/// Local maxima of `r` with integer lag in `min_lag..=max_lag`.
pub(crate) fn autocorrelation_peaks(r: &[f64], min_lag: usize, max_lag: usize) -> Vec<Peak> {
    let min_lag = min_lag.max(1);
    let max_lag = max_lag.min(r.len().saturating_sub(2));
    let mut peaks = Vec::new();
    for lag in min_lag..=max_lag {
        let (left, centre, right) = (r[lag - 1], r[lag], r[lag + 1]);
        if centre > left && centre >= right {
            let curvature = left - 2.0 * centre + right;
            let (offset, strength) = if curvature < 0.0 {
                let offset = 0.5 * (left - right) / curvature;
                (offset, centre - 0.25 * (left - right) * offset)
            } else {
                (0.0, centre)
            };
            peaks.push(Peak {
                lag: lag as f64 + offset,
                strength,
            });
        }
    }
    peaks
}
