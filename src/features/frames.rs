//! Frame grids and analysis windows shared by the contour-based analyses.

use std::f64::consts::PI;

/// Analysis frames of fixed duration, centred in the analysed signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FrameGrid {
    pub count: usize,
    pub first_time: f64,
    pub step: f64,
}

impl FrameGrid {
    /// Fit as many `window`-long frames spaced `step` apart as the signal
    /// allows, with the whole grid centred in the signal. `None` when not even
    /// one window fits.
    pub fn centred(duration: f64, window: f64, step: f64) -> Option<Self> {
        if !(duration.is_finite() && window > 0.0 && step > 0.0) || duration < window {
            return None;
        }
        let count = ((duration - window) / step + 1e-9).floor() as usize + 1;
        let first_time = 0.5 * duration - 0.5 * (count - 1) as f64 * step;
        Some(Self {
            count,
            first_time,
            step,
        })
    }

    pub fn time(&self, frame: usize) -> f64 {
        self.first_time + frame as f64 * self.step
    }
}

/// The `len` samples centred on `time`, shifted inward at the signal edges.
pub(crate) fn frame_at(samples: &[f64], sample_rate: u32, time: f64, len: usize) -> Option<&[f64]> {
    if len == 0 || samples.len() < len {
        return None;
    }
    let centre = time * sample_rate as f64;
    let start = (centre - len as f64 / 2.0).round().max(0.0) as usize;
    let start = start.min(samples.len() - len);
    Some(&samples[start..start + len])
}

pub(crate) fn samples_for(duration: f64, sample_rate: u32) -> usize {
    (duration * sample_rate as f64).round().max(1.0) as usize
}

pub(crate) fn hann(len: usize) -> Vec<f64> {
    if len < 2 {
        return vec![1.0; len];
    }
    let denom = (len - 1) as f64;
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}

/// Gaussian window reaching zero at both edges.
pub(crate) fn gaussian(len: usize) -> Vec<f64> {
    if len < 2 {
        return vec![1.0; len];
    }
    let edge = (-12.0_f64).exp();
    let denom = (len - 1) as f64;
    (0..len)
        .map(|i| {
            let x = i as f64 / denom - 0.5;
            ((-48.0 * x * x).exp() - edge) / (1.0 - edge)
        })
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub(crate) fn peak_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

/// Zero-pad `samples` by `pad` on both sides, as centred STFT framing does.
pub(crate) fn centre_pad(samples: &[f64], pad: usize) -> Vec<f64> {
    let mut padded = vec![0.0; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);
    padded
}
