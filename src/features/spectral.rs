//! Short-time spectral shape descriptors over a centred STFT.

use aus::spectrum;
use aus::WindowType;
use ndarray::{Array1, Array2, ArrayView1, Axis};

use super::frames::centre_pad;
use crate::error::{FeatureError, Result};

/// Magnitudes are floored here before taking logarithms.
const AMIN: f64 = 1e-10;
/// Dynamic range kept by the dB conversion of the contrast peaks and valleys.
const TOP_DB: f64 = 80.0;
const CONTRAST_QUANTILE: f64 = 0.02;

/// Magnitude spectrogram with frames as rows and frequency bins as columns.
pub(crate) struct Spectrogram {
    rows: Vec<Vec<f64>>,
    magnitude: Array2<f64>,
    freqs: Array1<f64>,
    sample_rate: u32,
}

impl Spectrogram {
    /// Hann-windowed STFT of `samples`, zero-padded by half a frame on each
    /// side so that frames are centred on multiples of `hop`.
    pub fn compute(samples: &[f64], sample_rate: u32, n_fft: usize, hop: usize) -> Result<Self> {
        if samples.is_empty() || sample_rate == 0 {
            return Err(FeatureError::EmptySegment);
        }
        let padded = centre_pad(samples, n_fft / 2);
        let stft = spectrum::rstft(&padded, n_fft, hop, WindowType::Hanning);
        let (rows, _) = spectrum::complex_to_polar_rstft(&stft);
        let bins = n_fft / 2 + 1;
        if rows.is_empty() || rows.iter().any(|row| row.len() != bins) {
            return Err(FeatureError::Undefined("no complete STFT frames"));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let magnitude = Array2::from_shape_vec((rows.len(), bins), flat)
            .map_err(|_| FeatureError::Undefined("inconsistent STFT dimensions"))?;
        let freqs = Array1::from(spectrum::rfftfreq(n_fft, sample_rate));
        if freqs.len() != bins {
            return Err(FeatureError::Undefined("inconsistent STFT frequencies"));
        }
        Ok(Self {
            rows,
            magnitude,
            freqs,
            sample_rate,
        })
    }

    /// Magnitude rows in the layout `aus` analysis routines expect.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Mean spectral centroid in Hz.
    pub fn centroid(&self) -> Result<f64> {
        frame_mean(self.frames().map(|frame| self.frame_centroid(frame)))
    }

    /// Mean frequency below which `percent` of each frame's magnitude lies.
    pub fn rolloff(&self, percent: f64) -> Result<f64> {
        frame_mean(self.frames().map(|frame| {
            let threshold = percent * frame.sum();
            let mut cumulative = 0.0;
            for (value, freq) in frame.iter().zip(self.freqs.iter()) {
                cumulative += value;
                if cumulative >= threshold {
                    return *freq;
                }
            }
            self.freqs[self.freqs.len() - 1]
        }))
    }

    /// Mean p-th order spectral bandwidth around each frame's centroid.
    pub fn bandwidth(&self, p: f64) -> Result<f64> {
        frame_mean(self.frames().map(|frame| {
            let total = frame.sum();
            if total <= 0.0 {
                return 0.0;
            }
            let centroid = self.frame_centroid(frame);
            let spread: f64 = frame
                .iter()
                .zip(self.freqs.iter())
                .map(|(value, freq)| value / total * (freq - centroid).abs().powf(p))
                .sum();
            spread.powf(p.recip())
        }))
    }

    /// Mean ratio of geometric to arithmetic mean of the power spectrum.
    pub fn flatness(&self) -> Result<f64> {
        frame_mean(self.frames().map(|frame| {
            let power = frame.mapv(|value| (value * value).max(AMIN));
            let log_mean = power.mapv(f64::ln).mean().unwrap_or(0.0);
            let mean = power.mean().unwrap_or(AMIN);
            log_mean.exp() / mean
        }))
    }

    /// Mean octave-band spectral contrast in dB: the difference between the
    /// loudest and quietest quantile of each band. Bands start at 0 Hz, then
    /// `fmin`, doubling `bands` times.
    pub fn contrast(&self, fmin: f64, bands: usize) -> Result<f64> {
        let mut edges = vec![0.0];
        edges.extend((0..=bands).map(|k| fmin * 2f64.powi(k as i32)));
        let nyquist = 0.5 * self.sample_rate as f64;
        if edges[..edges.len() - 1].iter().any(|edge| *edge >= nyquist) {
            return Err(FeatureError::Undefined("contrast band above Nyquist"));
        }

        let frames = self.magnitude.nrows();
        let mut peaks = Array2::<f64>::zeros((bands + 1, frames));
        let mut valleys = Array2::<f64>::zeros((bands + 1, frames));
        for band in 0..=bands {
            let (low, high) = (edges[band], edges[band + 1]);
            let (first, last) = self.band_bins(band, bands, low, high)?;
            let width = last - first;
            let quantile = ((CONTRAST_QUANTILE * width as f64).round_ties_even() as usize).max(1);
            // Every band but the highest gives up its top bin to the next.
            let take = if band < bands { width - 1 } else { width };
            if take == 0 {
                return Err(FeatureError::Undefined("empty contrast band"));
            }
            let quantile = quantile.min(take);
            for (frame, row) in self.magnitude.outer_iter().enumerate() {
                let mut sorted: Vec<f64> = row.slice(ndarray::s![first..first + take]).to_vec();
                sorted.sort_by(f64::total_cmp);
                valleys[[band, frame]] = sorted[..quantile].iter().sum::<f64>() / quantile as f64;
                let loudest = &sorted[take - quantile..];
                peaks[[band, frame]] = loudest.iter().sum::<f64>() / quantile as f64;
            }
        }
        let contrast = power_to_db(&peaks) - power_to_db(&valleys);
        contrast
            .mean()
            .ok_or(FeatureError::Undefined("no contrast frames"))
    }

    /// Bin range `[first, last)` covering one octave band, including the
    /// bin just below a non-lowest band and everything above the highest.
    fn band_bins(&self, band: usize, bands: usize, low: f64, high: f64) -> Result<(usize, usize)> {
        let inside: Vec<usize> = self
            .freqs
            .iter()
            .enumerate()
            .filter(|(_, freq)| **freq >= low && **freq <= high)
            .map(|(bin, _)| bin)
            .collect();
        let (Some(&first), Some(&last)) = (inside.first(), inside.last()) else {
            return Err(FeatureError::Undefined("contrast band contains no bins"));
        };
        let first = if band > 0 { first.saturating_sub(1) } else { first };
        let last = if band == bands { self.freqs.len() } else { last + 1 };
        Ok((first, last))
    }

    fn frames(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.magnitude.axis_iter(Axis(0))
    }

    fn frame_centroid(&self, frame: ArrayView1<'_, f64>) -> f64 {
        let total = frame.sum();
        if total <= 0.0 {
            0.0
        } else {
            frame.dot(&self.freqs) / total
        }
    }
}

fn frame_mean(values: impl Iterator<Item = f64>) -> Result<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        Err(FeatureError::Undefined("no spectral frames"))
    } else {
        Ok(sum / count as f64)
    }
}

/// `10·log10(max(S, amin))` clipped to `TOP_DB` below the matrix maximum.
pub(crate) fn power_to_db(values: &Array2<f64>) -> Array2<f64> {
    let db = values.mapv(|v| 10.0 * v.max(AMIN).log10());
    let ceiling = db.fold(f64::NEG_INFINITY, |acc, v| acc.max(*v));
    db.mapv(|v| v.max(ceiling - TOP_DB))
}
