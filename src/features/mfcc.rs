use std::f64::consts::PI;

use aus::analysis;
use aus::analysis::mel::MelFilterbank;
use aus::spectrum;
use ndarray::Array2;

use super::spectral::{power_to_db, Spectrogram};
use crate::error::{FeatureError, Result};

const MIN_FREQ: f64 = 0.0;

/// MFCC matrix (frames × coefficients) of a magnitude spectrogram.
///
/// The mel power spectrogram goes to dB (reference 1.0, floored 80 dB below
/// its loudest cell) before an orthonormal DCT-II, so coefficient 0 keeps the
/// absolute level of the segment.
pub(crate) fn mfcc_frames(
    spectrogram: &Spectrogram,
    n_fft: usize,
    mel_bands: usize,
    coefficients: usize,
) -> Result<Array2<f64>> {
    let sample_rate = spectrogram.sample_rate();
    let power = analysis::make_power_spectrogram(spectrogram.rows());
    let freqs = spectrum::rfftfreq(n_fft, sample_rate);
    let filterbank = MelFilterbank::new(
        MIN_FREQ,
        sample_rate as f64 / 2.0,
        mel_bands,
        &freqs,
        true,
    );
    let mel = analysis::mel::make_mel_spectrogram(&power, &filterbank);
    let frames = mel.len();
    let bands = mel.first().map_or(0, Vec::len);
    if frames == 0 || bands == 0 {
        return Err(FeatureError::Undefined("empty mel spectrogram"));
    }
    let flat: Vec<f64> = mel
        .into_iter()
        .flatten()
        .map(|value| if value.is_finite() { value } else { 0.0 })
        .collect();
    let mel = Array2::from_shape_vec((frames, bands), flat)
        .map_err(|_| FeatureError::Undefined("ragged mel spectrogram"))?;
    let log_mel = power_to_db(&mel);
    Ok(log_mel.dot(&dct_basis(coefficients, bands).t()))
}

/// Orthonormal DCT-II basis, one row per coefficient.
fn dct_basis(coefficients: usize, bands: usize) -> Array2<f64> {
    let n = bands as f64;
    Array2::from_shape_fn((coefficients, bands), |(k, i)| {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()
    })
}

/// Mean of the zeroth cepstral coefficient over all frames.
pub(crate) fn first_coefficient_mean(mfcc: &Array2<f64>) -> Result<f64> {
    if mfcc.ncols() == 0 {
        return Err(FeatureError::Undefined("no cepstral coefficients"));
    }
    let values: Vec<f64> = mfcc.column(0).iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return Err(FeatureError::Undefined("no cepstral frames"));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}
