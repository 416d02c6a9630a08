use super::contour::Contour;
use super::frames::{frame_at, peak_abs, samples_for, FrameGrid};
use super::periodicity::{autocorrelation_peaks, Autocorrelator};
use crate::error::{FeatureError, Result};

const PERIODS_PER_WINDOW: f64 = 4.5;
const SILENCE_THRESHOLD: f64 = 0.1;
/// Reported for frames without any periodicity.
const APERIODIC_DB: f64 = -200.0;
/// Caps HNR of perfectly periodic frames at 100 dB.
const MAX_CORRELATION: f64 = 1.0 - 1e-10;

/// Harmonics-to-noise ratio contour in dB from the strongest autocorrelation
/// peak `r` of each frame: `10·log10(r / (1 - r))`. Silent frames are
/// undefined.
pub(crate) fn harmonicity_contour(
    samples: &[f64],
    sample_rate: u32,
    min_pitch: f64,
    time_step: f64,
) -> Result<Contour> {
    if samples.len() < 2 || sample_rate == 0 {
        return Err(FeatureError::EmptySegment);
    }
    let rate = sample_rate as f64;
    let duration = samples.len() as f64 / rate;
    let window_duration = PERIODS_PER_WINDOW / min_pitch;
    let grid = FrameGrid::centred(duration, window_duration, time_step)
        .ok_or(FeatureError::Undefined("segment shorter than the harmonicity window"))?;

    let correlator = Autocorrelator::new(samples_for(window_duration, sample_rate));
    let global_peak = peak_abs(samples);
    let max_lag = ((rate / min_pitch).ceil() as usize)
        .min(correlator.max_reliable_lag().saturating_sub(1));

    let values = (0..grid.count)
        .map(|frame| {
            let chunk = frame_at(samples, sample_rate, grid.time(frame), correlator.frame_len())?;
            if peak_abs(chunk) < SILENCE_THRESHOLD * global_peak {
                return None;
            }
            let r = correlator.normalized(chunk)?;
            let best = autocorrelation_peaks(&r, 2, max_lag)
                .into_iter()
                .map(|peak| peak.strength)
                .fold(f64::NEG_INFINITY, f64::max);
            Some(if best > 0.0 {
                let r = best.min(MAX_CORRELATION);
                10.0 * (r / (1.0 - r)).log10()
            } else {
                APERIODIC_DB
            })
        })
        .collect();
    Ok(Contour::new(grid, values))
}
