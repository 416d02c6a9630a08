use tracing::debug;

use super::contour::Contour;
use super::frames::{frame_at, peak_abs, samples_for, FrameGrid};
use super::periodicity::{autocorrelation_peaks, Autocorrelator};
use crate::error::{FeatureError, Result};

const PERIODS_PER_WINDOW: f64 = 3.0;
const VOICING_THRESHOLD: f64 = 0.45;
const SILENCE_THRESHOLD: f64 = 0.03;
const OCTAVE_COST: f64 = 0.01;

/// Autocorrelation pitch tracker.
///
/// Each frame keeps the autocorrelation peak with the best octave-corrected
/// strength; a frame is voiced when that peak reaches the voicing threshold
/// and the frame is not silent relative to the whole signal.
pub(crate) fn pitch_contour(
    samples: &[f64],
    sample_rate: u32,
    floor: f64,
    ceiling: f64,
) -> Result<Contour> {
    if samples.len() < 2 || sample_rate == 0 {
        return Err(FeatureError::EmptySegment);
    }
    let rate = sample_rate as f64;
    let duration = samples.len() as f64 / rate;
    let window_duration = PERIODS_PER_WINDOW / floor;
    let grid = FrameGrid::centred(duration, window_duration, 0.25 * PERIODS_PER_WINDOW / floor)
        .ok_or(FeatureError::Undefined("segment shorter than the pitch window"))?;

    let correlator = Autocorrelator::new(samples_for(window_duration, sample_rate));
    let global_peak = peak_abs(samples);
    if global_peak <= 0.0 {
        return Err(FeatureError::Undefined("silent segment"));
    }
    let min_lag = (rate / ceiling).floor().max(2.0) as usize;
    let max_lag = ((rate / floor).ceil() as usize)
        .min(correlator.max_reliable_lag().saturating_sub(1));

    let values = (0..grid.count)
        .map(|frame| {
            let chunk = frame_at(samples, sample_rate, grid.time(frame), correlator.frame_len())?;
            let mean = chunk.iter().sum::<f64>() / chunk.len() as f64;
            let local_peak = chunk.iter().fold(0.0_f64, |acc, x| acc.max((x - mean).abs()));
            if local_peak < SILENCE_THRESHOLD * global_peak {
                return None;
            }
            let r = correlator.normalized(chunk)?;
            autocorrelation_peaks(&r, min_lag, max_lag)
                .into_iter()
                .filter(|peak| peak.strength >= VOICING_THRESHOLD)
                .map(|peak| {
                    let frequency = rate / peak.lag;
                    let score = peak.strength - OCTAVE_COST * (floor / frequency).log2();
                    (frequency, score)
                })
                .filter(|(frequency, _)| *frequency >= floor && *frequency <= ceiling)
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(frequency, _)| frequency)
        })
        .collect::<Vec<_>>();

    debug!(
        frames = values.len(),
        voiced = values.iter().filter(|v| v.is_some()).count(),
        "pitch contour"
    );
    Ok(Contour::new(grid, values))
}
