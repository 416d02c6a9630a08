use super::frames::centre_pad;
use crate::error::{FeatureError, Result};

/// Sign changes per second. Zero counts as positive, negative zero as
/// negative.
pub(crate) fn zero_crossing_rate(samples: &[f64], sample_rate: u32) -> Result<f64> {
    if samples.len() < 2 {
        return Err(FeatureError::EmptySegment);
    }
    let duration = samples.len() as f64 / sample_rate as f64;
    if sample_rate == 0 || duration <= 0.0 {
        return Err(FeatureError::Undefined("segment has no duration"));
    }
    let crossings = samples
        .windows(2)
        .filter(|pair| pair[0].is_sign_negative() != pair[1].is_sign_negative())
        .count();
    Ok(crossings as f64 / duration)
}

/// Mean root-mean-square energy of centred frames of `frame_length` samples
/// spaced `hop` apart.
pub(crate) fn rms_energy(samples: &[f64], frame_length: usize, hop: usize) -> Result<f64> {
    if samples.is_empty() {
        return Err(FeatureError::EmptySegment);
    }
    if frame_length == 0 || hop == 0 {
        return Err(FeatureError::Undefined("frame length and hop must be positive"));
    }
    let padded = centre_pad(samples, frame_length / 2);
    if padded.len() < frame_length {
        return Err(FeatureError::Undefined("segment shorter than one frame"));
    }
    let frames = (padded.len() - frame_length) / hop + 1;
    let total: f64 = (0..frames)
        .map(|frame| {
            let chunk = &padded[frame * hop..frame * hop + frame_length];
            (chunk.iter().map(|x| x * x).sum::<f64>() / frame_length as f64).sqrt()
        })
        .sum();
    Ok(total / frames as f64)
}
