/// Slice the samples covering `start..end` seconds.
///
/// Both bounds are converted to sample indices by truncation and clamped to
/// the buffer, so out-of-range or reversed times yield a shorter (possibly
/// empty) slice instead of an error.
pub fn extract_range(samples: &[f32], sample_rate: u32, start: f64, end: f64) -> &[f32] {
    let start_sample = time_to_index(start, sample_rate).min(samples.len());
    let end_sample = time_to_index(end, sample_rate).min(samples.len());
    if end_sample <= start_sample {
        return &[];
    }
    &samples[start_sample..end_sample]
}

fn time_to_index(time: f64, sample_rate: u32) -> usize {
    if !time.is_finite() || time <= 0.0 {
        0
    } else {
        (time * sample_rate as f64) as usize
    }
}
