use crate::error::{FeatureError, Result};

/// Linearly resample `samples` from `source_rate` to `target_rate`.
///
/// When downsampling, a moving-average pre-filter spanning one output period
/// attenuates content above the new Nyquist frequency.
pub fn linear_resample(samples: &[f64], source_rate: u32, target_rate: u32) -> Result<Vec<f64>> {
    if source_rate == 0 || target_rate == 0 {
        return Err(FeatureError::Undefined("sample rate must be positive"));
    }
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples.to_vec());
    }
    let filtered;
    let input = if target_rate < source_rate {
        filtered = box_filter(samples, source_rate as f64 / target_rate as f64);
        filtered.as_slice()
    } else {
        samples
    };
    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = ((input.len() as f64) * ratio).ceil().max(1.0) as usize;
    let mut output = Vec::with_capacity(output_len);
    let last_index = input.len() - 1;
    for i in 0..output_len {
        let position = i as f64 / ratio;
        let left = (position.floor() as usize).min(last_index);
        let right = (left + 1).min(last_index);
        let t = position - left as f64;
        output.push(input[left] * (1.0 - t) + input[right] * t);
    }
    Ok(output)
}

fn box_filter(samples: &[f64], width: f64) -> Vec<f64> {
    let radius = (width / 2.0).floor() as usize;
    if radius == 0 {
        return samples.to_vec();
    }
    let mut prefix = Vec::with_capacity(samples.len() + 1);
    prefix.push(0.0);
    for &sample in samples {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + sample);
    }
    (0..samples.len())
        .map(|idx| {
            let start = idx.saturating_sub(radius);
            let end = (idx + radius + 1).min(samples.len());
            (prefix[end] - prefix[start]) / (end - start) as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::linear_resample;

    #[test]
    fn preserves_constant_signal_after_resample() {
        let input = vec![0.5; 480];
        let resampled = linear_resample(&input, 48_000, 16_000).unwrap();
        let expected_len = ((input.len() as f64) * 16_000_f64 / 48_000_f64).ceil() as usize;
        assert_eq!(resampled.len(), expected_len);
        assert!(resampled.iter().all(|&sample| (sample - 0.5).abs() < 1e-9));
    }

    #[test]
    fn rejects_zero_rates() {
        assert!(linear_resample(&[0.1, 0.2], 0, 16_000).is_err());
    }

    #[test]
    fn upsampling_interpolates_between_neighbours() {
        let resampled = linear_resample(&[0.0, 1.0], 1, 2).unwrap();
        assert_eq!(resampled, vec![0.0, 0.5, 1.0, 1.0]);
    }
}
