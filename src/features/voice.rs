//! Glottal pulse detection and the perturbation measures built on it.

use super::contour::Contour;
use crate::error::{FeatureError, Result};

/// Shortest and longest period accepted as a glottal cycle (seconds).
const PERIOD_FLOOR: f64 = 0.0001;
const PERIOD_CEILING: f64 = 0.02;
/// Largest ratio between consecutive periods / amplitudes still compared.
const MAX_PERIOD_FACTOR: f64 = 1.3;
const MAX_AMPLITUDE_FACTOR: f64 = 1.6;
/// Search range for the next pulse, relative to the local period.
const SEARCH_LOW: f64 = 0.8;
const SEARCH_HIGH: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Pulse {
    pub time: f64,
    pub amplitude: f64,
}

/// Place one pulse per glottal cycle inside every voiced stretch of `pitch`.
///
/// The first pulse of a stretch is the waveform maximum within its first
/// period; each following pulse is the maximum within 0.8–1.2 local periods
/// of the previous one.
pub(crate) fn glottal_pulses(samples: &[f64], sample_rate: u32, pitch: &Contour) -> Vec<Pulse> {
    let rate = sample_rate as f64;
    let duration = samples.len() as f64 / rate;
    let mut pulses = Vec::new();

    for (start, end, initial_frequency) in voiced_stretches(pitch, duration) {
        let mut period = 1.0 / initial_frequency;
        let Some(mut pulse) = peak_between(samples, rate, start, (start + period).min(end)) else {
            continue;
        };
        loop {
            pulses.push(pulse);
            if let Some(frequency) = pitch.value_at(pulse.time).filter(|f| *f > 0.0) {
                period = 1.0 / frequency;
            }
            let low = pulse.time + SEARCH_LOW * period;
            let high = pulse.time + SEARCH_HIGH * period;
            if high > end {
                break;
            }
            match peak_between(samples, rate, low, high) {
                Some(next) if next.time > pulse.time => pulse = next,
                _ => break,
            }
        }
    }
    pulses
}

fn voiced_stretches(pitch: &Contour, duration: f64) -> Vec<(f64, f64, f64)> {
    let half_step = 0.5 * pitch.step();
    let mut stretches = Vec::new();
    let mut current: Option<(usize, f64)> = None;
    let values = pitch.values();
    for (frame, value) in values.iter().enumerate() {
        match (value, current) {
            (Some(frequency), None) => current = Some((frame, *frequency)),
            (None, Some((first, frequency))) => {
                let bounds = stretch_bounds(pitch, first, frame - 1, half_step, duration);
                stretches.push((bounds.0, bounds.1, frequency));
                current = None;
            }
            _ => {}
        }
    }
    if let Some((first, frequency)) = current {
        let bounds = stretch_bounds(pitch, first, values.len() - 1, half_step, duration);
        stretches.push((bounds.0, bounds.1, frequency));
    }
    stretches
}

fn stretch_bounds(
    pitch: &Contour,
    first: usize,
    last: usize,
    half_step: f64,
    duration: f64,
) -> (f64, f64) {
    let start = (pitch.time(first) - half_step).max(0.0);
    let end = (pitch.time(last) + half_step).min(duration);
    (start, end)
}

fn peak_between(samples: &[f64], rate: f64, from: f64, to: f64) -> Option<Pulse> {
    let first = (from * rate).ceil().max(1.0) as usize;
    let last = ((to * rate).floor() as usize).min(samples.len().saturating_sub(2));
    if first > last {
        return None;
    }
    let (index, _) = samples[first..=last]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    let index = first + index;
    let (left, centre, right) = (samples[index - 1], samples[index], samples[index + 1]);
    let curvature = left - 2.0 * centre + right;
    let (offset, amplitude) = if curvature < 0.0 {
        let offset = 0.5 * (left - right) / curvature;
        (offset, centre - 0.25 * (left - right) * offset)
    } else {
        (0.0, centre)
    };
    (amplitude > 0.0).then_some(Pulse {
        time: (index as f64 + offset) / rate,
        amplitude,
    })
}

fn is_valid_period(period: f64) -> bool {
    (PERIOD_FLOOR..=PERIOD_CEILING).contains(&period)
}

fn within_factor(a: f64, b: f64, factor: f64) -> bool {
    a > 0.0 && b > 0.0 && a.max(b) / a.min(b) <= factor
}

/// Local jitter: mean absolute difference between consecutive periods
/// divided by the mean period.
pub(crate) fn jitter_local(pulses: &[Pulse]) -> Result<f64> {
    let periods: Vec<f64> = pulses.windows(2).map(|w| w[1].time - w[0].time).collect();
    let valid: Vec<f64> = periods.iter().copied().filter(|p| is_valid_period(*p)).collect();
    if valid.len() < 2 {
        return Err(FeatureError::Undefined("fewer than two usable periods"));
    }
    let (sum, count) = periods
        .windows(2)
        .filter(|w| is_valid_period(w[0]) && is_valid_period(w[1]))
        .filter(|w| within_factor(w[0], w[1], MAX_PERIOD_FACTOR))
        .fold((0.0, 0usize), |(sum, count), w| (sum + (w[1] - w[0]).abs(), count + 1));
    if count == 0 {
        return Err(FeatureError::Undefined("no comparable consecutive periods"));
    }
    let mean_period = valid.iter().sum::<f64>() / valid.len() as f64;
    Ok((sum / count as f64) / mean_period)
}

/// Local shimmer: mean absolute difference between the amplitudes of
/// consecutive cycles divided by the mean amplitude.
pub(crate) fn shimmer_local(pulses: &[Pulse]) -> Result<f64> {
    let (difference, total, count) = pulses
        .windows(2)
        .filter(|w| is_valid_period(w[1].time - w[0].time))
        .filter(|w| within_factor(w[0].amplitude, w[1].amplitude, MAX_AMPLITUDE_FACTOR))
        .fold((0.0, 0.0, 0usize), |(difference, total, count), w| {
            (
                difference + (w[1].amplitude - w[0].amplitude).abs(),
                total + 0.5 * (w[0].amplitude + w[1].amplitude),
                count + 1,
            )
        });
    if count < 2 || total <= 0.0 {
        return Err(FeatureError::Undefined("fewer than two usable amplitudes"));
    }
    Ok(difference / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pitch::pitch_contour;
    use std::f64::consts::PI;

    const RATE: u32 = 16_000;

    /// One sine cycle per entry of `cycles` (period seconds, amplitude).
    fn cycles(cycles: impl Iterator<Item = (f64, f64)>) -> Vec<f64> {
        let mut samples = Vec::new();
        for (period, amplitude) in cycles {
            let n = (period * RATE as f64).round() as usize;
            samples.extend((0..n).map(|i| amplitude * (2.0 * PI * i as f64 / n as f64).sin()));
        }
        samples
    }

    fn pulses_of(samples: &[f64]) -> Vec<Pulse> {
        let pitch = pitch_contour(samples, RATE, 75.0, 600.0).unwrap();
        glottal_pulses(samples, RATE, &pitch)
    }

    #[test]
    fn steady_tone_has_negligible_perturbation() {
        let samples = cycles((0..200).map(|_| (0.005, 0.5)));
        let pulses = pulses_of(&samples);
        assert!(pulses.len() > 150, "found {} pulses", pulses.len());
        assert!(jitter_local(&pulses).unwrap() < 0.005);
        assert!(shimmer_local(&pulses).unwrap() < 0.01);
    }

    fn train(
        periods: impl Iterator<Item = f64>,
        amplitudes: impl Iterator<Item = f64>,
    ) -> Vec<Pulse> {
        let mut time = 0.01;
        periods
            .zip(amplitudes)
            .map(|(period, amplitude)| {
                let pulse = Pulse { time, amplitude };
                time += period;
                pulse
            })
            .collect()
    }

    #[test]
    fn pulses_follow_the_cycle_peaks() {
        let samples = cycles((0..100).map(|_| (0.005, 0.5)));
        let pulses = pulses_of(&samples);
        assert!(pulses.len() > 80, "found {} pulses", pulses.len());
        for pair in pulses.windows(2) {
            assert!(((pair[1].time - pair[0].time) - 0.005).abs() < 1e-4);
            assert!((pair[0].amplitude - 0.5).abs() < 1e-3);
        }
    }

    #[test]
    fn alternating_periods_raise_jitter() {
        let periods = (0..50).map(|i| if i % 2 == 0 { 0.005 } else { 0.0055 });
        let pulses = train(periods, std::iter::repeat(1.0));
        let jitter = jitter_local(&pulses).unwrap();
        assert!((jitter - 0.0005 / 0.00525).abs() < 1e-3, "jitter={jitter}");
    }

    #[test]
    fn alternating_amplitudes_raise_shimmer() {
        let amplitudes = (0..50).map(|i| if i % 2 == 0 { 1.0 } else { 0.8 });
        let pulses = train(std::iter::repeat(0.005), amplitudes);
        let shimmer = shimmer_local(&pulses).unwrap();
        assert!((shimmer - 0.2 / 0.9).abs() < 1e-6, "shimmer={shimmer}");
    }

    #[test]
    fn outlying_periods_are_not_compared() {
        let pulses = train([0.005, 0.005, 0.012, 0.005, 0.005].into_iter(), std::iter::repeat(1.0));
        assert!(jitter_local(&pulses).unwrap() < 1e-9);
    }

    #[test]
    fn too_few_pulses_are_undefined() {
        let pulses = [Pulse { time: 0.0, amplitude: 1.0 }, Pulse { time: 0.005, amplitude: 1.0 }];
        assert!(jitter_local(&pulses).is_err());
        assert!(shimmer_local(&pulses).is_err());
    }
}
