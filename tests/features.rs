mod common;

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use common::{sine_wave, SAMPLE_RATE};
use vocalfolder::audio::AudioHandle;
use vocalfolder::config::FeatureSettings;
use vocalfolder::features;
use vocalfolder::FormantMode;

fn tone(frequency: f32, amplitude: f32) -> AudioHandle {
    AudioHandle::from_samples(sine_wave(frequency, 1.0, amplitude), SAMPLE_RATE, 1)
}

fn noise() -> AudioHandle {
    let mut state = 0x2545_f491_u64;
    let samples = (0..SAMPLE_RATE as usize)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            0.5 * ((state % 20_000) as f32 / 10_000.0 - 1.0)
        })
        .collect();
    AudioHandle::from_samples(samples, SAMPLE_RATE, 1)
}

/// Impulse train at 120 Hz with a -6 dB/octave source tilt, through five
/// two-pole resonators.
fn vowel(sample_rate: u32) -> AudioHandle {
    let rate = sample_rate as f64;
    let period = (rate / 120.0).round() as usize;
    let tilt = (-2.0 * PI * 50.0 / rate).exp();
    let mut previous = 0.0;
    let mut signal: Vec<f64> = (0..sample_rate as usize)
        .map(|i| {
            let pulse = if i % period == 0 { 1.0 } else { 0.0 };
            previous = pulse + tilt * previous;
            previous
        })
        .collect();
    let resonances = [
        (700.0, 80.0),
        (1200.0, 90.0),
        (2600.0, 120.0),
        (3500.0, 150.0),
        (4500.0, 200.0),
    ];
    for (frequency, bandwidth) in resonances {
        let r = (-PI * bandwidth / rate).exp();
        let a1 = 2.0 * r * (2.0 * PI * frequency / rate).cos();
        let a2 = -r * r;
        let (mut y1, mut y2) = (0.0, 0.0);
        for sample in signal.iter_mut() {
            let y = *sample + a1 * y1 + a2 * y2;
            y2 = y1;
            y1 = y;
            *sample = y;
        }
    }
    let peak = signal.iter().fold(0.0_f64, |max, s| max.max(s.abs()));
    let samples = signal.iter().map(|s| (0.8 * s / peak) as f32).collect();
    AudioHandle::from_samples(samples, sample_rate, 1)
}

#[test]
fn steady_tone_has_a_clean_voice_profile() {
    let audio = tone(200.0, 0.5);
    let settings = FeatureSettings::default();

    let f0 = features::mean_pitch(&audio, 0.2, 0.8, &settings).unwrap();
    assert_abs_diff_eq!(f0, 200.0, epsilon = 1.0);

    let jitter = features::jitter_local(&audio, 0.2, 0.8, &settings).unwrap();
    assert!(jitter < 0.01, "jitter={jitter}");
    let shimmer = features::shimmer_local(&audio, 0.2, 0.8, &settings).unwrap();
    assert!(shimmer < 0.05, "shimmer={shimmer}");

    let hnr = features::harmonics_to_noise(&audio, 0.2, 0.8, &settings).unwrap();
    assert!(hnr > 20.0, "hnr={hnr}");
}

#[test]
fn intensity_tracks_amplitude() {
    let settings = FeatureSettings::default();
    let loud = features::mean_intensity(&tone(200.0, 0.5), 0.2, 0.8, &settings).unwrap();
    let quiet = features::mean_intensity(&tone(200.0, 0.05), 0.2, 0.8, &settings).unwrap();
    assert!((80.0..88.0).contains(&loud), "loud={loud}");
    // A tenfold amplitude drop is 20 dB.
    assert_abs_diff_eq!(loud - quiet, 20.0, epsilon = 1.0);
}

#[test]
fn rms_of_a_sine_is_near_amplitude_over_root_two() {
    let settings = FeatureSettings::default();
    let rms = features::rms_energy(&tone(200.0, 0.5), 0.0, 1.0, &settings).unwrap();
    assert!((0.32..0.36).contains(&rms), "rms={rms}");
}

#[test]
fn spectral_shape_separates_tone_from_noise() {
    let settings = FeatureSettings::default();
    let pure = tone(1000.0, 0.5);
    let hiss = noise();

    let centroid = features::spectral_centroid(&pure, 0.0, 1.0, &settings).unwrap();
    assert_abs_diff_eq!(centroid, 1000.0, epsilon = 100.0);

    let tone_flatness = features::spectral_flatness(&pure, 0.0, 1.0, &settings).unwrap();
    let noise_flatness = features::spectral_flatness(&hiss, 0.0, 1.0, &settings).unwrap();
    assert!(noise_flatness > 10.0 * tone_flatness);

    let tone_rolloff = features::spectral_rolloff(&pure, 0.0, 1.0, &settings).unwrap();
    let noise_rolloff = features::spectral_rolloff(&hiss, 0.0, 1.0, &settings).unwrap();
    assert!(noise_rolloff > tone_rolloff);

    let low_tone = tone(500.0, 0.5);
    let tone_contrast = features::spectral_contrast(&low_tone, 0.0, 1.0, &settings).unwrap();
    let noise_contrast = features::spectral_contrast(&hiss, 0.0, 1.0, &settings).unwrap();
    assert!(tone_contrast > noise_contrast);

    let zcr = features::zero_crossing_rate(&pure, 0.0, 1.0, &settings).unwrap();
    assert_abs_diff_eq!(zcr, 2000.0, epsilon = 5.0);
}

#[test]
fn first_cepstral_coefficient_rises_with_level() {
    let settings = FeatureSettings::default();
    let silent = AudioHandle::from_samples(vec![0.0; SAMPLE_RATE as usize], SAMPLE_RATE, 1);
    let silence = features::mfcc1(&silent, 0.0, 1.0, &settings).unwrap();
    let quiet = features::mfcc1(&tone(300.0, 0.01), 0.0, 1.0, &settings).unwrap();
    let loud = features::mfcc1(&tone(300.0, 0.8), 0.0, 1.0, &settings).unwrap();
    assert!(silence < quiet, "silence={silence} quiet={quiet}");
    assert!(quiet < loud, "quiet={quiet} loud={loud}");
}

#[test]
fn formants_of_a_synthetic_vowel() {
    let audio = vowel(11_000);
    let settings = FeatureSettings::default();
    for mode in [FormantMode::Midpoint, FormantMode::Mean] {
        let [f1, f2, _] = features::formants(&audio, 0.3, 0.7, mode, &settings).unwrap();
        assert_abs_diff_eq!(f1.unwrap(), 700.0, epsilon = 100.0);
        assert_abs_diff_eq!(f2.unwrap(), 1200.0, epsilon = 150.0);
    }
}

#[test]
fn cepstral_peak_prominence_is_undefined() {
    let settings = FeatureSettings::default();
    assert!(features::cepstral_peak_prominence(&tone(200.0, 0.5), 0.0, 1.0, &settings).is_err());
}
