//! Feature computation library: one function per measurement, each taking a
//! decoded recording, an interval in seconds and the algorithm settings.

mod contour;
mod formant;
mod frames;
mod harmonicity;
mod intensity;
mod mfcc;
mod periodicity;
mod pitch;
mod spectral;
mod temporal;
mod voice;

use crate::audio::AudioHandle;
use crate::config::FeatureSettings;
use crate::error::{FeatureError, Result};
use crate::types::{AudioData, FormantMode};

pub use formant::FORMANT_SLOTS;

/// Signature shared by every scalar measurement.
pub type ScalarFn = fn(&AudioHandle, f64, f64, &FeatureSettings) -> Result<f64>;

/// Number of evenly spaced points averaged in [`FormantMode::Mean`].
const FORMANT_MEAN_POINTS: usize = 5;

fn segment(audio: &AudioHandle, start: f64, end: f64) -> Result<AudioData> {
    let data = audio.extract(start, end);
    if data.samples.is_empty() {
        return Err(FeatureError::EmptySegment);
    }
    Ok(data)
}

fn spectrogram(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<spectral::Spectrogram> {
    let data = segment(audio, start, end)?;
    spectral::Spectrogram::compute(
        &data.samples_f64(),
        data.sample_rate,
        settings.frame_length,
        settings.hop_length,
    )
}

/// Intensity (dB) of the whole recording, read at the interval midpoint.
pub fn mid_intensity(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    let full = audio.full();
    let contour = intensity::intensity_contour(
        &full.samples_f64(),
        full.sample_rate,
        settings.intensity_floor,
        settings.intensity_time_step,
    )?;
    contour
        .value_at(0.5 * (start + end))
        .filter(|db| *db > 0.0)
        .ok_or(FeatureError::Undefined("no positive intensity at midpoint"))
}

/// Mean of the strictly positive intensity frames (dB) inside the interval.
pub fn mean_intensity(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    let data = segment(audio, start, end)?;
    let floor = settings.mean_intensity_floor;
    let samples = data.samples_f64();
    let contour = intensity::intensity_contour(&samples, data.sample_rate, floor, 0.8 / floor)?;
    let positive: Vec<f64> = contour.defined().filter(|db| *db > 0.0).collect();
    if positive.is_empty() {
        return Err(FeatureError::Undefined("no positive intensity frames"));
    }
    Ok(frames::mean(&positive))
}

pub fn zero_crossing_rate(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    _settings: &FeatureSettings,
) -> Result<f64> {
    let data = segment(audio, start, end)?;
    temporal::zero_crossing_rate(&data.samples_f64(), data.sample_rate)
}

pub fn spectral_centroid(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    spectrogram(audio, start, end, settings)?.centroid()
}

pub fn spectral_rolloff(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    spectrogram(audio, start, end, settings)?.rolloff(settings.rolloff_percent)
}

pub fn spectral_bandwidth(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    spectrogram(audio, start, end, settings)?.bandwidth(settings.bandwidth_power)
}

pub fn spectral_flatness(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    spectrogram(audio, start, end, settings)?.flatness()
}

pub fn spectral_contrast(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    spectrogram(audio, start, end, settings)?
        .contrast(settings.contrast_floor, settings.contrast_bands)
}

/// Mean of the first MFCC over the interval.
pub fn mfcc1(audio: &AudioHandle, start: f64, end: f64, settings: &FeatureSettings) -> Result<f64> {
    let spectrogram = spectrogram(audio, start, end, settings)?;
    let mfcc = mfcc::mfcc_frames(
        &spectrogram,
        settings.frame_length,
        settings.mel_bands,
        settings.mfcc_count,
    )?;
    mfcc::first_coefficient_mean(&mfcc)
}

pub fn rms_energy(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    let data = segment(audio, start, end)?;
    temporal::rms_energy(&data.samples_f64(), settings.frame_length, settings.hop_length)
}

/// Mean fundamental frequency (Hz) of the voiced frames.
pub fn mean_pitch(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    let data = segment(audio, start, end)?;
    let contour = pitch::pitch_contour(
        &data.samples_f64(),
        data.sample_rate,
        settings.pitch_floor,
        settings.pitch_ceiling,
    )?;
    let voiced: Vec<f64> = contour.defined().collect();
    if voiced.is_empty() {
        return Err(FeatureError::Undefined("no voiced frames"));
    }
    Ok(frames::mean(&voiced))
}

fn pulses(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<Vec<voice::Pulse>> {
    let data = segment(audio, start, end)?;
    let samples = data.samples_f64();
    let contour = pitch::pitch_contour(
        &samples,
        data.sample_rate,
        settings.pitch_floor,
        settings.pitch_ceiling,
    )?;
    Ok(voice::glottal_pulses(&samples, data.sample_rate, &contour))
}

pub fn jitter_local(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    voice::jitter_local(&pulses(audio, start, end, settings)?)
}

pub fn shimmer_local(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    voice::shimmer_local(&pulses(audio, start, end, settings)?)
}

/// Harmonics-to-noise ratio (dB) at the middle of the extracted segment.
pub fn harmonics_to_noise(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    settings: &FeatureSettings,
) -> Result<f64> {
    let data = segment(audio, start, end)?;
    let contour = harmonicity::harmonicity_contour(
        &data.samples_f64(),
        data.sample_rate,
        settings.hnr_floor,
        settings.hnr_time_step,
    )?;
    contour
        .value_at(0.5 * data.duration())
        .ok_or(FeatureError::Undefined("harmonicity undefined at midpoint"))
}

/// Cepstral peak prominence is not measured; always undefined.
pub fn cepstral_peak_prominence(
    _audio: &AudioHandle,
    _start: f64,
    _end: f64,
    _settings: &FeatureSettings,
) -> Result<f64> {
    Err(FeatureError::Undefined("cepstral peak prominence is not implemented"))
}

/// F1–F3 (Hz) from a formant track of the whole recording, read at the
/// interval midpoint or averaged over evenly spaced points. A slot with no
/// defined reading stays `None`.
pub fn formants(
    audio: &AudioHandle,
    start: f64,
    end: f64,
    mode: FormantMode,
    settings: &FeatureSettings,
) -> Result<[Option<f64>; FORMANT_SLOTS]> {
    let full = audio.full();
    let track = formant::formant_track(&full.samples_f64(), full.sample_rate, settings)?;
    Ok(read_formants(&track, start, end, mode))
}

fn read_formants(
    track: &formant::FormantTrack,
    start: f64,
    end: f64,
    mode: FormantMode,
) -> [Option<f64>; FORMANT_SLOTS] {
    let times: Vec<f64> = match mode {
        FormantMode::Midpoint => vec![0.5 * (start + end)],
        FormantMode::Mean => {
            let step = (end - start) / (FORMANT_MEAN_POINTS - 1) as f64;
            (0..FORMANT_MEAN_POINTS).map(|i| start + i as f64 * step).collect()
        }
    };
    let mut values = [None; FORMANT_SLOTS];
    for (slot, value) in values.iter_mut().enumerate() {
        let readings: Vec<f64> = times.iter().filter_map(|t| track.value_at(slot, *t)).collect();
        if !readings.is_empty() {
            *value = Some(frames::mean(&readings));
        }
    }
    values
}
