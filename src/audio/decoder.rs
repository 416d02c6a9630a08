use std::path::Path;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::slicer::extract_range;
use crate::error::{FeatureError, Result};
use crate::types::AudioData;

/// A fully decoded recording reduced to its first channel.
#[derive(Debug, Clone)]
pub struct AudioHandle {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: usize,
}

impl AudioHandle {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: usize) -> Self {
        Self {
            samples: Arc::from(samples),
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the source file (samples hold channel 0 only).
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.samples.len() as f64 / self.sample_rate as f64
        }
    }

    /// Samples between `start` and `end` seconds, clamped to the recording.
    pub fn extract(&self, start: f64, end: f64) -> AudioData {
        AudioData {
            samples: extract_range(&self.samples, self.sample_rate, start, end).to_vec(),
            sample_rate: self.sample_rate,
        }
    }

    pub fn full(&self) -> AudioData {
        AudioData {
            samples: self.samples.to_vec(),
            sample_rate: self.sample_rate,
        }
    }
}

/// Decode an audio file to mono f32 samples, keeping channel 0
pub fn decode_audio<P: AsRef<Path>>(path: P) -> Result<AudioHandle> {
    let path = path.as_ref();

    let file = std::fs::File::open(path).map_err(|err| FeatureError::decode(path, err))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probe_result = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| FeatureError::decode(path, format!("unsupported format: {err}")))?;

    let mut format = probe_result.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| FeatureError::decode(path, "no audio tracks found"))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| FeatureError::decode(path, "sample rate not specified"))?;
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| FeatureError::decode(path, format!("no decoder: {err}")))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(FeatureError::decode(path, err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(err)) => {
                warn!(path = %path.display(), error = err, "skipping corrupt packet");
                continue;
            }
            Err(err) => return Err(FeatureError::decode(path, err)),
        };

        let spec = *decoded.spec();
        let stride = spec.channels.count().max(1);
        channels = channels.max(stride);

        let mut sample_buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buffer.copy_interleaved_ref(decoded);
        samples.extend(sample_buffer.samples().iter().step_by(stride).copied());
    }

    if samples.is_empty() {
        return Err(FeatureError::decode(path, "file contains no samples"));
    }

    debug!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate,
        channels,
        "decoded audio"
    );
    Ok(AudioHandle::from_samples(samples, sample_rate, channels))
}
