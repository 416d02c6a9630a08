#![allow(dead_code)]

use std::f32::consts::PI;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

pub const SAMPLE_RATE: u32 = 16_000;

pub fn sine_wave(frequency: f32, seconds: f32, amplitude: f32) -> Vec<f32> {
    let len = (seconds * SAMPLE_RATE as f32) as usize;
    (0..len)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

/// Write mono 16-bit PCM.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).expect("create wav");
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}
