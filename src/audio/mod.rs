pub mod decoder;
pub mod resample;
pub mod slicer;
pub mod store;

pub use decoder::{decode_audio, AudioHandle};
pub use store::{AudioSource, DecodedAudioStore, UncachedAudioSource};
