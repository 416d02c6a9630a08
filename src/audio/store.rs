use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::decoder::{decode_audio, AudioHandle};
use crate::error::Result;

/// Supplies decoded audio to the feature engine.
pub trait AudioSource {
    fn load(&mut self, path: &Path) -> Result<Arc<AudioHandle>>;

    /// Drop the retained audio of one file, if any.
    fn release(&mut self, _path: &Path) {}

    /// Drop any retained audio. Called whenever the feature caches are cleared.
    fn clear(&mut self) {}
}

/// Decodes files from disk and keeps each decoded buffer for reuse, so the
/// same recording is decoded once no matter how many features read it.
#[derive(Debug, Default)]
pub struct DecodedAudioStore {
    handles: HashMap<PathBuf, Arc<AudioHandle>>,
}

impl DecodedAudioStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl AudioSource for DecodedAudioStore {
    fn load(&mut self, path: &Path) -> Result<Arc<AudioHandle>> {
        if let Some(handle) = self.handles.get(path) {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(decode_audio(path)?);
        debug!(path = %path.display(), "retaining decoded audio");
        self.handles.insert(path.to_path_buf(), Arc::clone(&handle));
        Ok(handle)
    }

    fn release(&mut self, path: &Path) {
        if self.handles.remove(path).is_some() {
            debug!(path = %path.display(), "released decoded audio");
        }
    }

    fn clear(&mut self) {
        self.handles.clear();
    }
}

/// Decodes on every request without retaining anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct UncachedAudioSource;

impl AudioSource for UncachedAudioSource {
    fn load(&mut self, path: &Path) -> Result<Arc<AudioHandle>> {
        decode_audio(path).map(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_loads_are_not_retained() {
        let mut store = DecodedAudioStore::new();
        assert!(store.load(Path::new("missing/file.wav")).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn release_drops_only_the_named_file() {
        let mut store = DecodedAudioStore::new();
        let handle = Arc::new(AudioHandle::from_samples(vec![0.0; 16], 16_000, 1));
        store.handles.insert(PathBuf::from("a.wav"), Arc::clone(&handle));
        store.handles.insert(PathBuf::from("b.wav"), handle);
        store.release(Path::new("a.wav"));
        store.release(Path::new("missing.wav"));
        assert_eq!(store.len(), 1);
        assert!(store.handles.contains_key(Path::new("b.wav")));
    }
}
