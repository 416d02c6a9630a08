//! Feature dispatch: maps a feature kind to its computation, consults the
//! cache, and converts every failure into an absent value.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioSource, DecodedAudioStore};
use crate::cache::{CacheKey, CacheStats, FeatureCache, FormantTriple};
use crate::config::{EngineConfig, FeatureSettings};
use crate::error::FeatureError;
use crate::features;
use crate::kind::{Computation, FeatureKind, Partition};
use crate::types::FormantMode;

/// Computes features for (file, interval) pairs, remembering every result.
///
/// One engine is meant to live for a whole analysis session; its caches are
/// only dropped explicitly, when the formant mode changes, or when the
/// settings change.
pub struct FeatureEngine<S: AudioSource = DecodedAudioStore> {
    source: S,
    cache: FeatureCache,
    formant_mode: FormantMode,
    settings: FeatureSettings,
}

impl FeatureEngine<DecodedAudioStore> {
    pub fn new() -> Self {
        Self::from_config(&EngineConfig::default())
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_source(DecodedAudioStore::new(), config)
    }
}

impl Default for FeatureEngine<DecodedAudioStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: AudioSource> FeatureEngine<S> {
    pub fn with_source(source: S, config: &EngineConfig) -> Self {
        Self {
            source,
            cache: FeatureCache::new(),
            formant_mode: config.formant_mode,
            settings: config.settings.clone(),
        }
    }

    /// Value of `kind` for the interval `[start, end]` of the file at `path`.
    ///
    /// `Duration` echoes `duration` without touching the audio. Every other
    /// failure, including a panic inside a computation, yields `None`.
    pub fn compute_feature_value(
        &mut self,
        kind: FeatureKind,
        path: &Path,
        start: f64,
        end: f64,
        duration: f64,
    ) -> Option<f64> {
        if let Computation::Passthrough = kind.computation() {
            return Some(duration);
        }
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(kind, path, start, end)));
        outcome.unwrap_or_else(|_| {
            error!(
                feature = kind.name(),
                path = %path.display(),
                start,
                end,
                "feature computation panicked"
            );
            None
        })
    }

    /// As [`compute_feature_value`](Self::compute_feature_value), looked up by
    /// display name. Unknown names yield `None`.
    pub fn compute_named_value(
        &mut self,
        name: &str,
        path: &Path,
        start: f64,
        end: f64,
        duration: f64,
    ) -> Option<f64> {
        match FeatureKind::from_name(name) {
            Some(kind) => self.compute_feature_value(kind, path, start, end, duration),
            None => {
                warn!(feature = name, "unknown feature");
                None
            }
        }
    }

    /// F1, F2 and F3 under the current formant mode.
    pub fn formants(&mut self, path: &Path, start: f64, end: f64) -> FormantTriple {
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.formant_triple(path, start, end)));
        outcome.unwrap_or_else(|_| {
            error!(path = %path.display(), start, end, "formant computation panicked");
            [None; features::FORMANT_SLOTS]
        })
    }

    pub fn formant_mode(&self) -> FormantMode {
        self.formant_mode
    }

    /// Switch how formants are sampled. Changing the mode drops all cached
    /// formant triples.
    pub fn set_formant_mode(&mut self, mode: FormantMode) {
        if mode != self.formant_mode {
            self.cache.clear_partition(Partition::Formants);
            info!(from = %self.formant_mode, to = %mode, "formant mode changed");
        }
        self.formant_mode = mode;
    }

    pub fn settings(&self) -> &FeatureSettings {
        &self.settings
    }

    /// Replace the algorithm settings. Every cached value is dropped, since
    /// all of them depend on the settings.
    pub fn set_settings(&mut self, settings: FeatureSettings) -> Result<()> {
        settings.validate()?;
        if settings != self.settings {
            self.settings = settings;
            self.clear_all_feature_caches();
        }
        Ok(())
    }

    /// Drop the decoded audio of `path` while keeping its cached values.
    pub fn release_audio(&mut self, path: &Path) {
        self.source.release(path);
    }

    /// Drop every cached feature value and any retained decoded audio.
    pub fn clear_all_feature_caches(&mut self) {
        self.cache.clear_all();
        self.source.clear();
        info!("cleared all feature caches");
    }

    pub fn cache(&self) -> &FeatureCache {
        &self.cache
    }

    pub fn cache_stats(&self, partition: Partition) -> CacheStats {
        self.cache.stats(partition)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn dispatch(&mut self, kind: FeatureKind, path: &Path, start: f64, end: f64) -> Option<f64> {
        match kind.computation() {
            Computation::Passthrough => None,
            Computation::Formant(slot) => {
                self.formant_triple(path, start, end).get(slot).copied().flatten()
            }
            Computation::Scalar(compute) => {
                let partition = kind.partition()?;
                let key = CacheKey::new(path, start, end, None);
                let source = &mut self.source;
                let settings = &self.settings;
                self.cache.get_or_compute_scalar(partition, key, || {
                    let audio = source
                        .load(path)
                        .map_err(|err| report(kind.name(), path, start, end, err))?;
                    compute(&audio, start, end, settings)
                        .and_then(|value| round(value, kind.decimals()))
                        .map(Some)
                        .map_err(|err| report(kind.name(), path, start, end, err))
                })
            }
        }
    }

    fn formant_triple(&mut self, path: &Path, start: f64, end: f64) -> FormantTriple {
        let mode = self.formant_mode;
        let key = CacheKey::new(path, start, end, Some(mode));
        let source = &mut self.source;
        let settings = &self.settings;
        self.cache.get_or_compute_formants(key, || {
            let audio = source.load(path).map_err(|err| report("Formants", path, start, end, err))?;
            let triple = features::formants(&audio, start, end, mode, settings)
                .map_err(|err| report("Formants", path, start, end, err))?;
            debug!(path = %path.display(), start, end, mode = %mode, ?triple, "formants");
            Ok(triple.map(|value| value.and_then(|hz| round(hz, 2).ok())))
        })
    }
}

/// Round to `decimals` places; non-finite values are undefined.
fn round(value: f64, decimals: i32) -> Result<f64, FeatureError> {
    if !value.is_finite() {
        return Err(FeatureError::Undefined("non-finite result"));
    }
    let scale = 10f64.powi(decimals);
    Ok((value * scale).round() / scale)
}

fn report(feature: &str, path: &Path, start: f64, end: f64, err: FeatureError) -> FeatureError {
    warn!(feature, path = %path.display(), start, end, error = %err, "feature unavailable");
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_contract() {
        assert_eq!(round(1.23456, 2).unwrap(), 1.23);
        assert_eq!(round(0.012345, 4).unwrap(), 0.0123);
        assert_eq!(round(-2.005001, 2).unwrap(), -2.01);
        assert!(round(f64::NAN, 2).is_err());
        assert!(round(f64::INFINITY, 4).is_err());
    }

    #[test]
    fn duration_needs_no_audio() {
        let mut engine = FeatureEngine::new();
        let path = Path::new("nowhere.wav");
        let value = engine.compute_feature_value(FeatureKind::Duration, path, 0.0, 1.0, 1.0);
        assert_eq!(value, Some(1.0));
        assert!(engine.source().is_empty());
    }

    #[test]
    fn unknown_names_are_absent() {
        let mut engine = FeatureEngine::new();
        let path = Path::new("a.wav");
        assert_eq!(engine.compute_named_value("Loudness", path, 0.0, 1.0, 1.0), None);
        assert_eq!(engine.compute_named_value("Duration", path, 0.0, 1.0, 1.0), Some(1.0));
    }

    #[test]
    fn mode_switch_updates_mode() {
        let mut engine = FeatureEngine::new();
        engine.set_formant_mode(FormantMode::Mean);
        assert_eq!(engine.formant_mode(), FormantMode::Mean);
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut engine = FeatureEngine::new();
        let settings = FeatureSettings {
            rolloff_percent: 1.5,
            ..FeatureSettings::default()
        };
        assert!(engine.set_settings(settings).is_err());
        assert_eq!(engine.settings().rolloff_percent, 0.85);
    }
}
