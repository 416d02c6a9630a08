//! Per-feature memoisation of computed values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::FeatureError;
use crate::features::FORMANT_SLOTS;
use crate::kind::Partition;
use crate::types::FormantMode;

/// Interval bounds are quantised to this many steps per second.
const KEY_SCALE: f64 = 1e4;

pub type FormantTriple = [Option<f64>; FORMANT_SLOTS];

/// Identity of one computation: the file, the interval rounded to four
/// decimals, and the formant mode for formant entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: PathBuf,
    pub start: i64,
    pub end: i64,
    pub formant_mode: Option<FormantMode>,
}

impl CacheKey {
    pub fn new(path: &Path, start: f64, end: f64, formant_mode: Option<FormantMode>) -> Self {
        Self {
            path: path.to_path_buf(),
            start: quantise(start),
            end: quantise(end),
            formant_mode,
        }
    }
}

fn quantise(seconds: f64) -> i64 {
    (seconds * KEY_SCALE).round() as i64
}

/// Lookup counters of one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
struct Store<V> {
    entries: HashMap<CacheKey, V>,
    stats: CacheStats,
}

impl<V: Clone> Store<V> {
    /// Return the stored value or run `compute`. Values are stored unless
    /// `compute` reports a failure that may not recur.
    fn get_or_compute(
        &mut self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<V, FeatureError>,
        fallback: V,
    ) -> V {
        if let Some(value) = self.entries.get(&key) {
            self.stats.hits += 1;
            debug!(path = %key.path.display(), start = key.start, end = key.end, "cache hit");
            return value.clone();
        }
        self.stats.misses += 1;
        match compute() {
            Ok(value) => {
                self.entries.insert(key, value.clone());
                value
            }
            Err(err) if err.is_cacheable() => {
                self.entries.insert(key, fallback.clone());
                fallback
            }
            Err(_) => fallback,
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// One scalar store per partition plus the shared formant store.
#[derive(Debug, Default)]
pub struct FeatureCache {
    scalars: HashMap<Partition, Store<Option<f64>>>,
    formants: Store<FormantTriple>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `compute` yields the final (already rounded) value; deterministic
    /// failures are remembered as `None`.
    pub fn get_or_compute_scalar(
        &mut self,
        partition: Partition,
        key: CacheKey,
        compute: impl FnOnce() -> Result<Option<f64>, FeatureError>,
    ) -> Option<f64> {
        debug_assert_ne!(partition, Partition::Formants);
        self.scalars
            .entry(partition)
            .or_default()
            .get_or_compute(key, compute, None)
    }

    pub fn get_or_compute_formants(
        &mut self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<FormantTriple, FeatureError>,
    ) -> FormantTriple {
        self.formants.get_or_compute(key, compute, [None; FORMANT_SLOTS])
    }

    pub fn clear_all(&mut self) {
        for store in self.scalars.values_mut() {
            store.clear();
        }
        self.formants.clear();
    }

    pub fn clear_partition(&mut self, partition: Partition) {
        match partition {
            Partition::Formants => self.formants.clear(),
            other => {
                if let Some(store) = self.scalars.get_mut(&other) {
                    store.clear();
                }
            }
        }
    }

    /// Number of stored entries in `partition`.
    pub fn len(&self, partition: Partition) -> usize {
        match partition {
            Partition::Formants => self.formants.entries.len(),
            other => self.scalars.get(&other).map_or(0, |store| store.entries.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        Partition::ALL.into_iter().all(|partition| self.len(partition) == 0)
    }

    pub fn stats(&self, partition: Partition) -> CacheStats {
        match partition {
            Partition::Formants => self.formants.stats,
            other => self.scalars.get(&other).map_or_else(CacheStats::default, |store| store.stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(start: f64, end: f64) -> CacheKey {
        CacheKey::new(Path::new("a.wav"), start, end, None)
    }

    #[test]
    fn keys_quantise_to_four_decimals() {
        assert_eq!(key(0.50001, 1.0), key(0.50004, 1.0));
        assert_ne!(key(0.5001, 1.0), key(0.5002, 1.0));
        assert_ne!(
            CacheKey::new(Path::new("a.wav"), 0.5, 1.0, Some(FormantMode::Midpoint)),
            CacheKey::new(Path::new("a.wav"), 0.5, 1.0, Some(FormantMode::Mean)),
        );
    }

    #[test]
    fn computes_once_per_key() {
        let mut cache = FeatureCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            let value = cache.get_or_compute_scalar(Partition::Zcr, key(0.0, 1.0), || {
                calls += 1;
                Ok(Some(42.0))
            });
            assert_eq!(value, Some(42.0));
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.stats(Partition::Zcr), CacheStats { hits: 2, misses: 1 });
        assert_eq!(cache.len(Partition::Zcr), 1);
        assert_eq!(cache.len(Partition::Rms), 0);
    }

    #[test]
    fn decode_failures_are_retried() {
        let mut cache = FeatureCache::new();
        let failed = cache.get_or_compute_scalar(Partition::Rms, key(0.0, 1.0), || {
            Err(FeatureError::decode(Path::new("a.wav"), "missing"))
        });
        assert_eq!(failed, None);
        assert_eq!(cache.len(Partition::Rms), 0);

        let undefined = cache.get_or_compute_scalar(Partition::Rms, key(0.0, 1.0), || {
            Err(FeatureError::EmptySegment)
        });
        assert_eq!(undefined, None);
        assert_eq!(cache.len(Partition::Rms), 1);
    }

    #[test]
    fn clearing() {
        let mut cache = FeatureCache::new();
        cache.get_or_compute_scalar(Partition::Zcr, key(0.0, 1.0), || Ok(Some(1.0)));
        cache.get_or_compute_formants(key(0.0, 1.0), || Ok([Some(500.0), None, None]));
        assert!(!cache.is_empty());

        cache.clear_partition(Partition::Formants);
        assert_eq!(cache.len(Partition::Formants), 0);
        assert_eq!(cache.len(Partition::Zcr), 1);

        cache.clear_all();
        assert!(cache.is_empty());
    }
}
