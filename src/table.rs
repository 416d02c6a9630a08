//! Feature tables: one row per annotated interval, one column per feature.

use serde::Serialize;
use tracing::info;

use crate::audio::AudioSource;
use crate::engine::FeatureEngine;
use crate::kind::FeatureKind;
use crate::stats::{summarize_nominal, summarize_numeric, CategoryCount, NumericSummary};
use crate::types::Recording;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub file_id: String,
    pub label: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    /// One entry per table column, in column order.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<FeatureRow>,
    #[serde(skip)]
    kinds: Vec<FeatureKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub feature: &'static str,
    pub summary: Option<NumericSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub labels: Vec<CategoryCount>,
    pub features: Vec<ColumnSummary>,
}

impl FeatureTable {
    /// Compute every feature in `kinds` for every interval of `recordings`.
    pub fn build<S: AudioSource>(
        engine: &mut FeatureEngine<S>,
        recordings: &[Recording],
        kinds: &[FeatureKind],
    ) -> Self {
        let mut rows = Vec::new();
        for recording in recordings {
            info!(
                file_id = %recording.file_id,
                path = %recording.audio_path.display(),
                intervals = recording.intervals.len(),
                "extracting features"
            );
            for interval in &recording.intervals {
                let values = kinds
                    .iter()
                    .map(|kind| {
                        engine.compute_feature_value(
                            *kind,
                            &recording.audio_path,
                            interval.start,
                            interval.end,
                            interval.duration(),
                        )
                    })
                    .collect();
                rows.push(FeatureRow {
                    file_id: interval.file_id.clone(),
                    label: interval.label.clone(),
                    start: interval.start,
                    end: interval.end,
                    duration: interval.duration(),
                    values,
                });
            }
            // Every value of this recording is cached by now.
            engine.release_audio(&recording.audio_path);
        }
        Self {
            columns: kinds.iter().map(|kind| kind.name()).collect(),
            rows,
            kinds: kinds.to_vec(),
        }
    }

    pub fn kinds(&self) -> &[FeatureKind] {
        &self.kinds
    }

    /// All values of one feature column, `None` if the table lacks it.
    pub fn column(&self, kind: FeatureKind) -> Option<Vec<Option<f64>>> {
        let index = self.kinds.iter().position(|k| *k == kind)?;
        Some(self.rows.iter().map(|row| row.values[index]).collect())
    }

    /// Label frequencies plus numeric statistics for every column.
    pub fn summarize(&self) -> TableSummary {
        let labels: Vec<&str> = self.rows.iter().map(|row| row.label.as_str()).collect();
        let features = self
            .kinds
            .iter()
            .map(|kind| ColumnSummary {
                feature: kind.name(),
                summary: self.column(*kind).and_then(|values| summarize_numeric(&values)),
            })
            .collect();
        TableSummary {
            labels: summarize_nominal(&labels),
            features,
        }
    }
}
