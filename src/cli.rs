use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::kind::FeatureKind;
use crate::types::{FormantMode, IntervalRecord, Recording};

#[derive(Parser, Debug)]
#[command(
    name = "vocalfolder",
    version,
    about = "Acoustic feature extraction for labelled speech recordings"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract features for the intervals of one recording.
    Extract(ExtractArgs),
    /// Extract features for every <stem>.wav / <stem>.json pair in a directory.
    Batch(BatchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// Comma-separated feature names (default: all features).
    #[arg(long, value_delimiter = ',')]
    pub features: Vec<FeatureKind>,
    /// Formant sampling: midpoint or mean.
    #[arg(long = "formant-mode")]
    pub formant_mode: Option<FormantMode>,
    /// Engine configuration JSON file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Append label counts and per-feature statistics.
    #[arg(long)]
    pub summary: bool,
}

impl AnalysisArgs {
    pub fn kinds(&self) -> Vec<FeatureKind> {
        if self.features.is_empty() {
            FeatureKind::ALL.to_vec()
        } else {
            self.features.clone()
        }
    }

    /// Configuration file (or defaults) with the command-line formant mode
    /// taking precedence.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::load(self.config.as_deref())?;
        if let Some(mode) = self.formant_mode {
            config.formant_mode = mode;
        }
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Audio file to analyse.
    #[arg(value_name = "AUDIO")]
    pub audio: PathBuf,
    /// JSON array of {label, start, end} intervals.
    #[arg(long, value_name = "JSON")]
    pub intervals: PathBuf,
    /// Identifier reported in each row (default: the audio file stem).
    #[arg(long = "file-id")]
    pub file_id: Option<String>,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Directory holding paired audio and interval files.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

/// Read an interval list. Intervals with blank labels are skipped.
pub fn load_recording(audio: &Path, intervals: &Path, file_id: Option<&str>) -> Result<Recording> {
    let file_id = match file_id {
        Some(id) => id.to_string(),
        None => file_stem(audio)?,
    };
    let reader = File::open(intervals)
        .with_context(|| format!("Failed to open interval file {:?}", intervals))?;
    let records: Vec<IntervalRecord> = serde_json::from_reader(BufReader::new(reader))
        .with_context(|| format!("Failed to parse interval file {:?}", intervals))?;
    let mut kept = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        record
            .validate(index)
            .with_context(|| format!("Invalid interval in {:?}", intervals))?;
        if record.label.trim().is_empty() {
            continue;
        }
        kept.push(record.to_interval(&file_id));
    }
    Ok(Recording {
        file_id,
        audio_path: audio.to_path_buf(),
        intervals: kept,
    })
}

/// Pair every `<stem>.wav` in `dir` with `<stem>.json`, sorted by stem.
/// Audio files without an interval list are skipped.
pub fn discover_recordings(dir: &Path) -> Result<Vec<Recording>> {
    ensure!(dir.is_dir(), "Not a directory: {:?}", dir);
    let mut audio_files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory {:?}", dir))? {
        let path = entry?.path();
        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if path.is_file() && is_wav {
            audio_files.push(path);
        }
    }
    audio_files.sort();

    let mut recordings = Vec::new();
    for audio in audio_files {
        let intervals = audio.with_extension("json");
        if !intervals.is_file() {
            warn!(path = %audio.display(), "no interval file; skipping");
            continue;
        }
        recordings.push(load_recording(&audio, &intervals, None)?);
    }
    info!(dir = %dir.display(), recordings = recordings.len(), "discovered recordings");
    Ok(recordings)
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .with_context(|| format!("Audio path has no file name: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_extract_with_feature_list() {
        let cli = Cli::try_parse_from([
            "vocalfolder",
            "extract",
            "a.wav",
            "--intervals",
            "a.json",
            "--features",
            "Mean F0,zcr,F1",
            "--formant-mode",
            "mean",
        ])
        .unwrap();
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(
            args.analysis.kinds(),
            vec![FeatureKind::MeanF0, FeatureKind::Zcr, FeatureKind::F1]
        );
        assert_eq!(args.analysis.formant_mode, Some(FormantMode::Mean));
        assert_eq!(args.analysis.engine_config().unwrap().formant_mode, FormantMode::Mean);
        assert!(!args.analysis.summary);
    }

    #[test]
    fn batch_defaults_to_every_feature() {
        let cli = Cli::try_parse_from(["vocalfolder", "batch", "corpus", "--summary"]).unwrap();
        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(args.analysis.kinds().len(), FeatureKind::ALL.len());
        assert!(args.analysis.summary);
        assert_eq!(args.dir, PathBuf::from("corpus"));
    }

    #[test]
    fn rejects_unknown_feature() {
        let result = Cli::try_parse_from([
            "vocalfolder",
            "extract",
            "a.wav",
            "--intervals",
            "a.json",
            "--features",
            "loudness",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn loads_intervals_and_skips_blank_labels() {
        let dir = tempfile::tempdir().unwrap();
        let intervals = dir.path().join("spk.json");
        fs::write(
            &intervals,
            r#"[{"label": "a", "start": 0.0, "end": 0.4},
                {"text": "  ", "xmin": 0.4, "xmax": 0.6},
                {"label": "b", "start": 0.6, "end": 1.0}]"#,
        )
        .unwrap();
        let recording = load_recording(&dir.path().join("spk.wav"), &intervals, None).unwrap();
        assert_eq!(recording.file_id, "spk");
        let labels: Vec<_> = recording.intervals.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn discovery_pairs_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.wav", "a.wav", "lonely.wav", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        for name in ["a.json", "b.json"] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }
        let recordings = discover_recordings(dir.path()).unwrap();
        let ids: Vec<_> = recordings.iter().map(|r| r.file_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
