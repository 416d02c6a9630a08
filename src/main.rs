use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use vocalfolder::cli::{discover_recordings, load_recording, AnalysisArgs, Cli, Command};
use vocalfolder::table::{FeatureTable, TableSummary};
use vocalfolder::types::Recording;
use vocalfolder::FeatureEngine;

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    table: &'a FeatureTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<TableSummary>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Extract(args) => {
            let recording = load_recording(&args.audio, &args.intervals, args.file_id.as_deref())
                .context("Failed to load intervals")?;
            run(&[recording], &args.analysis)
        }
        Command::Batch(args) => {
            let recordings = discover_recordings(&args.dir)?;
            run(&recordings, &args.analysis)
        }
    }
}

fn run(recordings: &[Recording], analysis: &AnalysisArgs) -> Result<()> {
    let config = analysis
        .engine_config()
        .context("Failed to load engine configuration")?;
    let mut engine = FeatureEngine::from_config(&config);
    let kinds = analysis.kinds();
    info!(
        recordings = recordings.len(),
        features = kinds.len(),
        formant_mode = %engine.formant_mode(),
        "starting extraction"
    );

    let table = FeatureTable::build(&mut engine, recordings, &kinds);
    let report = Report {
        table: &table,
        summary: analysis.summary.then(|| table.summarize()),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &report).context("Failed to write report")?;
    writeln!(out)?;
    info!(rows = table.rows.len(), "extraction complete");
    Ok(())
}
