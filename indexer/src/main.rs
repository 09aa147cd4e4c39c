use anyhow::{Context, Result};
use bassline_core::persist::save_index;
use bassline_core::{IndexBuilder, ResourceRecord, SongRecord};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bassline-indexer")]
#[command(about = "Build the full-text search index from producer batch files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index artifact from the songs and resources batches
    Build {
        /// Songs batch file: JSON object of song records
        #[arg(long)]
        songs: PathBuf,
        /// Resources batch file: JSON object with a "resources" array
        #[arg(long)]
        resources: PathBuf,
        /// Output artifact path
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { songs, resources, output } => build_index(&songs, &resources, &output),
    }
}

fn build_index(songs: &Path, resources: &Path, output: &Path) -> Result<()> {
    let mut builder = IndexBuilder::new();

    let songs_outcome = ingest_songs(&mut builder, songs)?;
    let resources_outcome = ingest_resources(&mut builder, resources)?;
    let skipped = songs_outcome.skipped + resources_outcome.skipped;
    tracing::info!(
        songs = songs_outcome.ingested,
        resources = resources_outcome.ingested,
        skipped,
        "ingested documents"
    );

    let index = builder.finish();
    tracing::info!(
        documents = index.stats.document_count,
        unique_words = index.stats.unique_word_count,
        occurrences = index.stats.total_occurrences,
        "index built"
    );

    let generated_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| String::new());
    save_index(output, &index, generated_at)?;
    tracing::info!(output = %output.display(), "index artifact written");
    Ok(())
}

#[derive(Debug, Default)]
struct BatchOutcome {
    ingested: usize,
    skipped: usize,
}

/// The songs batch is a JSON object keyed by producer-side page keys; only
/// the values are consumed. A record that fails to deserialize is skipped
/// with a warning and never aborts the batch.
fn ingest_songs(builder: &mut IndexBuilder, path: &Path) -> Result<BatchOutcome> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read songs batch at {}", path.display()))?;
    let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)
        .with_context(|| format!("malformed songs batch at {}", path.display()))?;

    let mut outcome = BatchOutcome::default();
    for (key, value) in entries {
        match serde_json::from_value::<SongRecord>(value) {
            Ok(record) => {
                builder.add_song(record)?;
                outcome.ingested += 1;
            }
            Err(err) => {
                tracing::warn!(%key, %err, "skipping malformed song record");
                outcome.skipped += 1;
            }
        }
    }
    Ok(outcome)
}

#[derive(Debug, Deserialize)]
struct ResourcesFile {
    #[serde(default)]
    resources: Vec<serde_json::Value>,
}

fn ingest_resources(builder: &mut IndexBuilder, path: &Path) -> Result<BatchOutcome> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read resources batch at {}", path.display()))?;
    let file: ResourcesFile = serde_json::from_str(&raw)
        .with_context(|| format!("malformed resources batch at {}", path.display()))?;

    let mut outcome = BatchOutcome::default();
    for (position, value) in file.resources.into_iter().enumerate() {
        match serde_json::from_value::<ResourceRecord>(value) {
            Ok(record) => {
                builder.add_resource(record)?;
                outcome.ingested += 1;
            }
            Err(err) => {
                tracing::warn!(position, %err, "skipping malformed resource record");
                outcome.skipped += 1;
            }
        }
    }
    Ok(outcome)
}
