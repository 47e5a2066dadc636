//! PGN table pipeline
//!
//! Decodes a PGN file into a metadata table and a move table, cleans both,
//! writes them as CSV and, when `STOCKFISH_PATH` is set, adds engine
//! evaluations to the moves.

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use eval_worker::config::PipelineConfig;
use eval_worker::{run_with_stockfish, LogProgress};
use pgn_tables::clean::{clean_metadata, clean_moves};
use pgn_tables::extract::extract_tables;
use pgn_tables::table_io::CsvTable;
use pgn_tables::PgnFileDecoder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let config = PipelineConfig::load(std::env::args().nth(1))?;
    info!(
        pgn = %config.pgn_path.display(),
        output_dir = %config.output_dir.display(),
        "Config loaded"
    );

    let decoder = PgnFileDecoder::from_path(&config.pgn_path)
        .with_context(|| format!("Failed to open {}", config.pgn_path.display()))?;
    let source_file = config.pgn_path.display().to_string();
    let (metadata, moves) = extract_tables(decoder, &source_file, Utc::now);
    info!(games = metadata.len(), plies = moves.len(), "Tables extracted");

    let metadata = clean_metadata(&metadata, &config.metadata)?;
    let moves = clean_moves(&moves)?;
    info!(
        missing_rating = ?config.metadata.missing_rating,
        "Tables cleaned"
    );

    let metadata_path = config.output_dir.join("metadata.csv");
    let moves_path = config.output_dir.join("moves.csv");
    metadata.write_csv_path(&metadata_path)?;
    moves.write_csv_path(&moves_path)?;
    info!(
        metadata = %metadata_path.display(),
        moves = %moves_path.display(),
        "Tables written"
    );

    let Some(stockfish_path) = &config.stockfish_path else {
        info!("STOCKFISH_PATH not set, skipping engine evaluation");
        return Ok(());
    };

    let mut progress = LogProgress::new(config.progress_every);
    let (enriched, summary) = run_with_stockfish(
        stockfish_path,
        &config.engine,
        &moves,
        &config.merge,
        &mut progress,
    )
    .await?;

    let enriched_path = config.output_dir.join("moves_enriched.csv");
    enriched.write_csv_path(&enriched_path)?;
    info!(
        path = %enriched_path.display(),
        analysed = summary.analysed,
        skipped_illegal = summary.skipped_illegal,
        "Enriched moves written"
    );

    Ok(())
}
