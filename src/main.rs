mod analyzer;
mod config;
mod model;
mod normalizer;
mod parser;
mod pipeline;
mod scraper;
mod utils;
mod writer;

use crate::analyzer::{Analyzer, AnalyzerImpl};
use crate::config::{ConfigError, load_config};
use crate::model::{OutputError, ScraperError};
use crate::normalizer::RecordTable;
use crate::parser::ListingParser;
use crate::pipeline::Pipeline;
use crate::scraper::ScraperImpl;

use chrono::Local;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot build HTTP client: {0}")]
    Client(#[from] ScraperError),
    #[error("output failed: {0}")]
    Output(#[from] OutputError),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Panic occurred: {:?}", panic_info);
    }));

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = load_config("config.json")?;
    info!(
        "Tracking {} categories from {} since {}",
        config.categories.len(),
        config.base_url,
        config.start_date
    );

    let scraper = ScraperImpl::new(&config)?;
    let parser = ListingParser::new(config.categories.clone());
    let analyzer = AnalyzerImpl::new();

    // Earlier runs are the starting table; new observations are merged on top
    let previous = writer::read_table(&config.output.table_path)?;
    info!("Loaded {} records from previous runs", previous.len());
    let mut table = RecordTable::from_records(previous);

    let today = Local::now().date_naive();
    Pipeline::new(&config, &scraper, &parser).run(&mut table, today).await;

    if table.is_empty() {
        warn!("No records collected; writing empty outputs");
    }
    info!("Analyzing ASP trends over {} records...", table.len());
    let analysis = analyzer.analyze(table.records());
    if let Some((month, asp)) = analysis.overall_asp_trends.monthly_asp.iter().next_back() {
        info!("Latest month {}: ASP {:.2} over {} products", month, asp.asp, asp.count);
    }

    writer::write_table(&config.output.table_path, table.records())?;
    writer::write_analysis(&config.output.analysis_path, &analysis)?;
    Ok(())
}
