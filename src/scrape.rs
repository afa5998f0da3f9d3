//! `archscan scrape`: run the pipeline from the command line.
//!
//! Prints a short report (or the documents as JSON with `--json`) and,
//! with `--save`, upserts the batch into the configured SQLite store.

use anyhow::{bail, Result};
use std::sync::Arc;

use archscan_core::models::ArchitectureDocument;
use archscan_core::store::ArchitectureStore;

use crate::config::Config;
use crate::db;
use crate::persist::save_many;
use crate::pipeline::{parse_sources, Harvester};
use crate::sqlite_store::SqliteStore;

pub async fn run_scrape(
    config: &Config,
    limit: Option<usize>,
    sources: Vec<String>,
    save: bool,
    json: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(config.scrape.default_limit);
    if limit == 0 {
        bail!("--limit must be >= 1");
    }
    let store = if save {
        Some(SqliteStore::open(db::require(config)?).await?)
    } else {
        None
    };

    let raw = if sources.is_empty() {
        config.scrape.sources.clone()
    } else {
        sources
    };
    let specs = parse_sources(&raw)?;

    let harvester = Harvester::from_config(Arc::new(config.clone()))?;
    let report = harvester.run(&specs, limit).await?;

    let saved = save_many(
        store.as_ref().map(|s| s as &dyn ArchitectureStore),
        &report.documents,
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.documents)?);
        return Ok(());
    }

    println!("scrape ({})", harvester.strategy());
    println!("  sources: {}", specs.len());
    println!("  documents: {}", report.documents.len());
    println!("  skipped directories: {}", report.skipped.len());
    if save {
        println!("  saved: {}", saved);
    }
    println!("  batch: {}", report.created_at);
    for doc in &report.documents {
        print_summary(doc);
    }
    println!("ok");
    Ok(())
}

fn print_summary(doc: &ArchitectureDocument) {
    println!(
        "  - {} [{}] {}/{}",
        doc.name, doc.resource_count, doc.quickstart_dir, doc.template_file
    );
}
