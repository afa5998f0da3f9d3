use anyhow::Result;

use archscan_core::models::SourceSpec;

use crate::config::Config;

/// One configured source and whether it parses.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatus {
    pub raw: String,
    pub parsed: Option<SourceSpec>,
    pub error: Option<String>,
}

pub fn source_statuses(config: &Config) -> Vec<SourceStatus> {
    config
        .scrape
        .sources
        .iter()
        .map(|raw| match SourceSpec::parse(raw) {
            Ok(spec) => SourceStatus {
                raw: raw.clone(),
                parsed: Some(spec),
                error: None,
            },
            Err(e) => SourceStatus {
                raw: raw.clone(),
                parsed: None,
                error: Some(e.to_string()),
            },
        })
        .collect()
}

/// Name of the location strategy the configuration selects.
pub fn strategy_label(config: &Config) -> &'static str {
    if config.github.search_enabled() {
        "search+walk"
    } else if config.github.token().is_some() {
        "walk (forced)"
    } else {
        "walk (no token)"
    }
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<48} {:<8} SUBDIR", "SOURCE", "STATUS");
    for status in source_statuses(config) {
        match (&status.parsed, &status.error) {
            (Some(spec), _) => println!(
                "{:<48} {:<8} {}",
                spec.full_name(),
                "OK",
                spec.subdir.as_deref().unwrap_or("/")
            ),
            (None, err) => println!(
                "{:<48} {:<8} {}",
                status.raw,
                "INVALID",
                err.as_deref().unwrap_or("")
            ),
        }
    }
    println!();
    println!("strategy: {}", strategy_label(config));
    match &config.db {
        Some(db) => println!("store:    {}", db.path.display()),
        None => println!("store:    none"),
    }

    Ok(())
}
