//! Architecture discovery pipeline.
//!
//! For each source, in order: locate up to `per_source` template hits,
//! resolve the template in each hit's directory, fetch the sidecar
//! metadata, and build one [`ArchitectureDocument`]. The run stops as soon
//! as `limit` documents exist, even in the middle of a source.
//!
//! The global `limit` is split evenly with floor division and a minimum of
//! one per source. Quota a source leaves unused is not handed to the next.
//!
//! Every document of one run carries the same `created_at` stamp, which the
//! façade uses to read back the batch it just stored.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};

use archscan_core::document::{build_document, LinkBase};
use archscan_core::models::{ArchitectureDocument, SourceSpec, TemplateHit};

use crate::config::Config;
use crate::error::{HarvestError, HarvestResult};
use crate::fetcher::ContentFetcher;
use crate::github::{GitHubClient, HttpClient};
use crate::locator::{locator_for, TemplateLocator};
use crate::resolver::TemplateResolver;

/// What happened to one template hit.
#[derive(Debug, Clone, PartialEq)]
pub enum HitOutcome {
    Built(Box<ArchitectureDocument>),
    /// No candidate in the hit's directory was acceptable.
    NoTemplate { repo: String, dir: String },
}

/// Result of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub created_at: String,
    pub documents: Vec<ArchitectureDocument>,
    /// `(repo, dir)` of hits whose directory had no usable template.
    pub skipped: Vec<(String, String)>,
}

/// Drives locator, resolver, and document assembly over a list of sources.
pub struct Harvester {
    config: Arc<Config>,
    locator: Box<dyn TemplateLocator>,
    resolver: TemplateResolver,
    links: LinkBase,
}

impl Harvester {
    pub fn new(config: Arc<Config>, github: Arc<GitHubClient>) -> Self {
        let fetcher = Arc::new(ContentFetcher::new(github));
        Self {
            locator: locator_for(&config, fetcher.clone()),
            resolver: TemplateResolver::new(fetcher, &config.templates),
            links: config.github.link_base(),
            config,
        }
    }

    /// Harvester over a real HTTP transport.
    pub fn from_config(config: Arc<Config>) -> HarvestResult<Self> {
        let github = GitHubClient::from_config(&config.github)?;
        Ok(Self::new(config, Arc::new(github)))
    }

    /// Harvester over a caller-supplied transport.
    pub fn with_http(config: Arc<Config>, http: Arc<dyn HttpClient>) -> Self {
        let github = GitHubClient::new(http, &config.github);
        Self::new(config, Arc::new(github))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Name of the location strategy in use.
    pub fn strategy(&self) -> &'static str {
        self.locator.name()
    }

    /// Discover up to `limit` documents across `sources`, which default to
    /// the configured list when absent or empty. All returned documents
    /// share one `created_at`.
    pub async fn fetch_architectures(
        &self,
        limit: usize,
        sources: Option<&[String]>,
    ) -> HarvestResult<Vec<ArchitectureDocument>> {
        let raw = match sources {
            Some(list) if !list.is_empty() => list,
            _ => self.config.scrape.sources.as_slice(),
        };
        let specs = parse_sources(raw)?;
        Ok(self.run(&specs, limit).await?.documents)
    }

    /// Run the pipeline over parsed sources.
    pub async fn run(&self, sources: &[SourceSpec], limit: usize) -> HarvestResult<RunReport> {
        if limit == 0 {
            return Err(HarvestError::InvalidLimit("limit must be >= 1".to_string()));
        }
        let mut report = RunReport {
            created_at: batch_stamp(Utc::now()),
            ..Default::default()
        };
        if sources.is_empty() {
            info!("no sources to scan");
            return Ok(report);
        }

        let per_source = per_source_limit(limit, sources.len());
        info!(
            sources = sources.len(),
            limit,
            per_source,
            strategy = self.locator.name(),
            "starting discovery"
        );

        'sources: for source in sources {
            let hits = self.locator.locate(source, per_source).await?;
            info!(source = %source, hits = hits.len(), "located templates");

            for hit in &hits {
                if report.documents.len() >= limit {
                    break 'sources;
                }
                match self.process_hit(source, hit).await? {
                    HitOutcome::Built(mut doc) => {
                        doc.created_at = Some(report.created_at.clone());
                        report.documents.push(*doc);
                    }
                    HitOutcome::NoTemplate { repo, dir } => {
                        debug!(%repo, %dir, "no usable template; skipping");
                        report.skipped.push((repo, dir));
                    }
                }
            }
            if report.documents.len() >= limit {
                break;
            }
        }

        info!(
            documents = report.documents.len(),
            skipped = report.skipped.len(),
            "discovery finished"
        );
        Ok(report)
    }

    async fn process_hit(&self, source: &SourceSpec, hit: &TemplateHit) -> HarvestResult<HitOutcome> {
        let dir = hit.directory();
        let Some(template) = self.resolver.resolve(&source.owner, &source.repo, dir).await? else {
            return Ok(HitOutcome::NoTemplate {
                repo: source.full_name(),
                dir: dir.to_string(),
            });
        };
        let sidecar = self
            .resolver
            .fetch_sidecar(&source.owner, &source.repo, dir)
            .await?;
        let doc = build_document(source, dir, &template, sidecar, &self.links);
        Ok(HitOutcome::Built(Box::new(doc)))
    }
}

/// Parse every source up front so a typo fails the run before any request.
pub fn parse_sources(raw: &[String]) -> HarvestResult<Vec<SourceSpec>> {
    raw.iter()
        .map(|s| {
            SourceSpec::parse(s).map_err(|e| HarvestError::InvalidSource(format!("{}", e)))
        })
        .collect()
}

/// `max(1, limit / sources)`.
pub fn per_source_limit(limit: usize, sources: usize) -> usize {
    if sources == 0 {
        return limit;
    }
    (limit / sources).max(1)
}

/// RFC 3339 UTC with microseconds, e.g. `2024-05-01T12:00:00.123456Z`.
pub fn batch_stamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}
