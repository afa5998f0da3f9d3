//! Template discovery strategies.
//!
//! A [`TemplateLocator`] turns a source into up to `limit` candidate template
//! paths. Two strategies exist:
//!
//! - [`SearchLocator`]: GitHub code search, one query per known filename,
//!   paged. Fast, but needs an authenticated caller.
//! - [`WalkLocator`]: breadth-first walk of the contents API from the
//!   source's subdirectory. Slow, works anonymously.
//!
//! [`FallbackLocator`] runs search and, on any search error, logs a warning
//! and walks instead. [`locator_for`] picks the strategy from configuration.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use archscan_core::models::{SourceSpec, TemplateHit};

use crate::config::{Config, TemplatesConfig};
use crate::error::{HarvestError, HarvestResult};
use crate::fetcher::{ContentFetcher, EntryType, RepoContent};

/// Finds candidate template paths in a repository.
#[async_trait]
pub trait TemplateLocator: Send + Sync {
    /// Up to `limit` unique paths, in discovery order.
    async fn locate(&self, source: &SourceSpec, limit: usize) -> HarvestResult<Vec<TemplateHit>>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    path: String,
}

/// Code search over the known template filenames.
pub struct SearchLocator {
    fetcher: Arc<ContentFetcher>,
    templates: TemplatesConfig,
}

impl SearchLocator {
    pub fn new(fetcher: Arc<ContentFetcher>, templates: &TemplatesConfig) -> Self {
        Self {
            fetcher,
            templates: templates.clone(),
        }
    }
}

#[async_trait]
impl TemplateLocator for SearchLocator {
    async fn locate(&self, source: &SourceSpec, limit: usize) -> HarvestResult<Vec<TemplateHit>> {
        let github = self.fetcher.github();
        let per_page = github.config().search_per_page;
        let max_pages = github.config().search_max_pages;
        let url = github.api_url("/search/code");

        let mut seen = HashSet::new();
        let mut hits = Vec::new();

        'filenames: for filename in self.templates.all_candidates() {
            let mut query = format!("repo:{} filename:{}", source.full_name(), filename);
            if let Some(subdir) = &source.subdir {
                query.push_str(&format!(" path:{}", subdir));
            }

            for page in 1..=max_pages {
                if hits.len() >= limit {
                    break 'filenames;
                }
                let params = vec![
                    ("q".to_string(), query.clone()),
                    ("page".to_string(), page.to_string()),
                    ("per_page".to_string(), per_page.to_string()),
                ];
                let Some(body) = github.get_json(&url, &params).await? else {
                    break;
                };
                let parsed: SearchPage =
                    serde_json::from_value(body).map_err(|e| HarvestError::Decode {
                        url: url.clone(),
                        message: format!("unexpected search response: {}", e),
                    })?;

                let count = parsed.items.len();
                for item in parsed.items {
                    if hits.len() >= limit {
                        break;
                    }
                    if seen.insert(item.path.clone()) {
                        hits.push(TemplateHit::new(item.path));
                    }
                }
                debug!(source = %source, filename = %filename, page, count, "search page");
                if count < per_page {
                    break;
                }
            }
        }

        hits.truncate(limit);
        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "search"
    }
}

/// Breadth-first walk of the contents API.
pub struct WalkLocator {
    fetcher: Arc<ContentFetcher>,
    templates: TemplatesConfig,
}

impl WalkLocator {
    pub fn new(fetcher: Arc<ContentFetcher>, templates: &TemplatesConfig) -> Self {
        Self {
            fetcher,
            templates: templates.clone(),
        }
    }
}

#[async_trait]
impl TemplateLocator for WalkLocator {
    async fn locate(&self, source: &SourceSpec, limit: usize) -> HarvestResult<Vec<TemplateHit>> {
        let mut hits = Vec::new();
        let mut queue = VecDeque::from([source.root().to_string()]);

        while hits.len() < limit {
            let Some(dir) = queue.pop_front() else {
                break;
            };
            let entries = match self.fetcher.fetch(&source.owner, &source.repo, &dir).await? {
                Some(RepoContent::Directory(entries)) => entries,
                Some(_) => {
                    debug!(source = %source, path = %dir, "not a directory; skipping");
                    continue;
                }
                None => {
                    debug!(source = %source, path = %dir, "directory not found");
                    continue;
                }
            };

            for entry in entries {
                match entry.entry_type {
                    EntryType::File if self.templates.is_candidate(&entry.name) => {
                        hits.push(TemplateHit::new(entry.path));
                        if hits.len() >= limit {
                            break;
                        }
                    }
                    EntryType::Dir => queue.push_back(entry.path),
                    _ => {}
                }
            }
        }

        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "walk"
    }
}

/// Search first; walk when search fails.
pub struct FallbackLocator {
    primary: Box<dyn TemplateLocator>,
    fallback: Box<dyn TemplateLocator>,
}

impl FallbackLocator {
    pub fn new(primary: Box<dyn TemplateLocator>, fallback: Box<dyn TemplateLocator>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl TemplateLocator for FallbackLocator {
    async fn locate(&self, source: &SourceSpec, limit: usize) -> HarvestResult<Vec<TemplateHit>> {
        match self.primary.locate(source, limit).await {
            Ok(hits) => Ok(hits),
            Err(e) => {
                warn!(
                    source = %source,
                    error = %e,
                    "{} failed; falling back to {}",
                    self.primary.name(),
                    self.fallback.name()
                );
                self.fallback.locate(source, limit).await
            }
        }
    }

    fn name(&self) -> &'static str {
        "search+walk"
    }
}

/// Search with walk fallback when a token is configured and the walk is
/// not forced; otherwise walk only.
pub fn locator_for(config: &Config, fetcher: Arc<ContentFetcher>) -> Box<dyn TemplateLocator> {
    let walk: Box<dyn TemplateLocator> =
        Box::new(WalkLocator::new(fetcher.clone(), &config.templates));
    if config.github.search_enabled() {
        let search = Box::new(SearchLocator::new(fetcher, &config.templates));
        Box::new(FallbackLocator::new(search, walk))
    } else {
        walk
    }
}
