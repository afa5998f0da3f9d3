//! Storage abstraction for architecture documents.
//!
//! The [`ArchitectureStore`] trait is the document-store capability the
//! pipeline and the HTTP façade need: a natural-key upsert and a filtered,
//! sorted, paginated find. Backends: [`memory::InMemoryStore`] here, and the
//! SQLite store in the `archscan` crate.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::cmp::Ordering;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ArchitectureDocument;

/// Sortable fields for [`ArchitectureQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    ResourceCount,
}

impl SortKey {
    /// Parse a user-supplied sort field. Unknown fields sort by name.
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "resource_count" => SortKey::ResourceCount,
            _ => SortKey::Name,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::ResourceCount => "resource_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `asc` (any case) is ascending; anything else is descending.
    pub fn parse_lenient(s: &str) -> Self {
        if s.eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }
}

/// Filter, sort, and page parameters for [`ArchitectureStore::find`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArchitectureQuery {
    /// Case-insensitive substring match on `name`.
    pub name_contains: Option<String>,
    pub min_resources: Option<usize>,
    /// Exact match on the batch stamp.
    pub created_at: Option<String>,
    pub sort_by: SortKey,
    pub direction: SortDirection,
    pub skip: usize,
    pub limit: usize,
}

impl Default for ArchitectureQuery {
    fn default() -> Self {
        Self {
            name_contains: None,
            min_resources: None,
            created_at: None,
            sort_by: SortKey::Name,
            direction: SortDirection::Asc,
            skip: 0,
            limit: 25,
        }
    }
}

impl ArchitectureQuery {
    /// Query for every document stamped by one pipeline run.
    pub fn batch(created_at: impl Into<String>, limit: usize) -> Self {
        Self {
            created_at: Some(created_at.into()),
            limit,
            ..Default::default()
        }
    }

    /// Whether a document passes the filters (sorting and paging aside).
    pub fn matches(&self, doc: &ArchitectureDocument) -> bool {
        if let Some(needle) = &self.name_contains {
            if !doc.name.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(min) = self.min_resources {
            if doc.resource_count < min {
                return false;
            }
        }
        if let Some(stamp) = &self.created_at {
            if doc.created_at.as_deref() != Some(stamp.as_str()) {
                return false;
            }
        }
        true
    }

    /// Ordering used by every backend: the sort key in the requested
    /// direction, then the natural key ascending as a stable tie-break.
    pub fn compare(&self, a: &ArchitectureDocument, b: &ArchitectureDocument) -> Ordering {
        let primary = match self.sort_by {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::ResourceCount => a.resource_count.cmp(&b.resource_count),
        };
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.natural_key().cmp(&b.natural_key()))
    }
}

/// Abstract document store for architecture records.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](ArchitectureStore::upsert) | Insert or fully replace by natural key |
/// | [`find`](ArchitectureStore::find) | Filter, sort, skip, limit |
/// | [`ping`](ArchitectureStore::ping) | Reachability check for health reporting |
#[async_trait]
pub trait ArchitectureStore: Send + Sync {
    /// Insert or fully replace the document with the same
    /// `(repo, quickstart_dir, template_file)`.
    async fn upsert(&self, doc: &ArchitectureDocument) -> Result<()>;

    async fn find(&self, query: &ArchitectureQuery) -> Result<Vec<ArchitectureDocument>>;

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
