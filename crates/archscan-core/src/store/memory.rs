//! In-memory [`ArchitectureStore`] for tests and store-less runs.
//!
//! Documents live in a `BTreeMap` keyed by natural key behind a
//! `std::sync::RwLock`, so uniqueness holds by construction.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{ArchitectureDocument, NaturalKey};

use super::{ArchitectureQuery, ArchitectureStore};

pub struct InMemoryStore {
    docs: RwLock<BTreeMap<NaturalKey, ArchitectureDocument>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored document in natural-key order.
    pub fn all(&self) -> Vec<ArchitectureDocument> {
        self.docs
            .read()
            .map(|d| d.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArchitectureStore for InMemoryStore {
    async fn upsert(&self, doc: &ArchitectureDocument) -> Result<()> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        docs.insert(doc.natural_key(), doc.clone());
        Ok(())
    }

    async fn find(&self, query: &ArchitectureQuery) -> Result<Vec<ArchitectureDocument>> {
        let docs = self
            .docs
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        let mut matched: Vec<ArchitectureDocument> =
            docs.values().filter(|d| query.matches(d)).cloned().collect();
        matched.sort_by(|a, b| query.compare(a, b));
        Ok(matched
            .into_iter()
            .skip(query.skip)
            .take(query.limit)
            .collect())
    }
}
