//! `archscan list`: query stored architectures.

use anyhow::{bail, Result};

use archscan_core::store::{ArchitectureQuery, ArchitectureStore, SortDirection, SortKey};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// CLI-facing filters, mirroring the `/architectures` query parameters.
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub q: Option<String>,
    pub min_resources: Option<usize>,
    pub sort_by: String,
    pub sort_dir: String,
    pub skip: usize,
    pub limit: usize,
}

impl ListOptions {
    pub fn to_query(&self) -> Result<ArchitectureQuery> {
        if !(1..=200).contains(&self.limit) {
            bail!("--limit must be in [1, 200]");
        }
        Ok(ArchitectureQuery {
            name_contains: self.q.clone().filter(|q| !q.is_empty()),
            min_resources: self.min_resources,
            created_at: None,
            sort_by: SortKey::parse_lenient(&self.sort_by),
            direction: SortDirection::parse_lenient(&self.sort_dir),
            skip: self.skip,
            limit: self.limit,
        })
    }
}

pub async fn run_list(config: &Config, options: &ListOptions, json: bool) -> Result<()> {
    let query = options.to_query()?;
    let store = SqliteStore::open(db::require(config)?).await?;
    let docs = store.find(&query).await?;
    store.pool().close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&docs)?);
        return Ok(());
    }
    if docs.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, doc) in docs.iter().enumerate() {
        println!(
            "{}. {} ({} services)",
            query.skip + i + 1,
            doc.name,
            doc.resource_count
        );
        println!("    repo: {}", doc.repo);
        println!("    template: {}/{}", doc.quickstart_dir, doc.template_file);
        if !doc.services.is_empty() {
            println!("    services: {}", doc.services.join(", "));
        }
        if let Some(desc) = &doc.description {
            println!("    description: {}", desc.replace('\n', " ").trim());
        }
        println!("    url: {}", doc.source_urls.dir_html);
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ListOptions {
        ListOptions {
            q: None,
            min_resources: None,
            sort_by: "name".into(),
            sort_dir: "asc".into(),
            skip: 0,
            limit: 25,
        }
    }

    #[test]
    fn test_to_query_lenient_sort() {
        let opts = ListOptions {
            sort_by: "bogus".into(),
            sort_dir: "DOWN".into(),
            q: Some(String::new()),
            ..options()
        };
        let q = opts.to_query().unwrap();
        assert_eq!(q.sort_by, SortKey::Name);
        assert_eq!(q.direction, SortDirection::Desc);
        assert_eq!(q.name_contains, None);
    }

    #[test]
    fn test_to_query_rejects_limit_out_of_range() {
        assert!(ListOptions { limit: 0, ..options() }.to_query().is_err());
        assert!(ListOptions { limit: 201, ..options() }.to_query().is_err());
        assert!(ListOptions { limit: 200, ..options() }.to_query().is_ok());
    }
}
