//! Batch persistence of discovered documents.

use tracing::{info, warn};

use archscan_core::models::ArchitectureDocument;
use archscan_core::store::ArchitectureStore;

use crate::error::HarvestResult;

/// Upsert every document on its natural key. Returns how many were written.
///
/// Without a store this is a no-op that logs a warning; callers that
/// require persistence check for a store themselves and fail with
/// [`crate::error::HarvestError::StorageUnavailable`].
pub async fn save_many(
    store: Option<&dyn ArchitectureStore>,
    docs: &[ArchitectureDocument],
) -> HarvestResult<usize> {
    let Some(store) = store else {
        warn!(documents = docs.len(), "no store configured; documents not saved");
        return Ok(0);
    };
    for doc in docs {
        store.upsert(doc).await?;
    }
    info!(documents = docs.len(), "saved documents");
    Ok(docs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use archscan_core::models::SourceUrls;
    use archscan_core::store::memory::InMemoryStore;
    use archscan_core::store::ArchitectureQuery;
    use serde_json::Map;

    fn doc(dir: &str) -> ArchitectureDocument {
        ArchitectureDocument {
            name: dir.to_string(),
            description: None,
            repo: "o/r".to_string(),
            quickstart_dir: dir.to_string(),
            template_file: "main.bicep".to_string(),
            services: vec![],
            resource_count: 0,
            source_urls: SourceUrls {
                dir_html: String::new(),
                template_html: String::new(),
            },
            metadata: Map::new(),
            arm_parameters_keys: vec![],
            arm_outputs_keys: vec![],
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_without_store_is_noop() {
        assert_eq!(save_many(None, &[doc("a")]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_saving_twice_keeps_one_row_per_key() {
        let store = InMemoryStore::new();
        let docs = vec![doc("a"), doc("b"), doc("a")];
        assert_eq!(save_many(Some(&store), &docs).await.unwrap(), 3);
        save_many(Some(&store), &docs).await.unwrap();
        assert_eq!(store.len(), 2);
        let found = store.find(&ArchitectureQuery::default()).await.unwrap();
        assert_eq!(found.len(), 2);
    }
}
