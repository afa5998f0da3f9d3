//! End-to-end discovery runs against the GitHub mock and a SQLite store.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use archscan::config::{Config, DbConfig};
use archscan::core::models::ArchitectureDocument;
use archscan::core::store::{ArchitectureQuery, ArchitectureStore, SortDirection, SortKey};
use archscan::github::HttpResponse;
use archscan::mock::MockGitHub;
use archscan::persist::save_many;
use archscan::pipeline::Harvester;
use archscan::sqlite_store::SqliteStore;

fn arm(types: &[&str]) -> serde_json::Value {
    let resources: Vec<_> = types
        .iter()
        .enumerate()
        .map(|(i, t)| json!({"type": t, "name": format!("r{}", i)}))
        .collect();
    json!({
        "$schema": "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#",
        "parameters": {"location": {"type": "string"}},
        "resources": resources,
        "outputs": {"id": {"type": "string", "value": "x"}}
    })
}

fn fleet() -> MockGitHub {
    MockGitHub::new()
        .with_json(
            "Contoso/infra",
            "quickstarts/101-storage/azuredeploy.json",
            &arm(&["Microsoft.Storage/storageAccounts"]),
        )
        .with_json(
            "Contoso/infra",
            "quickstarts/201-vm/azuredeploy.json",
            &arm(&[
                "Microsoft.Compute/virtualMachines",
                "Microsoft.Network/networkInterfaces",
                "Microsoft.Network/virtualNetworks",
            ]),
        )
        .with_json(
            "Contoso/infra",
            "quickstarts/201-vm/metadata.json",
            &json!({"itemDisplayName": "Linux VM", "summary": "One VM in a VNet."}),
        )
        .with_file(
            "Contoso/infra",
            "quickstarts/301-aks/main.bicep",
            "resource aks 'Microsoft.ContainerService/managedClusters@2024-01-01' = {}\n",
        )
        .with_file("Contoso/infra", "quickstarts/README.md", "# Quickstarts\n")
        .with_json(
            "Fabrikam/samples",
            "web/azuredeploy.json",
            &arm(&["Microsoft.Web/sites", "Microsoft.Web/serverfarms"]),
        )
}

fn config(sources: &[&str]) -> Config {
    let mut config = Config::default();
    config.scrape.sources = sources.iter().map(|s| s.to_string()).collect();
    config
}

fn keys(docs: &[ArchitectureDocument]) -> BTreeSet<(String, String)> {
    docs.iter()
        .map(|d| (d.quickstart_dir.clone(), d.template_file.clone()))
        .collect()
}

async fn sqlite(tmp: &TempDir) -> SqliteStore {
    let db = DbConfig {
        path: tmp.path().join("archscan.sqlite"),
    };
    SqliteStore::open(&db).await.unwrap()
}

#[tokio::test]
async fn test_scrape_twice_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite(&tmp).await;
    let harvester = Harvester::with_http(
        Arc::new(config(&["Contoso/infra:quickstarts", "Fabrikam/samples"])),
        Arc::new(fleet()),
    );

    let first = harvester.fetch_architectures(10, None).await.unwrap();
    assert_eq!(first.len(), 4);
    save_many(Some(&store), &first).await.unwrap();

    let second = harvester.fetch_architectures(10, None).await.unwrap();
    save_many(Some(&store), &second).await.unwrap();

    let all = store
        .find(&ArchitectureQuery {
            limit: 200,
            ..ArchitectureQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 4);

    // Rows carry the second run's stamp after the replace.
    let stamp = second[0].created_at.clone().unwrap();
    assert!(all.iter().all(|d| d.created_at.as_deref() == Some(stamp.as_str())));
    let batch = store
        .find(&ArchitectureQuery::batch(stamp, 200))
        .await
        .unwrap();
    assert_eq!(batch.len(), 4);
}

#[tokio::test]
async fn test_stored_documents_round_trip_through_queries() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite(&tmp).await;
    let harvester = Harvester::with_http(
        Arc::new(config(&["Contoso/infra:quickstarts", "Fabrikam/samples"])),
        Arc::new(fleet()),
    );
    let docs = harvester.fetch_architectures(10, None).await.unwrap();
    save_many(Some(&store), &docs).await.unwrap();

    let largest = store
        .find(&ArchitectureQuery {
            sort_by: SortKey::ResourceCount,
            direction: SortDirection::Desc,
            limit: 1,
            ..ArchitectureQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(largest[0].name, "Linux VM");
    assert_eq!(largest[0].resource_count, 3);
    assert_eq!(largest[0].description.as_deref(), Some("One VM in a VNet."));
    assert_eq!(largest[0].arm_parameters_keys, vec!["location"]);
    assert_eq!(largest[0].arm_outputs_keys, vec!["id"]);
    assert_eq!(
        largest[0].source_urls.template_html,
        "https://github.com/Contoso/infra/tree/master/quickstarts/201-vm/azuredeploy.json"
    );

    let bicep = store
        .find(&ArchitectureQuery {
            name_contains: Some("AKS".to_string()),
            ..ArchitectureQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(bicep.len(), 1);
    assert_eq!(bicep[0].template_file, "main.bicep");
    assert_eq!(bicep[0].resource_count, 0);
    assert!(bicep[0].metadata["_raw"]
        .as_str()
        .unwrap()
        .contains("managedClusters"));

    let at_least_two = store
        .find(&ArchitectureQuery {
            min_resources: Some(2),
            ..ArchitectureQuery::default()
        })
        .await
        .unwrap();
    let names: BTreeSet<_> = at_least_two.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, BTreeSet::from(["Linux VM", "web"]));
}

#[tokio::test]
async fn test_search_failure_matches_walk() {
    let sources = ["Contoso/infra:quickstarts"];

    let mut walk_config = config(&sources);
    walk_config.github.force_walk = true;
    let walked = Harvester::with_http(Arc::new(walk_config), Arc::new(fleet()))
        .fetch_architectures(10, None)
        .await
        .unwrap();

    let mut search_config = config(&sources);
    search_config.github.token = Some("ghp_test".to_string());
    let mock = Arc::new(
        fleet().with_search_failure(HttpResponse::new(422, r#"{"message":"Validation Failed"}"#)),
    );
    let harvester = Harvester::with_http(Arc::new(search_config), mock.clone());
    assert_eq!(harvester.strategy(), "search+walk");
    let fallen_back = harvester.fetch_architectures(10, None).await.unwrap();

    assert!(mock.search_requests() >= 1);
    assert_eq!(keys(&walked), keys(&fallen_back));
    assert_eq!(walked.len(), 3);
}

#[tokio::test]
async fn test_search_and_walk_agree() {
    let sources = ["Contoso/infra:quickstarts"];

    let mut walk_config = config(&sources);
    walk_config.github.force_walk = true;
    let walked = Harvester::with_http(Arc::new(walk_config), Arc::new(fleet()))
        .fetch_architectures(10, None)
        .await
        .unwrap();

    let mut search_config = config(&sources);
    search_config.github.token = Some("ghp_test".to_string());
    let mock = Arc::new(fleet());
    let searched = Harvester::with_http(Arc::new(search_config), mock.clone())
        .fetch_architectures(10, None)
        .await
        .unwrap();

    assert!(mock.search_requests() >= 1);
    let mut a: Vec<_> = walked.iter().map(|d| d.name.clone()).collect();
    let mut b: Vec<_> = searched.iter().map(|d| d.name.clone()).collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);
    assert!(searched
        .iter()
        .all(|d| d.services == walked.iter().find(|w| w.name == d.name).unwrap().services));
}

#[tokio::test]
async fn test_token_is_sent_on_every_request() {
    let mut config = config(&["Fabrikam/samples"]);
    config.github.token = Some("ghp_test".to_string());
    let mock = Arc::new(fleet());
    Harvester::with_http(Arc::new(config), mock.clone())
        .fetch_architectures(5, None)
        .await
        .unwrap();

    let requests = mock.requests();
    assert!(!requests.is_empty());
    for req in &requests {
        assert_eq!(req.header("authorization"), Some("Bearer ghp_test"));
        assert!(req.header("user-agent").is_some());
    }
}
