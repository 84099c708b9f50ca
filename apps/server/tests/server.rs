use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use mkt::domain::config::ApiConfig;
use mkt::domain::l10n::LocalizedText;
use mkt::domain::listing::{Listing, ListingStatus};
use mkt_server::{Server, app_router};
use mkt_store::Store;
use serde_json::Value;
use tower::ServiceExt;

fn seeded_config(dir: &tempfile::TempDir) -> ApiConfig {
    let store = Store::in_memory();
    store.insert_listing(Listing {
        slug: "star-map".to_owned(),
        name: LocalizedText::new("en-US", "Star Map"),
        default_locale: "en-US".to_owned(),
        status: ListingStatus::Public,
        ..Listing::default()
    });
    let seed = dir.path().join("seed.json");
    std::fs::write(&seed, serde_json::to_vec(&store.snapshot()).unwrap()).unwrap();

    let mut config = ApiConfig::default();
    config.store.seed = Some(seed);
    config.store.seed_required = true;
    config
}

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec())
}

#[tokio::test]
async fn seeded_listings_are_searchable() {
    let dir = tempfile::tempdir().unwrap();
    let server = Server::builder().config(seeded_config(&dir)).build().await.unwrap();
    let router = app_router(server.state().clone());

    let (status, body) = get(&router, "/api/v1/apps/search?q=star").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["meta"]["total_count"], 1);
    assert_eq!(body["objects"][0]["slug"], "star-map");
}

#[tokio::test]
async fn every_slice_is_mounted() {
    let server = Server::builder().build().await.unwrap();
    assert_eq!(server.state().slice_names().count(), 4);
    assert!(server.state().slice_names().all(mkt::features::is_enabled));
    let router = app_router(server.state().clone());

    let (status, _) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&router, "/api/v1/rocketfuel/collections").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&router, "/api/v1/payments/account").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn api_reference_is_served() {
    let server = Server::builder().build().await.unwrap();
    let router = app_router(server.state().clone());

    let (status, body) = get(&router, "/api").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("Marketplace API"));
}

#[tokio::test]
async fn missing_required_seed_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ApiConfig::default();
    config.store.seed = Some(dir.path().join("absent.json"));
    config.store.seed_required = true;

    assert!(Server::builder().config(config).build().await.is_err());
}
