#![cfg(feature = "server")]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use mkt_kernel::domain::config::ApiConfig;
use mkt_kernel::server::ApiState;
use mkt_kernel::server::router::system_router;
use serde_json::Value;
use tower::ServiceExt;

#[tokio::test]
async fn health_reports_backends() {
    let state = ApiState::builder().config(ApiConfig::default()).build().unwrap();
    let (router, api) = system_router().with_state(state).split_for_parts();
    assert!(api.paths.paths.contains_key("/health"));

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["cache-control"], "no-store, no-cache, must-revalidate");

    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["status"], "up");
    assert_eq!(body["search"], "memory");
    assert_eq!(body["billing"], "memory");
}
