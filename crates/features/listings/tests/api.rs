#![cfg(feature = "server")]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use mkt_domain::l10n::LocalizedText;
use mkt_domain::listing::{Listing, ListingStatus};
use mkt_kernel::domain::config::ApiConfig;
use mkt_kernel::server::ApiState;
use serde_json::{Value, json};
use tower::ServiceExt;

const OWNER: &str = "7";

fn app() -> (Router, ApiState) {
    let config = ApiConfig::default();
    let state = ApiState::builder()
        .config(config.clone())
        .register_slice(mkt_listings::init(&config).unwrap())
        .build()
        .unwrap();
    let (router, _) = mkt_listings::api::router().with_state(state.clone()).split_for_parts();
    (router, state)
}

fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-mkt-user", user);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn stored(state: &ApiState, slug: &str, excluded: &[u32]) -> Listing {
    state.store.insert_listing(Listing {
        slug: slug.to_owned(),
        name: LocalizedText::new("en-US", "Star Map"),
        support_email: LocalizedText::new("en-US", "help@star-map.example.com"),
        default_locale: "en-US".to_owned(),
        status: ListingStatus::Public,
        excluded_regions: excluded.iter().copied().collect(),
        owners: [7].into(),
        ..Listing::default()
    })
}

#[tokio::test]
async fn anonymous_listing_is_forbidden() {
    let (router, _) = app();
    let (status, body) = send(&router, request("GET", "/api/v1/apps/app", None, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "Anonymous listing not allowed.");
}

#[tokio::test]
async fn created_listing_is_pending_and_listed() {
    let (router, _) = app();
    let payload = json!({
        "manifest": "https://star-map.example.com/manifest.webapp",
        "name": { "en-US": "Star Map" },
    });

    let response = router
        .clone()
        .oneshot(request("POST", "/api/v1/apps/app", Some(OWNER), Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_owned();
    assert!(location.starts_with("/api/v1/apps/app/"));

    let (status, body) = send(&router, request("GET", &location, Some(OWNER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "star-map");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["app_type"], "hosted");

    let (status, page) = send(&router, request("GET", "/api/v1/apps/app", Some(OWNER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["total_count"], 1);
    assert_eq!(page["objects"][0]["slug"], "star-map");

    let (status, _) = send(&router, request("GET", &location, Some("8"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn excluded_region_gets_contact_details() {
    let (router, state) = app();
    stored(&state, "star-map", &[7]);

    let (status, body) =
        send(&router, request("GET", "/api/v1/apps/app/star-map?region=br", None, None)).await;
    assert_eq!(status, StatusCode::from_u16(451).unwrap());
    assert_eq!(body["name"], "Star Map");
    assert_eq!(body["support_email"], "help@star-map.example.com");
    assert_eq!(body["support_url"], "");
    assert_eq!(body["reason"], "Not available in your region.");

    let (status, _) =
        send(&router, request("GET", "/api/v1/apps/app/star-map?region=br", Some(OWNER), None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) =
        send(&router, request("GET", "/api/v1/apps/app/star-map?region=us", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn only_owners_update_and_patch_is_refused() {
    let (router, state) = app();
    let listing = stored(&state, "star-map", &[]);
    let uri = format!("/api/v1/apps/app/{}", listing.id);
    let payload = json!({
        "categories": ["games"],
        "platforms": ["firefoxos"],
        "form_factors": ["mobile"],
    });

    let (status, _) = send(&router, request("PUT", &uri, Some("8"), Some(payload.clone()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&router, request("PUT", &uri, Some(OWNER), Some(payload.clone()))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["categories"], json!(["games"]));
    assert_eq!(body["device_types"], json!(["firefoxos"]));

    let (status, body) = send(&router, request("PATCH", &uri, Some(OWNER), Some(payload))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["reason"], "Method \"PATCH\" not allowed.");
}

#[tokio::test]
async fn update_reports_every_invalid_field() {
    let (router, state) = app();
    let listing = stored(&state, "star-map", &[]);
    let payload = json!({ "categories": ["games", "books", "music"], "platforms": ["android"] });

    let (status, body) = send(
        &router,
        request("PUT", &format!("/api/v1/apps/app/{}", listing.id), Some(OWNER), Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["categories"], json!(["You can have only 2 categories."]));
    assert_eq!(
        body["errors"]["non_field_errors"],
        json!(["Both \"platforms\" and \"form_factors\" are required."])
    );
}

#[tokio::test]
async fn deleted_listing_is_gone() {
    let (router, state) = app();
    let listing = stored(&state, "star-map", &[]);
    let uri = format!("/api/v1/apps/app/{}", listing.id);

    let (status, _) = send(&router, request("DELETE", &uri, Some(OWNER), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.store.listing(listing.id).is_none());

    let (status, _) = send(&router, request("GET", &uri, Some(OWNER), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
