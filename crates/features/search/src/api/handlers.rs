use super::{run, search_listings};
use crate::Search;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use mkt_collections::fallback::{add_fallback_header, top_collection};
use mkt_collections::membership::MembershipSource;
use mkt_collections::serializer::CollectionView;
use mkt_derive::{api_handler, api_model};
use mkt_domain::collection::CollectionType;
use mkt_domain::constants::SEARCH_TAG;
use mkt_index::{Clause, ListingDocument, SearchQuery};
use mkt_kernel::server::{ApiError, ApiState, ErrorResponse, Page, PageMeta, PageParams, RequestContext};
use mkt_listings::serializer::ListingView;
use serde::Serialize;
use serde_json::{Value, json};

const SUGGESTIONS_CONTENT_TYPE: &str = "application/x-suggestions+json";
const ROCKETBAR_CONTENT_TYPE: &str = "application/x-rocketbar+json";
const ROCKETBAR_LIMIT: usize = 5;
const SUGGESTION_DESCRIPTION_CHARS: usize = 80;

/// The featured feed: one search page plus the top collection of each type.
#[derive(Debug, Serialize)]
pub struct FeaturedSearch {
    pub meta: PageMeta,
    pub objects: Vec<ListingView>,
    pub collections: Vec<CollectionView>,
    pub featured: Vec<CollectionView>,
    pub operator: Vec<CollectionView>,
}

/// One rocketbar completion.
#[api_model]
#[derive(Clone, PartialEq)]
pub struct RocketbarEntry {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub slug: String,
    pub manifest_url: Option<String>,
}

fn search_window(state: &ApiState, ctx: &RequestContext) -> Result<PageParams, ApiError> {
    let slice = state.try_get_slice::<Search>()?;
    Ok(PageParams::from_params(&ctx.params, slice.default_limit, slice.max_results))
}

async fn search_page(state: &ApiState, ctx: &RequestContext) -> Result<Page<ListingView>, ApiError> {
    let window = search_window(state, ctx)?;
    let (total, listings) = search_listings(state, ctx, window).await?;
    let objects = listings.iter().map(|listing| ListingView::build(listing, state, ctx)).collect();
    Ok(Page::new(objects, total, window, &ctx.path, &ctx.params))
}

#[api_handler(
    get,
    path = "/api/v1/apps/search",
    params(
        ("q" = Option<String>, Query, description = "Free text query"),
        ("cat" = Option<String>, Query, description = "Category slug"),
        ("price" = Option<String>, Query, description = "`free` or `paid`"),
        ("platform" = Option<String>, Query, description = "Platform slug"),
        ("device" = Option<String>, Query, description = "Legacy device type"),
        ("form_factor" = Option<String>, Query, description = "Form factor slug"),
        ("premium_types" = Option<String>, Query, description = "Premium type, repeatable"),
        ("app_type" = Option<String>, Query, description = "hosted, packaged or privileged"),
        ("manifest_url" = Option<String>, Query, description = "Exact manifest URL"),
        ("offline" = Option<bool>, Query, description = "Offline capable listings only"),
        ("languages" = Option<String>, Query, description = "Comma separated supported locales"),
        ("sort" = Option<String>, Query, description = "popularity, downloads, rating, created, reviewed or name"),
        ("limit" = Option<usize>, Query),
        ("offset" = Option<usize>, Query),
    ),
    responses(
        (status = OK, description = "Page of matching listings"),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = SEARCH_TAG,
)]
pub(super) async fn search(
    State(state): State<ApiState>,
    ctx: RequestContext,
) -> Result<Json<Page<ListingView>>, ApiError> {
    Ok(Json(search_page(&state, &ctx).await?))
}

#[api_handler(
    get,
    path = "/api/v1/fireplace/search/featured",
    params(
        ("preview" = Option<bool>, Query, description = "Resolve collection members from the store"),
    ),
    responses(
        (status = OK, description = "Search page plus collections, featured and operator; dropped slot filters are listed in API-Fallback-<name>"),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = SEARCH_TAG,
)]
pub(super) async fn featured_search(
    State(state): State<ApiState>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let page = search_page(&state, &ctx).await?;
    let source =
        if ctx.params.contains("preview") { MembershipSource::Store } else { MembershipSource::Index };

    let mut headers = HeaderMap::new();
    let (collections, dropped) = top_collection(&state, &ctx, CollectionType::Basic, source).await?;
    add_fallback_header(&mut headers, "collections", &dropped);
    let (featured, dropped) = top_collection(&state, &ctx, CollectionType::Featured, source).await?;
    add_fallback_header(&mut headers, "featured", &dropped);
    let (operator, dropped) = top_collection(&state, &ctx, CollectionType::Operator, source).await?;
    add_fallback_header(&mut headers, "operator", &dropped);

    let body = FeaturedSearch { meta: page.meta, objects: page.objects, collections, featured, operator };
    Ok((headers, Json(body)).into_response())
}

#[api_handler(
    get,
    path = "/api/v1/apps/search/suggest",
    params(("q" = Option<String>, Query, description = "Free text query")),
    responses(
        (status = OK, description = "OpenSearch suggestions: [query, names, descriptions, urls, icons]", content_type = "application/x-suggestions+json"),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = SEARCH_TAG,
)]
pub(super) async fn suggest(State(state): State<ApiState>, ctx: RequestContext) -> Result<Response, ApiError> {
    let page = search_page(&state, &ctx).await?;
    let query = ctx.params.get("q").unwrap_or_default();

    let mut names = Vec::new();
    let mut descriptions = Vec::new();
    let mut urls = Vec::new();
    let mut icons = Vec::new();
    for view in page.objects {
        names.push(view.name.unwrap_or_default());
        descriptions.push(truncate(view.description.as_deref().unwrap_or_default(), SUGGESTION_DESCRIPTION_CHARS));
        urls.push(view.absolute_url);
        icons.push(view.icon.unwrap_or_default());
    }

    let body = json!([query, names, descriptions, urls, icons]);
    Ok(with_content_type(SUGGESTIONS_CONTENT_TYPE, body))
}

#[api_handler(
    get,
    path = "/api/v1/apps/rocketbar",
    params(
        ("q" = Option<String>, Query, description = "Name prefix"),
        ("limit" = Option<usize>, Query, description = "Number of completions, default 5"),
    ),
    responses(
        (status = OK, body = Vec<RocketbarEntry>, content_type = "application/x-rocketbar+json"),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = SEARCH_TAG,
)]
pub(super) async fn rocketbar(State(state): State<ApiState>, ctx: RequestContext) -> Result<Response, ApiError> {
    let Some(prefix) = ctx.params.get("q").map(str::trim).filter(|q| !q.is_empty()) else {
        return Ok(with_content_type(ROCKETBAR_CONTENT_TYPE, json!([])));
    };
    let slice = state.try_get_slice::<Search>()?;
    let limit = PageParams::from_params(&ctx.params, ROCKETBAR_LIMIT, slice.max_results).limit;

    let query = ListingDocument::visibility_filters(ctx.region.id)
        .into_iter()
        .fold(SearchQuery::new(), SearchQuery::filter)
        .should(Clause::Prefix { field: "name".into(), value: prefix.to_lowercase(), boost: 1.0 })
        .page(0, limit);
    let (_, listings) = run(&state, &query).await?;

    let market = &state.config.market;
    let entries: Vec<RocketbarEntry> = listings
        .iter()
        .map(|listing| RocketbarEntry {
            name: listing.name.localized(&ctx.lang, &listing.default_locale).map(str::to_owned),
            icon: mkt_listings::serializer::icon_url(&market.static_url, listing),
            slug: listing.slug.clone(),
            manifest_url: listing.manifest_url.clone(),
        })
        .collect();
    Ok(with_content_type(ROCKETBAR_CONTENT_TYPE, json!(entries)))
}

fn with_content_type(content_type: &'static str, body: Value) -> Response {
    ([(header::CONTENT_TYPE, HeaderValue::from_static(content_type))], Json(body)).into_response()
}

/// Cuts `text` to `max` characters, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
