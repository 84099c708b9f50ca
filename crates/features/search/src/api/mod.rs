//! Search endpoints: paginated search, the featured feed, browser suggestions and the
//! rocketbar completion.

mod handlers;

use crate::Search;
use crate::composer::FilterComposer;
use mkt_domain::listing::Listing;
use mkt_index::SearchQuery;
use mkt_kernel::server::{ApiError, ApiState, PageParams, RequestContext};
use tracing::debug;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub const SEARCH_PATH: &str = "/api/v1/apps/search";

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::search))
        .routes(routes!(handlers::featured_search))
        .routes(routes!(handlers::suggest))
        .routes(routes!(handlers::rocketbar))
}

/// Composes the request's query for `window` and loads the matching listings in hit order.
///
/// # Errors
/// Returns [`ApiError::BadGateway`] when the index backend is unreachable.
pub async fn search_listings(
    state: &ApiState,
    ctx: &RequestContext,
    window: PageParams,
) -> Result<(u64, Vec<Listing>), ApiError> {
    let slice = state.try_get_slice::<Search>()?;
    let query = FilterComposer::from_context(ctx, slice.max_results).compose(window);
    run(state, &query).await
}

/// Runs `query` and loads the hits from the store. Hits the store no longer knows are skipped.
pub(crate) async fn run(state: &ApiState, query: &SearchQuery) -> Result<(u64, Vec<Listing>), ApiError> {
    let hits = state.index.search(query).await?;
    let listings = hits
        .ids()
        .into_iter()
        .filter_map(|id| {
            let listing = state.store.listing(id);
            if listing.is_none() {
                debug!(listing = id, "Index hit missing from the store");
            }
            listing
        })
        .collect();
    Ok((hits.total, listings))
}
