//! Listing endpoints and the lookups other slices reuse for listing-scoped resources.

mod handlers;

use mkt_domain::listing::Listing;
use mkt_kernel::server::{ApiError, ApiState, RequestContext};
use mkt_store::Store;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::list_listings, handlers::create_listing))
        .routes(routes!(
            handlers::retrieve_listing,
            handlers::update_listing,
            handlers::patch_listing,
            handlers::delete_listing
        ))
}

/// Finds a listing by numeric id, then by slug.
///
/// # Errors
/// Returns [`ApiError::NotFound`] when neither matches.
pub fn find_listing(store: &Store, key: &str) -> Result<Listing, ApiError> {
    key.parse()
        .ok()
        .and_then(|id| store.listing(id))
        .or_else(|| store.listing_by_slug(key))
        .ok_or_else(|| ApiError::not_found("No listing found for the given key."))
}

/// Finds a listing the caller owns.
///
/// # Errors
/// Returns [`ApiError::Forbidden`] for anonymous callers and non-owners, and
/// [`ApiError::NotFound`] for unknown keys.
pub fn owned_listing(state: &ApiState, ctx: &RequestContext, key: &str) -> Result<Listing, ApiError> {
    let user = ctx.require_user()?;
    let listing = find_listing(&state.store, key)?;
    if !listing.is_owned_by(user) {
        return Err(ApiError::forbidden("You do not have permission to perform this action."));
    }
    Ok(listing)
}
