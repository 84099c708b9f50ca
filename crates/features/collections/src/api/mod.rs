//! Collection endpoints under `/api/v1/rocketfuel/collections`.

mod handlers;

use mkt_domain::collection::Collection;
use mkt_kernel::server::{ApiError, ApiState, RequestContext};
use mkt_store::Store;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Base path of the collection resource.
pub const COLLECTION_PATH: &str = "/api/v1/rocketfuel/collections";

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::list_collections, handlers::create_collection))
        .routes(routes!(
            handlers::retrieve_collection,
            handlers::update_collection,
            handlers::delete_collection
        ))
        .routes(routes!(handlers::add_app))
        .routes(routes!(handlers::remove_app))
        .routes(routes!(handlers::reorder_apps))
}

/// Finds a collection by numeric id, then by slug.
///
/// # Errors
/// Returns [`ApiError::NotFound`] when neither matches.
pub fn find_collection(store: &Store, key: &str) -> Result<Collection, ApiError> {
    key.parse()
        .ok()
        .and_then(|id| store.collection(id))
        .or_else(|| store.collection_by_slug(key))
        .ok_or_else(|| ApiError::not_found("No collection found for the given key."))
}

/// Finds a collection the caller curates.
fn curated_collection(state: &ApiState, ctx: &RequestContext, key: &str) -> Result<Collection, ApiError> {
    let user = ctx.require_user()?;
    let collection = find_collection(&state.store, key)?;
    if collection.author != Some(user) {
        return Err(ApiError::forbidden("You do not have permission to perform this action."));
    }
    Ok(collection)
}
