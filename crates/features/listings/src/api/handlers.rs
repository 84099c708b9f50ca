use super::{find_listing, owned_listing};
use crate::Listings;
use crate::serializer::{ListingView, resource_uri};
use crate::validation::{ListingPayload, validate_create, validate_update};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use mkt_derive::api_handler;
use mkt_domain::catalog::AppType;
use mkt_domain::constants::LISTINGS_TAG;
use mkt_domain::listing::{Listing, ListingId, ListingStatus};
use mkt_kernel::server::{ApiError, ApiState, ErrorResponse, Page, PageParams, RequestContext};
use mkt_kernel::slugify;
use mkt_store::Store;
use serde_json::{Map, Value};
use tracing::info;

#[api_handler(
    get,
    path = "/api/v1/apps/app",
    responses(
        (status = OK, description = "Page of listings owned by the caller"),
        (status = FORBIDDEN, body = ErrorResponse),
    ),
    tag = LISTINGS_TAG,
)]
pub(super) async fn list_listings(
    State(state): State<ApiState>,
    ctx: RequestContext,
) -> Result<Json<Page<ListingView>>, ApiError> {
    let user = ctx.user.ok_or_else(|| ApiError::forbidden("Anonymous listing not allowed."))?;
    let slice = state.try_get_slice::<Listings>()?;
    let window = PageParams::from_params(&ctx.params, slice.default_limit, slice.max_limit);

    let owned: Vec<Listing> = state
        .store
        .listings_owned_by(user)
        .into_iter()
        .filter(|listing| !listing.excluded_regions.contains(&ctx.region.id))
        .collect();
    let total = owned.len() as u64;
    let objects = owned
        .iter()
        .skip(window.offset)
        .take(window.limit)
        .map(|listing| ListingView::build(listing, &state, &ctx))
        .collect();

    Ok(Json(Page::new(objects, total, window, &ctx.path, &ctx.params)))
}

#[api_handler(
    post,
    path = "/api/v1/apps/app",
    request_body = ListingPayload,
    responses(
        (status = CREATED, description = "Listing created", body = ListingView),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = FORBIDDEN, body = ErrorResponse),
    ),
    tag = LISTINGS_TAG,
)]
pub(super) async fn create_listing(
    State(state): State<ApiState>,
    ctx: RequestContext,
    payload: Result<Json<ListingPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user = ctx.require_user()?;
    let Json(body) = payload?;
    let (manifest, mut changes) = validate_create(&body)?;

    let default_locale = changes
        .default_locale
        .clone()
        .unwrap_or_else(|| state.config.market.default_locale.clone());
    let slug = match changes.slug.take() {
        Some(slug) => {
            ensure_free_slug(&state.store, &slug, None)?;
            slug
        },
        None => {
            let name = changes.name.as_ref().and_then(|n| n.localized(&default_locale, &default_locale));
            unique_slug(&state.store, &slugify(name.unwrap_or("app")))
        },
    };

    let mut listing = Listing {
        slug,
        default_locale,
        app_type: Some(AppType::Hosted),
        manifest_url: Some(manifest),
        status: ListingStatus::Pending,
        owners: [user].into(),
        created: Utc::now().timestamp(),
        ..Listing::default()
    };
    changes.apply(&mut listing);
    let listing = state.store.insert_listing(listing);
    state.reindex([listing.id]).await;
    info!(listing = listing.id, user, "Listing created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, resource_uri(listing.id))],
        Json(ListingView::build(&listing, &state, &ctx)),
    ))
}

#[api_handler(
    get,
    path = "/api/v1/apps/app/{key}",
    params(("key" = String, Path, description = "Listing id or slug")),
    responses(
        (status = OK, body = ListingView),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = 451, description = "Not available in the request region"),
    ),
    tag = LISTINGS_TAG,
)]
pub(super) async fn retrieve_listing(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
) -> Result<Json<ListingView>, ApiError> {
    let listing = find_listing(&state.store, &key)?;

    if !ctx.user.is_some_and(|user| listing.is_owned_by(user)) {
        if !listing.is_available_in(ctx.region) {
            return Err(region_restricted(&listing, &ctx));
        }
        if !listing.is_public() {
            return Err(ApiError::forbidden("You do not have permission to perform this action."));
        }
    }

    Ok(Json(ListingView::build(&listing, &state, &ctx)))
}

#[api_handler(
    put,
    path = "/api/v1/apps/app/{key}",
    params(("key" = String, Path, description = "Listing id or slug")),
    request_body = ListingPayload,
    responses(
        (status = ACCEPTED, body = ListingView),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = LISTINGS_TAG,
)]
pub(super) async fn update_listing(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
    payload: Result<Json<ListingPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = owned_listing(&state, &ctx, &key)?;
    let Json(body) = payload?;
    let changes = validate_update(&body, &listing)?;
    if let Some(slug) = &changes.slug {
        ensure_free_slug(&state.store, slug, Some(listing.id))?;
    }

    let updated = state.store.update_listing(listing.id, |stored| {
        changes.apply(stored);
        Ok(())
    })?;
    state.reindex([updated.id]).await;

    Ok((StatusCode::ACCEPTED, Json(ListingView::build(&updated, &state, &ctx))))
}

#[api_handler(
    patch,
    path = "/api/v1/apps/app/{key}",
    params(("key" = String, Path, description = "Listing id or slug")),
    responses((status = METHOD_NOT_ALLOWED, body = ErrorResponse)),
    tag = LISTINGS_TAG,
)]
pub(super) async fn patch_listing() -> ApiError {
    ApiError::method_not_allowed("Method \"PATCH\" not allowed.")
}

#[api_handler(
    delete,
    path = "/api/v1/apps/app/{key}",
    params(("key" = String, Path, description = "Listing id or slug")),
    responses(
        (status = NO_CONTENT, description = "Listing deleted"),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = LISTINGS_TAG,
)]
pub(super) async fn delete_listing(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    let listing = owned_listing(&state, &ctx, &key)?;
    state.store.delete_listing(listing.id)?;
    state.reindex([listing.id]).await;
    info!(listing = listing.id, "Listing deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// 451 body keeping the contact details so clients can still reach the developer.
fn region_restricted(listing: &Listing, ctx: &RequestContext) -> ApiError {
    let mut details = Map::new();
    for (field, text) in [
        ("name", &listing.name),
        ("support_email", &listing.support_email),
        ("support_url", &listing.support_url),
    ] {
        let value = text.localized(&ctx.lang, &listing.default_locale).unwrap_or_default();
        details.insert(field.to_owned(), Value::from(value));
    }
    ApiError::region_restricted(details)
}

fn ensure_free_slug(store: &Store, slug: &str, owner: Option<ListingId>) -> Result<(), ApiError> {
    match store.listing_by_slug(slug) {
        Some(existing) if Some(existing.id) != owner => {
            Err(ApiError::field("slug", "This slug is already in use."))
        },
        _ => Ok(()),
    }
}

/// `base`, or `base-N` with the first free suffix.
fn unique_slug(store: &Store, base: &str) -> String {
    let mut candidate = base.to_owned();
    let mut suffix = 1;
    while store.listing_by_slug(&candidate).is_some() {
        suffix += 1;
        candidate = format!("{base}-{suffix}");
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taken_slugs_get_a_suffix() {
        let store = Store::in_memory();
        store.insert_listing(Listing { slug: "star-map".to_owned(), ..Listing::default() });
        store.insert_listing(Listing { slug: "star-map-2".to_owned(), ..Listing::default() });
        assert_eq!(unique_slug(&store, "star-map"), "star-map-3");
        assert_eq!(unique_slug(&store, "moon"), "moon");
    }
}
