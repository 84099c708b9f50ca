use super::{COLLECTION_PATH, curated_collection, find_collection};
use crate::Collections;
use crate::fallback::{self, SlotQuery, add_fallback_header};
use crate::membership::MembershipSource;
use crate::serializer::CollectionView;
use crate::validation::{CollectionPayload, validate_create, validate_update};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use mkt_derive::{api_handler, api_model};
use mkt_domain::collection::{Collection, CollectionType};
use mkt_domain::constants::COLLECTIONS_TAG;
use mkt_domain::listing::ListingId;
use mkt_kernel::server::{
    ApiError, ApiState, ErrorResponse, NON_FIELD_ERRORS, Page, PageParams, RequestContext,
};
use mkt_kernel::slugify;
use mkt_store::StoreError;
use std::collections::BTreeSet;
use tracing::info;

/// A listing to add to or remove from a collection.
#[api_model]
pub struct AppMembership {
    pub app: ListingId,
}

#[api_handler(
    get,
    path = "/api/v1/rocketfuel/collections",
    params(
        ("collection_type" = Option<u8>, Query, description = "0 basic, 1 featured, 2 operator shelf"),
        ("region" = Option<String>, Query, description = "Region slug"),
        ("carrier" = Option<String>, Query, description = "Carrier slug"),
        ("cat" = Option<String>, Query, description = "Category slug"),
    ),
    responses(
        (status = OK, description = "Page of public collections; dropped filters are listed in API-Fallback-collections"),
        (status = BAD_REQUEST, body = ErrorResponse),
    ),
    tag = COLLECTIONS_TAG,
)]
pub(super) async fn list_collections(
    State(state): State<ApiState>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let slice = state.try_get_slice::<Collections>()?;
    let window = PageParams::from_params(&ctx.params, slice.default_limit, slice.max_limit);

    let mut query = SlotQuery::from_params(&ctx.params);
    if let Some(raw) = ctx.params.get("collection_type") {
        let kind = raw
            .parse::<u8>()
            .map_err(|_| format!("\"{raw}\" is not a valid choice."))
            .and_then(CollectionType::try_from)
            .map_err(|msg| ApiError::field("collection_type", msg))?;
        query = query.of_type(kind);
    }

    let found = fallback::find(&state.store, query);
    let total = found.collections.len() as u64;
    let mut objects = Vec::new();
    for collection in found.collections.iter().skip(window.offset).take(window.limit) {
        objects.push(CollectionView::resolve(&state, &ctx, collection, MembershipSource::Store).await?);
    }

    let mut headers = HeaderMap::new();
    add_fallback_header(&mut headers, "collections", &found.dropped);
    Ok((headers, Json(Page::new(objects, total, window, &ctx.path, &ctx.params))).into_response())
}

#[api_handler(
    post,
    path = "/api/v1/rocketfuel/collections",
    request_body = CollectionPayload,
    responses(
        (status = CREATED, body = CollectionView),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = FORBIDDEN, body = ErrorResponse),
    ),
    tag = COLLECTIONS_TAG,
)]
pub(super) async fn create_collection(
    State(state): State<ApiState>,
    ctx: RequestContext,
    payload: Result<Json<CollectionPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user = ctx.require_user()?;
    let Json(body) = payload?;
    let mut changes = validate_create(&body)?;

    let default_language = changes
        .default_language
        .take()
        .unwrap_or_else(|| state.config.market.default_locale.clone());
    let slug = match changes.slug.take() {
        Some(slug) if state.store.collection_by_slug(&slug).is_some() => {
            return Err(ApiError::field("slug", "This slug is already in use."));
        },
        Some(slug) => slug,
        None => {
            let name = changes.name.as_ref().and_then(|n| n.localized(&default_language, &default_language));
            unique_slug(&state, &slugify(name.unwrap_or("collection")))
        },
    };

    let mut collection = Collection { slug, default_language, author: Some(user), ..Collection::default() };
    changes.apply(&mut collection);
    let collection = state.store.create_collection(collection).map_err(slot_error)?;
    info!(collection = collection.id, user, "Collection created");

    let view = CollectionView::resolve(&state, &ctx, &collection, MembershipSource::Store).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("{COLLECTION_PATH}/{}", collection.id))],
        Json(view),
    ))
}

#[api_handler(
    get,
    path = "/api/v1/rocketfuel/collections/{key}",
    params(("key" = String, Path, description = "Collection id or slug")),
    responses(
        (status = OK, body = CollectionView),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = COLLECTIONS_TAG,
)]
pub(super) async fn retrieve_collection(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
) -> Result<Json<CollectionView>, ApiError> {
    let collection = find_collection(&state.store, &key)?;
    if !collection.is_public && (ctx.user.is_none() || collection.author != ctx.user) {
        return Err(ApiError::forbidden("You do not have permission to perform this action."));
    }
    Ok(Json(CollectionView::resolve(&state, &ctx, &collection, MembershipSource::Store).await?))
}

#[api_handler(
    patch,
    path = "/api/v1/rocketfuel/collections/{key}",
    params(("key" = String, Path, description = "Collection id or slug")),
    request_body = CollectionPayload,
    responses(
        (status = OK, body = CollectionView),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = COLLECTIONS_TAG,
)]
pub(super) async fn update_collection(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
    payload: Result<Json<CollectionPayload>, JsonRejection>,
) -> Result<Json<CollectionView>, ApiError> {
    let existing = curated_collection(&state, &ctx, &key)?;
    let Json(body) = payload?;
    let changes = validate_update(&body, &existing)?;
    if let Some(slug) = &changes.slug {
        if state.store.collection_by_slug(slug).is_some_and(|other| other.id != existing.id) {
            return Err(ApiError::field("slug", "This slug is already in use."));
        }
    }

    let updated = state
        .store
        .update_collection(existing.id, |collection| {
            changes.apply(collection);
            Ok(())
        })
        .map_err(slot_error)?;

    Ok(Json(CollectionView::resolve(&state, &ctx, &updated, MembershipSource::Store).await?))
}

#[api_handler(
    delete,
    path = "/api/v1/rocketfuel/collections/{key}",
    params(("key" = String, Path, description = "Collection id or slug")),
    responses(
        (status = NO_CONTENT, description = "Collection deleted"),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = COLLECTIONS_TAG,
)]
pub(super) async fn delete_collection(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    let collection = curated_collection(&state, &ctx, &key)?;
    let removed = state.store.delete_collection(collection.id)?;
    state.reindex(removed.apps).await;
    info!(collection = collection.id, "Collection deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[api_handler(
    post,
    path = "/api/v1/rocketfuel/collections/{key}/add_app",
    params(("key" = String, Path, description = "Collection id or slug")),
    request_body = AppMembership,
    responses(
        (status = OK, body = CollectionView),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = FORBIDDEN, body = ErrorResponse),
    ),
    tag = COLLECTIONS_TAG,
)]
pub(super) async fn add_app(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
    payload: Result<Json<AppMembership>, JsonRejection>,
) -> Result<Json<CollectionView>, ApiError> {
    let collection = curated_collection(&state, &ctx, &key)?;
    let Json(AppMembership { app }) = payload?;
    if state.store.listing(app).is_none() {
        return Err(ApiError::field("app", format!("Invalid pk \"{app}\" - object does not exist.")));
    }

    let updated = state
        .store
        .update_collection(collection.id, |collection| {
            if collection.apps.contains(&app) {
                return Err(StoreError::Unique {
                    message: "'app' is already in this collection.".into(),
                    context: Some("app".into()),
                });
            }
            collection.apps.push(app);
            Ok(())
        })
        .map_err(|err| match err {
            StoreError::Unique { message, .. } => ApiError::field("app", message),
            other => other.into(),
        })?;
    state.reindex([app]).await;

    Ok(Json(CollectionView::resolve(&state, &ctx, &updated, MembershipSource::Store).await?))
}

#[api_handler(
    post,
    path = "/api/v1/rocketfuel/collections/{key}/remove_app",
    params(("key" = String, Path, description = "Collection id or slug")),
    request_body = AppMembership,
    responses(
        (status = OK, body = CollectionView),
        (status = RESET_CONTENT, description = "The listing was not a member"),
        (status = FORBIDDEN, body = ErrorResponse),
    ),
    tag = COLLECTIONS_TAG,
)]
pub(super) async fn remove_app(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
    payload: Result<Json<AppMembership>, JsonRejection>,
) -> Result<Response, ApiError> {
    let collection = curated_collection(&state, &ctx, &key)?;
    let Json(AppMembership { app }) = payload?;
    if !collection.apps.contains(&app) {
        return Ok(StatusCode::RESET_CONTENT.into_response());
    }

    let updated = state.store.update_collection(collection.id, |collection| {
        collection.apps.retain(|member| *member != app);
        Ok(())
    })?;
    state.reindex([app]).await;

    let view = CollectionView::resolve(&state, &ctx, &updated, MembershipSource::Store).await?;
    Ok(Json(view).into_response())
}

#[api_handler(
    post,
    path = "/api/v1/rocketfuel/collections/{key}/reorder",
    params(("key" = String, Path, description = "Collection id or slug")),
    request_body = Vec<ListingId>,
    responses(
        (status = OK, body = CollectionView),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = FORBIDDEN, body = ErrorResponse),
    ),
    tag = COLLECTIONS_TAG,
)]
pub(super) async fn reorder_apps(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
    payload: Result<Json<Vec<ListingId>>, JsonRejection>,
) -> Result<Json<CollectionView>, ApiError> {
    let collection = curated_collection(&state, &ctx, &key)?;
    let Json(order) = payload?;

    let updated = state
        .store
        .update_collection(collection.id, |collection| {
            let current: BTreeSet<_> = collection.apps.iter().copied().collect();
            let requested: BTreeSet<_> = order.iter().copied().collect();
            if current != requested || order.len() != collection.apps.len() {
                return Err(StoreError::Unique {
                    message: "Reordering requires every app of the collection exactly once.".into(),
                    context: Some("reorder".into()),
                });
            }
            collection.apps.clone_from(&order);
            Ok(())
        })
        .map_err(|err| match err {
            StoreError::Unique { message, .. } => ApiError::field(NON_FIELD_ERRORS, message),
            other => other.into(),
        })?;
    state.reindex(updated.apps.clone()).await;

    Ok(Json(CollectionView::resolve(&state, &ctx, &updated, MembershipSource::Store).await?))
}

/// Slot conflicts are reported under `collection_uniqueness`.
fn slot_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Unique { message, .. } => ApiError::field("collection_uniqueness", message),
        other => other.into(),
    }
}

fn unique_slug(state: &ApiState, base: &str) -> String {
    let mut candidate = base.to_owned();
    let mut suffix = 1;
    while state.store.collection_by_slug(&candidate).is_some() {
        suffix += 1;
        candidate = format!("{base}-{suffix}");
    }
    candidate
}
