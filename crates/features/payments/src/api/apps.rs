use super::plain_text;
use crate::orchestrator::remote;
use crate::serializer::{InAppConfigView, MonetizationView};
use crate::validation::MonetizationPayload;
use crate::{Payments, in_app, monetization};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use mkt_derive::api_handler;
use mkt_domain::constants::PAYMENTS_TAG;
use mkt_kernel::server::{ApiError, ApiState, ErrorResponse, RequestContext};
use mkt_listings::api::owned_listing;
use tracing::info;

#[api_handler(
    get,
    path = "/api/v1/apps/{key}/payments",
    params(("key" = String, Path, description = "Listing id or slug")),
    responses(
        (status = OK, body = MonetizationView),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn retrieve_monetization(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
) -> Result<Json<MonetizationView>, ApiError> {
    let listing = owned_listing(&state, &ctx, &key)?;
    Ok(Json(monetization::settings(&state, &listing)?))
}

#[api_handler(
    put,
    path = "/api/v1/apps/{key}/payments",
    params(("key" = String, Path, description = "Listing id or slug")),
    request_body = MonetizationPayload,
    responses(
        (status = OK, body = MonetizationView),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = BAD_GATEWAY, description = "A provider step failed; earlier steps stay saved", body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn update_monetization(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
    payload: Result<Json<MonetizationPayload>, JsonRejection>,
) -> Result<Json<MonetizationView>, ApiError> {
    let listing = owned_listing(&state, &ctx, &key)?;
    let Json(body) = payload?;
    monetization::save(&state, &ctx, &listing, &body).await?;

    let saved = state
        .store
        .listing(listing.id)
        .ok_or_else(|| ApiError::not_found("No listing found for the given key."))?;
    Ok(Json(monetization::settings(&state, &saved)?))
}

#[api_handler(
    get,
    path = "/api/v1/apps/{key}/payments/in-app-config",
    params(("key" = String, Path, description = "Listing id or slug")),
    responses(
        (status = OK, body = InAppConfigView),
        (status = BAD_REQUEST, description = "Listing is not set up for in-app payments", body = ErrorResponse),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn retrieve_in_app_config(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
) -> Result<Json<InAppConfigView>, ApiError> {
    let listing = owned_listing(&state, &ctx, &key)?;
    Ok(Json(in_app::config(&state, &listing)?))
}

#[api_handler(
    post,
    path = "/api/v1/apps/{key}/payments/in-app-config",
    params(("key" = String, Path, description = "Listing id or slug")),
    responses(
        (status = OK, description = "Product secret regenerated", body = InAppConfigView),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn reset_in_app_config(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
) -> Result<Json<InAppConfigView>, ApiError> {
    let listing = owned_listing(&state, &ctx, &key)?;
    Ok(Json(in_app::reset_config_secret(&state, &listing).await?))
}

#[api_handler(
    get,
    path = "/api/v1/apps/{key}/payments/in-app-config/secret",
    params(("key" = String, Path, description = "Listing id or slug")),
    responses(
        (status = OK, description = "Product secret", body = String, content_type = "text/plain"),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn in_app_config_secret(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let listing = owned_listing(&state, &ctx, &key)?;
    let secret = in_app::config_secret(&state, &listing).await?;
    Ok(plain_text(secret))
}

#[api_handler(
    get,
    path = "/api/v1/apps/{key}/payments/portal",
    params(("key" = String, Path, description = "Listing id or slug")),
    responses(
        (status = NO_CONTENT, description = "Portal login URL in the Location header"),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn portal(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let slice = state.try_get_slice::<Payments>()?;
    let listing = owned_listing(&state, &ctx, &key)?;
    let link = state
        .store
        .listing_link(listing.id)
        .ok_or_else(|| ApiError::field("account", "No payment account for this app."))?;
    let account = state
        .store
        .account(link.account)
        .filter(|account| Some(account.owner) == ctx.user)
        .ok_or_else(|| ApiError::forbidden("You do not have permission to perform this action."))?;

    let login = remote("portal_login", state.billing.portal_login(&account).await)?;
    let url = mkt_billing::portal_url(&slice.portal_url, &account.account_id, &login)?;
    info!(listing = listing.id, account = account.id, "Portal login issued");

    Ok((StatusCode::NO_CONTENT, [(header::LOCATION, url)]).into_response())
}
