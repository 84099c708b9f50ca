use super::plain_text;
use crate::in_app::{self, IN_APP_KEY_PATH, key_view};
use crate::orchestrator::Orchestrator;
use crate::serializer::{ACCOUNT_PATH, AccountView, InAppKeyView, TermsView, account_uri};
use crate::validation::{AccountForm, TermsDecision};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use mkt_derive::{api_handler, api_model};
use mkt_domain::constants::PAYMENTS_TAG;
use mkt_domain::payments::AccountId;
use mkt_kernel::server::{ApiError, ApiState, ErrorResponse, RequestContext};

/// A payment account with the seller details held by the provider.
#[api_model]
pub struct AccountResponse {
    pub account: AccountView,
    pub details: AccountForm,
}

#[api_handler(
    get,
    path = "/api/v1/payments/account",
    params(("app_slug" = Option<String>, Query, description = "Listing the portal links are built for")),
    responses(
        (status = OK, body = Vec<AccountView>),
        (status = FORBIDDEN, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn list_accounts(
    State(state): State<ApiState>,
    ctx: RequestContext,
) -> Result<Json<Vec<AccountView>>, ApiError> {
    let orchestrator = Orchestrator::for_caller(&state, &ctx)?;
    let app_slug = ctx.params.get("app_slug").filter(|s| !s.is_empty());
    let views = orchestrator
        .list()
        .iter()
        .map(|account| AccountView::build(account, &state, &ctx, app_slug))
        .collect();

    Ok(Json(views))
}

#[api_handler(
    post,
    path = "/api/v1/payments/account",
    request_body = AccountForm,
    responses(
        (status = CREATED, body = AccountView),
        (status = BAD_REQUEST, description = "Local field errors, or the provider payload verbatim"),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn create_account(
    State(state): State<ApiState>,
    ctx: RequestContext,
    payload: Result<Json<AccountForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let orchestrator = Orchestrator::for_caller(&state, &ctx)?;
    let Json(form) = payload?;
    let account = orchestrator.create(&form).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, account_uri(account.id))],
        Json(AccountView::build(&account, &state, &ctx, None)),
    ))
}

#[api_handler(
    get,
    path = "/api/v1/payments/account/{id}",
    params(("id" = AccountId, Path, description = "Payment account id")),
    responses(
        (status = OK, body = AccountResponse),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn retrieve_account(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<AccountId>,
) -> Result<Json<AccountResponse>, ApiError> {
    let (account, details) = Orchestrator::for_caller(&state, &ctx)?.retrieve(id).await?;

    Ok(Json(AccountResponse {
        account: AccountView::build(&account, &state, &ctx, None),
        details: details.into(),
    }))
}

#[api_handler(
    put,
    path = "/api/v1/payments/account/{id}",
    params(("id" = AccountId, Path, description = "Payment account id")),
    request_body = AccountForm,
    responses(
        (status = OK, body = AccountView),
        (status = BAD_REQUEST, description = "Local field errors, or the provider payload verbatim"),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = CONFLICT, body = ErrorResponse),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn update_account(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<AccountId>,
    payload: Result<Json<AccountForm>, JsonRejection>,
) -> Result<Json<AccountView>, ApiError> {
    let orchestrator = Orchestrator::for_caller(&state, &ctx)?;
    let Json(form) = payload?;
    let account = orchestrator.update(id, &form).await?;

    Ok(Json(AccountView::build(&account, &state, &ctx, None)))
}

#[api_handler(
    delete,
    path = "/api/v1/payments/account/{id}",
    params(("id" = AccountId, Path, description = "Payment account id")),
    responses(
        (status = NO_CONTENT, description = "Account cancelled, linked listings are incomplete"),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = CONFLICT, description = "Account still has obligations", body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn cancel_account(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<AccountId>,
) -> Result<StatusCode, ApiError> {
    Orchestrator::for_caller(&state, &ctx)?.cancel(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[api_handler(
    get,
    path = "/api/v1/payments/account/{id}/terms",
    params(("id" = AccountId, Path, description = "Payment account id")),
    responses(
        (status = OK, body = TermsView),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = CONFLICT, body = ErrorResponse),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn retrieve_terms(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<AccountId>,
) -> Result<Json<TermsView>, ApiError> {
    let (account, terms) = Orchestrator::for_caller(&state, &ctx)?.terms(id).await?;
    Ok(Json(TermsView::build(terms, &account)))
}

#[api_handler(
    post,
    path = "/api/v1/payments/account/{id}/terms",
    params(("id" = AccountId, Path, description = "Payment account id")),
    request_body = TermsDecision,
    responses(
        (status = OK, body = TermsView),
        (status = BAD_REQUEST, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
        (status = CONFLICT, body = ErrorResponse),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn update_terms(
    State(state): State<ApiState>,
    ctx: RequestContext,
    Path(id): Path<AccountId>,
    payload: Result<Json<TermsDecision>, JsonRejection>,
) -> Result<Json<TermsView>, ApiError> {
    let orchestrator = Orchestrator::for_caller(&state, &ctx)?;
    let Json(decision) = payload?;
    let (account, terms) = orchestrator.update_terms(id, decision.accept).await?;

    Ok(Json(TermsView::build(terms, &account)))
}

#[api_handler(
    get,
    path = "/api/v1/payments/in-app-keys",
    responses(
        (status = OK, body = InAppKeyView),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = NOT_FOUND, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn retrieve_in_app_key(
    State(state): State<ApiState>,
    ctx: RequestContext,
) -> Result<Json<InAppKeyView>, ApiError> {
    let key = in_app::key(&state, ctx.require_user()?)?;
    Ok(Json(key_view(&key)))
}

#[api_handler(
    post,
    path = "/api/v1/payments/in-app-keys",
    responses(
        (status = CREATED, description = "Key created", body = InAppKeyView),
        (status = OK, description = "Secret of the existing key reset", body = InAppKeyView),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn create_in_app_key(
    State(state): State<ApiState>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let (key, created) = in_app::create_or_reset_key(&state, ctx.require_user()?).await?;
    let body = Json(key_view(&key));

    if created {
        Ok((StatusCode::CREATED, [(header::LOCATION, IN_APP_KEY_PATH)], body).into_response())
    } else {
        Ok(body.into_response())
    }
}

#[api_handler(
    get,
    path = "/api/v1/payments/in-app-keys/secret",
    responses(
        (status = OK, description = "Private key secret", body = String, content_type = "text/plain"),
        (status = FORBIDDEN, body = ErrorResponse),
        (status = BAD_GATEWAY, body = ErrorResponse),
    ),
    tag = PAYMENTS_TAG,
)]
pub(super) async fn in_app_key_secret(
    State(state): State<ApiState>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let secret = in_app::key_secret(&state, ctx.require_user()?).await?;
    Ok(plain_text(secret))
}
