//! In-app payment credentials.
//!
//! Developers hold one key pair for the in-app payment API; the secret stays with the
//! provider. Listings with an in-app premium type additionally get a product secret, which is
//! generated here and pushed to the provider product of the listing's payment account.

use crate::orchestrator::remote;
use crate::serializer::{InAppConfigView, InAppKeyView};
use mkt_domain::constants::IN_APP_SECRET_LENGTH;
use mkt_domain::listing::{Listing, UserId};
use mkt_domain::payments::{AccountLink, InAppConfig, InAppKey};
use mkt_kernel::safe_nanoid;
use mkt_kernel::server::{ApiError, ApiState};
use tracing::info;

pub const IN_APP_KEY_PATH: &str = "/api/v1/payments/in-app-keys";

#[must_use]
pub fn key_view(key: &InAppKey) -> InAppKeyView {
    InAppKeyView { public_id: key.public_id.clone(), secret_url: format!("{IN_APP_KEY_PATH}/secret") }
}

/// The key of `user`.
///
/// # Errors
/// Returns [`ApiError::NotFound`] when no key was created yet.
pub fn key(state: &ApiState, user: UserId) -> Result<InAppKey, ApiError> {
    state.store.in_app_key(user).ok_or_else(|| ApiError::not_found("No in-app key has been created yet."))
}

/// Creates the key of `user`, or resets its secret when it exists. Returns the key and
/// whether it was created.
///
/// # Errors
/// Returns provider errors.
pub async fn create_or_reset_key(state: &ApiState, user: UserId) -> Result<(InAppKey, bool), ApiError> {
    if let Some(key) = state.store.in_app_key(user) {
        remote("reset_in_app_key", state.billing.reset_in_app_key(&key).await)?;
        info!(user, "In-app key secret reset");
        return Ok((key, false));
    }

    let remote_key = remote("create_in_app_key", state.billing.create_in_app_key(user).await)?;
    let key = InAppKey { owner: user, public_id: remote_key.public_id, secret_uri: remote_key.uri };
    state.store.set_in_app_key(key.clone());
    info!(user, "In-app key created");
    Ok((key, true))
}

/// # Errors
/// Returns [`ApiError::Forbidden`] when `user` has no key, and provider errors.
pub async fn key_secret(state: &ApiState, user: UserId) -> Result<String, ApiError> {
    let key = state.store.in_app_key(user).ok_or_else(|| ApiError::forbidden("You do not have an in-app key."))?;
    remote("in_app_key_secret", state.billing.in_app_key_secret(&key).await)
}

/// The payment link of a listing configured for in-app payments.
///
/// # Errors
/// Returns [`ApiError::Validation`] when the listing does not use an in-app premium type or has
/// no payment account.
pub fn in_app_link(state: &ApiState, listing: &Listing) -> Result<AccountLink, ApiError> {
    if !listing.premium_type().has_in_app() {
        return Err(ApiError::field("premium_type", "Your app is not configured for in-app payments."));
    }
    state
        .store
        .listing_link(listing.id)
        .ok_or_else(|| ApiError::field("account", "No payment account for this app."))
}

#[must_use]
pub fn config_view(listing: &Listing, link: &AccountLink, config: Option<&InAppConfig>) -> InAppConfigView {
    InAppConfigView {
        listing: listing.id,
        public_key: config.map_or_else(|| link.product_uri.clone(), |c| c.public_key.clone()),
        has_secret: config.is_some(),
        secret_url: format!("/api/v1/apps/{}/payments/in-app-config/secret", listing.slug),
    }
}

/// Current in-app configuration of `listing`.
///
/// # Errors
/// See [`in_app_link`].
pub fn config(state: &ApiState, listing: &Listing) -> Result<InAppConfigView, ApiError> {
    let link = in_app_link(state, listing)?;
    Ok(config_view(listing, &link, state.store.in_app_config(listing.id).as_ref()))
}

/// Generates a fresh product secret and stores it with the provider product.
///
/// # Errors
/// See [`in_app_link`]; provider errors leave the previous secret in place.
pub async fn reset_config_secret(state: &ApiState, listing: &Listing) -> Result<InAppConfigView, ApiError> {
    let link = in_app_link(state, listing)?;
    let secret = safe_nanoid!(IN_APP_SECRET_LENGTH);
    remote("set_product_secret", state.billing.set_product_secret(&link.product_uri, &secret).await)?;

    let public_key = state
        .store
        .in_app_config(listing.id)
        .map_or_else(|| link.product_uri.clone(), |c| c.public_key);
    let config = InAppConfig { listing: listing.id, public_key, private_key: secret };
    state.store.set_in_app_config(config.clone());
    info!(listing = listing.id, "In-app product secret reset");
    Ok(config_view(listing, &link, Some(&config)))
}

/// The product secret as held by the provider.
///
/// # Errors
/// See [`in_app_link`], plus provider errors.
pub async fn config_secret(state: &ApiState, listing: &Listing) -> Result<String, ApiError> {
    let link = in_app_link(state, listing)?;
    remote("product_secret", state.billing.product_secret(&link.product_uri).await)
}
