//! Payment representations sent to clients.

use mkt_billing::Terms;
use mkt_derive::api_model;
use mkt_domain::catalog::PriceTier;
use mkt_domain::listing::{Listing, ListingId};
use mkt_domain::payments::{AccountId, AccountState, PaymentAccount};
use mkt_kernel::server::{ApiState, RequestContext};

/// Base path of the payment account resource.
pub const ACCOUNT_PATH: &str = "/api/v1/payments/account";

#[must_use]
pub fn account_uri(id: AccountId) -> String {
    format!("{ACCOUNT_PATH}/{id}")
}

/// Portal redirect of a listing's payment account.
#[must_use]
pub fn portal_uri(app_slug: &str) -> String {
    format!("/api/v1/apps/{app_slug}/payments/portal")
}

#[must_use]
pub const fn state_name(state: AccountState) -> &'static str {
    match state {
        AccountState::PendingTerms => "pending_terms",
        AccountState::Active => "active",
        AccountState::Cancelled => "cancelled",
    }
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct AccountView {
    pub id: AccountId,
    pub name: String,
    pub resource_uri: String,
    pub agreement_url: String,
    /// `accepted` or `rejected`.
    pub agreement: String,
    pub state: String,
    pub shared: bool,
    /// Names of the listings paid into this account.
    pub app_names: Vec<String>,
    pub portal_url: Option<String>,
}

impl AccountView {
    /// Serializes `account`; `app_slug` selects the listing the portal link is built for.
    #[must_use]
    pub fn build(account: &PaymentAccount, state: &ApiState, ctx: &RequestContext, app_slug: Option<&str>) -> Self {
        let app_names = state
            .store
            .account_links(account.id)
            .into_iter()
            .filter_map(|link| state.store.listing(link.listing))
            .map(|listing| display_name(&listing, ctx))
            .collect();

        Self {
            id: account.id,
            name: account.name.clone(),
            resource_uri: account_uri(account.id),
            agreement_url: format!("{}/terms", account_uri(account.id)),
            agreement: if account.agreed_tos { "accepted" } else { "rejected" }.to_owned(),
            state: state_name(account.state()).to_owned(),
            shared: account.shared,
            app_names,
            portal_url: app_slug.map(portal_uri),
        }
    }
}

fn display_name(listing: &Listing, ctx: &RequestContext) -> String {
    listing
        .name
        .localized(&ctx.lang, &listing.default_locale)
        .unwrap_or(&listing.slug)
        .to_owned()
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct TermsView {
    pub text: String,
    pub accepted: bool,
    pub state: String,
}

impl TermsView {
    #[must_use]
    pub fn build(terms: Terms, account: &PaymentAccount) -> Self {
        Self { text: terms.text, accepted: terms.accepted, state: state_name(account.state()).to_owned() }
    }
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct PriceTierView {
    pub id: u32,
    pub price: String,
}

/// Current monetization settings of a listing.
#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct MonetizationView {
    pub premium_type: String,
    pub price: Option<String>,
    /// Premium or in-app listing.
    pub is_paid: bool,
    /// A free listing whose platforms rule out payments.
    pub cannot_be_paid: bool,
    /// Regions the listing is offered in.
    pub regions: Vec<String>,
    /// Regions where a paid listing is sold.
    pub paid_regions: Vec<String>,
    pub price_tiers: Vec<PriceTierView>,
    pub account: Option<AccountId>,
    /// Free listings that upsell to this one.
    pub upsell_from: Vec<ListingId>,
    pub platforms: Vec<String>,
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct InAppKeyView {
    pub public_id: String,
    pub secret_url: String,
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct InAppConfigView {
    pub listing: ListingId,
    pub public_key: String,
    pub has_secret: bool,
    pub secret_url: String,
}

/// Active tiers in display order.
#[must_use]
pub fn price_tiers() -> Vec<PriceTierView> {
    PriceTier::active().map(|t| PriceTierView { id: t.id, price: t.price() }).collect()
}
