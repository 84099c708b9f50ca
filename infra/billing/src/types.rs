//! Wire types exchanged with the billing provider.

use mkt_domain::listing::{ListingId, UserId};
use serde::{Deserialize, Serialize};

/// Seller details sent when creating or updating an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDetails {
    pub account_name: String,
    pub company_name: String,
    pub vendor_name: String,
    pub finance_email: String,
    pub support_email: String,
    pub address: String,
    pub city: String,
    pub postcode: String,
    /// ISO 3166-1 alpha-3 country code.
    pub country_iso: String,
    /// ISO 4217 currency code.
    pub currency_iso: String,
    pub bank_account_number: String,
    pub bank_name: String,
    pub vat_number: Option<String>,
}

/// Identifiers of a newly created provider account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAccount {
    pub account_id: String,
    pub uri: String,
}

/// Terms of service state of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terms {
    pub text: String,
    pub accepted: bool,
}

/// Product registration for a listing sold through an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub listing: ListingId,
    pub name: String,
    /// Price tier id; `None` for free listings with in-app purchases.
    pub price_tier: Option<u32>,
}

/// A developer in-app key as known by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteKey {
    pub owner: UserId,
    pub public_id: String,
    pub uri: String,
}

/// Portal login token returned for an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalLogin {
    pub authentication_token: String,
    pub email_address: String,
    pub person_id: String,
}
