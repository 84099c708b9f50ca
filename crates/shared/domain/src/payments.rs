//! Payment accounts and their links to listings.

use crate::listing::{ListingId, UserId};
use serde::{Deserialize, Serialize};

pub type AccountId = u64;

/// Lifecycle of a payment account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountState {
    PendingTerms,
    Active,
    Cancelled,
}

/// Local record of an account held by the billing provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAccount {
    pub id: AccountId,
    pub owner: UserId,
    pub name: String,
    /// Provider-side identifier.
    pub account_id: String,
    /// Provider resource URI.
    pub uri: String,
    pub shared: bool,
    pub agreed_tos: bool,
    pub inactive: bool,
    pub created: i64,
}

impl PaymentAccount {
    #[must_use]
    pub const fn state(&self) -> AccountState {
        if self.inactive {
            AccountState::Cancelled
        } else if self.agreed_tos {
            AccountState::Active
        } else {
            AccountState::PendingTerms
        }
    }
}

/// Association of a listing with the account that receives its payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLink {
    pub listing: ListingId,
    pub account: AccountId,
    /// Provider product URI created for this listing.
    pub product_uri: String,
    pub disabled: bool,
}

/// A product sold from inside a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InAppProduct {
    pub id: u64,
    pub listing: ListingId,
    pub name: String,
    pub price_tier: u32,
    pub active: bool,
}

/// Developer credentials for the in-app payment API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InAppKey {
    pub owner: UserId,
    pub public_id: String,
    /// Provider resource holding the private secret.
    pub secret_uri: String,
}

/// Per-listing in-app configuration, holding the locally generated product secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InAppConfig {
    pub listing: ListingId,
    pub public_key: String,
    pub private_key: String,
}
