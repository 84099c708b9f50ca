//! Billing provider integration.
//!
//! Payment accounts, seller terms, products and in-app keys live at a remote billing provider.
//! [`BillingProvider`] is the seam the payment orchestration talks to:
//!
//! - [`HttpBillingProvider`]: the REST client used in production.
//! - [`MemoryBillingProvider`]: an in-process ledger for local runs and tests.
//!
//! Provider rejections surface as [`BillingError::Rejected`] (HTTP 400 with the provider
//! payload); failures on the provider side as 502.

mod error;
mod http;
mod memory;
mod types;

pub use error::{BillingError, BillingErrorExt};
pub use http::HttpBillingProvider;
pub use memory::MemoryBillingProvider;
pub use types::{AccountDetails, PortalLogin, ProductSpec, RemoteAccount, RemoteKey, Terms};

use async_trait::async_trait;
use mkt_domain::listing::UserId;
use mkt_domain::payments::{InAppKey, PaymentAccount};

/// Operations offered by a billing provider.
#[async_trait]
pub trait BillingProvider: Send + Sync + std::fmt::Debug {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    async fn create_account(
        &self,
        owner: UserId,
        details: &AccountDetails,
    ) -> Result<RemoteAccount, BillingError>;

    async fn update_account(
        &self,
        account: &PaymentAccount,
        details: &AccountDetails,
    ) -> Result<(), BillingError>;

    async fn account_details(&self, account: &PaymentAccount)
    -> Result<AccountDetails, BillingError>;

    async fn terms(&self, account: &PaymentAccount) -> Result<Terms, BillingError>;

    async fn update_terms(&self, account: &PaymentAccount, accept: bool)
    -> Result<Terms, BillingError>;

    /// Registers a listing as a product of the account and returns the product uri.
    async fn create_product(
        &self,
        account: &PaymentAccount,
        product: &ProductSpec,
    ) -> Result<String, BillingError>;

    async fn update_product(&self, product_uri: &str, product: &ProductSpec)
    -> Result<(), BillingError>;

    async fn set_product_secret(&self, product_uri: &str, secret: &str)
    -> Result<(), BillingError>;

    async fn product_secret(&self, product_uri: &str) -> Result<String, BillingError>;

    async fn create_in_app_key(&self, owner: UserId) -> Result<RemoteKey, BillingError>;

    async fn reset_in_app_key(&self, key: &InAppKey) -> Result<(), BillingError>;

    async fn in_app_key_secret(&self, key: &InAppKey) -> Result<String, BillingError>;

    async fn portal_login(&self, account: &PaymentAccount) -> Result<PortalLogin, BillingError>;
}

/// Builds the developer portal URL for a login token.
///
/// # Errors
/// Returns [`BillingError::Internal`] when `base` is not a valid URL.
pub fn portal_url(base: &str, package_id: &str, login: &PortalLogin) -> Result<String, BillingError> {
    let url = reqwest::Url::parse_with_params(
        base,
        &[
            ("authenticationToken", login.authentication_token.as_str()),
            ("emailAddress", login.email_address.as_str()),
            ("packageId", package_id),
            ("personId", login.person_id.as_str()),
        ],
    )
    .map_err(|e| BillingError::from(format!("invalid portal url: {e}")))?;
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portal_url_encodes_login_parameters() {
        let login = PortalLogin {
            authentication_token: "tok en".to_owned(),
            email_address: "dev@example.com".to_owned(),
            person_id: "42".to_owned(),
        };
        let url = portal_url("https://portal.example.com/login", "7", &login).unwrap();
        assert_eq!(
            url,
            "https://portal.example.com/login?authenticationToken=tok+en&emailAddress=dev%40example.com&packageId=7&personId=42"
        );
    }

    #[test]
    fn invalid_portal_base_is_internal() {
        let login = PortalLogin {
            authentication_token: String::new(),
            email_address: String::new(),
            person_id: String::new(),
        };
        let err = portal_url("not a url", "1", &login).unwrap_err();
        assert!(matches!(err, BillingError::Internal { .. }));
        assert_eq!(err.http_status(), 500);
    }
}
