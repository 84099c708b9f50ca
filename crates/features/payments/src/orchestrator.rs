//! Payment account lifecycle.
//!
//! ```text
//! (no account) --create--> pending terms --accept--> active --cancel--> cancelled
//!                               ^                      |
//!                               +-------reject---------+
//! ```
//!
//! Every transition that concerns the provider calls it first and records the outcome
//! locally only when the call succeeded. Cancellation is local: it is refused while the
//! account still has obligations.

use crate::validation::{AccountForm, validate_account};
use chrono::Utc;
use mkt_billing::{AccountDetails, BillingError, Terms};
use mkt_domain::listing::{ListingId, UserId};
use mkt_domain::payments::{AccountId, PaymentAccount};
use mkt_kernel::server::{ApiError, ApiState, RequestContext};
use mkt_store::StoreError;
use tracing::{error, info};

const CANNOT_CANCEL: &str = "Cannot cancel account: it is shared with listings or sells in-app products.";

/// Logs a failed provider call and converts it for the client.
pub(crate) fn remote<T>(op: &'static str, result: Result<T, BillingError>) -> Result<T, ApiError> {
    result.map_err(|err| {
        error!(op, error = %err, "Billing provider call failed");
        ApiError::from(err)
    })
}

/// Payment account operations on behalf of one developer.
#[derive(Debug, Clone, Copy)]
pub struct Orchestrator<'a> {
    state: &'a ApiState,
    user: UserId,
}

impl<'a> Orchestrator<'a> {
    /// # Errors
    /// Returns [`ApiError::Forbidden`] for anonymous callers.
    pub fn for_caller(state: &'a ApiState, ctx: &RequestContext) -> Result<Self, ApiError> {
        Ok(Self { state, user: ctx.require_user()? })
    }

    #[must_use]
    pub const fn user(&self) -> UserId {
        self.user
    }

    /// An account of the caller. Accounts of other developers are reported as missing.
    ///
    /// # Errors
    /// Returns [`ApiError::NotFound`] when the caller owns no such account.
    pub fn owned(&self, id: AccountId) -> Result<PaymentAccount, ApiError> {
        self.state
            .store
            .account(id)
            .filter(|account| account.owner == self.user)
            .ok_or_else(|| ApiError::not_found("No payment account found."))
    }

    fn active(&self, id: AccountId) -> Result<PaymentAccount, ApiError> {
        let account = self.owned(id)?;
        if account.inactive {
            return Err(ApiError::conflict("This payment account has been cancelled."));
        }
        Ok(account)
    }

    /// Validates the form, creates the provider account and records it as pending terms.
    ///
    /// # Errors
    /// Returns [`ApiError::Validation`] for local form errors, [`ApiError::Rejected`] with the
    /// provider payload when the provider refuses the details and [`ApiError::BadGateway`]
    /// when it cannot be reached.
    pub async fn create(&self, form: &AccountForm) -> Result<PaymentAccount, ApiError> {
        let details = validate_account(form)?;
        let remote_account =
            remote("create_account", self.state.billing.create_account(self.user, &details).await)?;

        let account = self.state.store.insert_account(PaymentAccount {
            id: 0,
            owner: self.user,
            name: details.account_name,
            account_id: remote_account.account_id,
            uri: remote_account.uri,
            shared: false,
            agreed_tos: false,
            inactive: false,
            created: Utc::now().timestamp(),
        });
        info!(account = account.id, user = self.user, "Payment account created");
        Ok(account)
    }

    /// The account together with the seller details held by the provider.
    ///
    /// # Errors
    /// Returns [`ApiError::NotFound`] for foreign accounts and provider errors otherwise.
    pub async fn retrieve(&self, id: AccountId) -> Result<(PaymentAccount, AccountDetails), ApiError> {
        let account = self.owned(id)?;
        let details = remote("account_details", self.state.billing.account_details(&account).await)?;
        Ok((account, details))
    }

    /// Validates the form and forwards it to the provider.
    ///
    /// # Errors
    /// Same as [`Orchestrator::create`]; cancelled accounts conflict.
    pub async fn update(&self, id: AccountId, form: &AccountForm) -> Result<PaymentAccount, ApiError> {
        let account = self.active(id)?;
        let details = validate_account(form)?;
        remote("update_account", self.state.billing.update_account(&account, &details).await)?;

        let name = details.account_name;
        let account = self.state.store.update_account(account.id, |stored| {
            stored.name = name;
            Ok(())
        })?;
        info!(account = account.id, "Payment account updated");
        Ok(account)
    }

    /// # Errors
    /// Returns [`ApiError::Conflict`] for cancelled accounts and provider errors otherwise.
    pub async fn terms(&self, id: AccountId) -> Result<(PaymentAccount, Terms), ApiError> {
        let account = self.active(id)?;
        let terms = remote("terms", self.state.billing.terms(&account).await)?;
        Ok((account, terms))
    }

    /// Accepts or rejects the provider terms. Accepting activates the account, rejecting
    /// returns it to pending terms.
    ///
    /// # Errors
    /// Returns [`ApiError::Conflict`] for cancelled accounts and provider errors otherwise.
    pub async fn update_terms(&self, id: AccountId, accept: bool) -> Result<(PaymentAccount, Terms), ApiError> {
        let account = self.active(id)?;
        let terms = remote("update_terms", self.state.billing.update_terms(&account, accept).await)?;

        let accepted = terms.accepted;
        let account = self.state.store.update_account(account.id, |stored| {
            stored.agreed_tos = accepted;
            Ok(())
        })?;
        info!(account = account.id, accepted, "Payment account terms updated");
        Ok((account, terms))
    }

    /// Cancels the account, unlinking its listings. Returns the listings that lost their
    /// account; they are now incomplete.
    ///
    /// # Errors
    /// Returns [`ApiError::Conflict`] while the account is shared with listings or one of its
    /// listings sells in-app products.
    pub async fn cancel(&self, id: AccountId) -> Result<Vec<ListingId>, ApiError> {
        let account = self.owned(id)?;
        if !self.state.store.account_obligations(account.id).is_empty() {
            info!(account = account.id, "Could not cancel account");
            return Err(ApiError::conflict(CANNOT_CANCEL));
        }

        let unlinked = self.state.store.cancel_account(account.id).map_err(|err| match err {
            StoreError::Unique { .. } => ApiError::conflict(CANNOT_CANCEL),
            other => ApiError::from(other),
        })?;
        self.state.reindex(unlinked.iter().copied()).await;
        info!(account = account.id, unlinked = unlinked.len(), "Payment account cancelled");
        Ok(unlinked)
    }

    /// Active accounts of the caller.
    #[must_use]
    pub fn list(&self) -> Vec<PaymentAccount> {
        let mut accounts = self.state.store.accounts_owned_by(self.user);
        accounts.sort_by_key(|a| a.id);
        accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkt_billing::MemoryBillingProvider;
    use mkt_domain::config::ApiConfig;
    use mkt_domain::listing::{Listing, ListingStatus};
    use mkt_domain::payments::{AccountLink, AccountState, InAppProduct};
    use mkt_kernel::server::QueryParams;
    use mkt_domain::catalog::Region;
    use std::sync::Arc;

    fn context(user: UserId) -> RequestContext {
        RequestContext {
            user: Some(user),
            region: Region::worldwide(),
            carrier: None,
            lang: "en-US".to_owned(),
            params: QueryParams::default(),
            profile: None,
            path: "/api/v1/payments/account".to_owned(),
        }
    }

    fn form() -> AccountForm {
        AccountForm {
            account_name: "Stars".to_owned(),
            company_name: "Stars Inc".to_owned(),
            vendor_name: "Stars".to_owned(),
            finance_email: "finance@stars.example.com".to_owned(),
            support_email: "help@stars.example.com".to_owned(),
            address: "1 Orbit Way".to_owned(),
            city: "Lisbon".to_owned(),
            postcode: "1000".to_owned(),
            country_iso: "PRT".to_owned(),
            currency_iso: "EUR".to_owned(),
            bank_account_number: "PT50000201231234567890154".to_owned(),
            bank_name: "Banco".to_owned(),
            vat_number: None,
        }
    }

    fn state(billing: Arc<MemoryBillingProvider>) -> ApiState {
        ApiState::builder().config(ApiConfig::default()).billing(billing).build().unwrap()
    }

    #[tokio::test]
    async fn lifecycle_follows_the_terms() {
        let state = state(Arc::new(MemoryBillingProvider::new()));
        let ctx = context(5);
        let orchestrator = Orchestrator::for_caller(&state, &ctx).unwrap();

        let account = orchestrator.create(&form()).await.unwrap();
        assert_eq!(account.state(), AccountState::PendingTerms);

        let (account, terms) = orchestrator.update_terms(account.id, true).await.unwrap();
        assert!(terms.accepted);
        assert_eq!(account.state(), AccountState::Active);

        let (account, _) = orchestrator.update_terms(account.id, false).await.unwrap();
        assert_eq!(account.state(), AccountState::PendingTerms);

        orchestrator.cancel(account.id).await.unwrap();
        assert_eq!(state.store.account(account.id).unwrap().state(), AccountState::Cancelled);
        let err = orchestrator.terms(account.id).await.unwrap_err();
        assert_eq!(err.http_status(), 409);
        assert!(orchestrator.list().is_empty());
    }

    #[tokio::test]
    async fn outage_leaves_no_local_account() {
        let billing = Arc::new(MemoryBillingProvider::new());
        billing.fail_on("create_account");
        let state = state(billing);
        let ctx = context(5);

        let err = Orchestrator::for_caller(&state, &ctx).unwrap().create(&form()).await.unwrap_err();
        assert_eq!(err.http_status(), 502);
        assert!(state.store.accounts_owned_by(5).is_empty());
    }

    #[tokio::test]
    async fn in_app_products_block_cancellation() {
        let state = state(Arc::new(MemoryBillingProvider::new()));
        let ctx = context(5);
        let orchestrator = Orchestrator::for_caller(&state, &ctx).unwrap();
        let account = orchestrator.create(&form()).await.unwrap();
        let listing = state.store.insert_listing(Listing {
            status: ListingStatus::Public,
            owners: [5].into(),
            ..Listing::default()
        });
        state.store.link_account(AccountLink {
            listing: listing.id,
            account: account.id,
            product_uri: "/products/1/".to_owned(),
            disabled: false,
        });
        state.store.insert_in_app_product(InAppProduct {
            id: 0,
            listing: listing.id,
            name: "Gems".to_owned(),
            price_tier: 1,
            active: true,
        });

        let err = orchestrator.cancel(account.id).await.unwrap_err();
        assert_eq!(err.http_status(), 409);
        assert!(state.store.listing_link(listing.id).is_some());
        assert_eq!(state.store.listing(listing.id).unwrap().status, ListingStatus::Public);
    }

    #[tokio::test]
    async fn cancelling_unlinks_listings() {
        let state = state(Arc::new(MemoryBillingProvider::new()));
        let ctx = context(5);
        let orchestrator = Orchestrator::for_caller(&state, &ctx).unwrap();
        let account = orchestrator.create(&form()).await.unwrap();
        let listing = state.store.insert_listing(Listing { status: ListingStatus::Public, ..Listing::default() });
        state.store.link_account(AccountLink {
            listing: listing.id,
            account: account.id,
            product_uri: "/products/1/".to_owned(),
            disabled: false,
        });

        assert_eq!(orchestrator.cancel(account.id).await.unwrap(), vec![listing.id]);
        assert_eq!(state.store.listing(listing.id).unwrap().status, ListingStatus::Incomplete);
        assert!(state.store.listing_link(listing.id).is_none());
    }

    #[test]
    fn foreign_accounts_are_missing() {
        let state = state(Arc::new(MemoryBillingProvider::new()));
        let account = state.store.insert_account(PaymentAccount {
            id: 0,
            owner: 6,
            name: "Other".to_owned(),
            account_id: "6-1".to_owned(),
            uri: "/accounts/1/".to_owned(),
            shared: true,
            agreed_tos: true,
            inactive: false,
            created: 0,
        });
        let ctx = context(5);
        let err = Orchestrator::for_caller(&state, &ctx).unwrap().owned(account.id).unwrap_err();
        assert_eq!(err.http_status(), 404);
    }
}
