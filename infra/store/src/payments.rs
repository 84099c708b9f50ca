use crate::engine::{Store, Tables};
use crate::error::StoreError;
use mkt_domain::listing::{ListingId, ListingStatus, UserId};
use mkt_domain::payments::{
    AccountId, AccountLink, InAppConfig, InAppKey, InAppProduct, PaymentAccount,
};

/// Obligations that keep an account from being cancelled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountObligations {
    /// Listings linked to the account while it is shared.
    pub shared_with: Vec<ListingId>,
    /// Linked listings that sell in-app products.
    pub in_app_listings: Vec<ListingId>,
}

impl AccountObligations {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared_with.is_empty() && self.in_app_listings.is_empty()
    }
}

impl Store {
    pub fn insert_account(&self, mut account: PaymentAccount) -> PaymentAccount {
        let mut tables = self.tables.write();
        if account.id == 0 {
            account.id = tables.next_id();
        }
        tables.accounts.insert(account.id, account.clone());
        account
    }

    #[must_use]
    pub fn account(&self, id: AccountId) -> Option<PaymentAccount> {
        self.read(|t| t.accounts.get(&id).cloned())
    }

    /// Accounts the user owns plus shared accounts, excluding cancelled ones.
    #[must_use]
    pub fn usable_accounts(&self, user: UserId) -> Vec<PaymentAccount> {
        self.read(|t| {
            t.accounts
                .values()
                .filter(|a| !a.inactive && (a.owner == user || a.shared))
                .cloned()
                .collect()
        })
    }

    /// Active accounts owned by the user.
    #[must_use]
    pub fn accounts_owned_by(&self, user: UserId) -> Vec<PaymentAccount> {
        self.read(|t| {
            t.accounts.values().filter(|a| a.owner == user && !a.inactive).cloned().collect()
        })
    }

    /// # Errors
    /// Returns [`StoreError::NotFound`] when the account does not exist, or the error of `f`.
    pub fn update_account(
        &self,
        id: AccountId,
        f: impl FnOnce(&mut PaymentAccount) -> Result<(), StoreError>,
    ) -> Result<PaymentAccount, StoreError> {
        self.write(|t| {
            let account = t.account_mut(id)?;
            f(account)?;
            Ok(account.clone())
        })
    }

    /// Active links of an account.
    #[must_use]
    pub fn account_links(&self, account: AccountId) -> Vec<AccountLink> {
        self.read(|t| {
            t.account_links
                .iter()
                .filter(|l| l.account == account && !l.disabled)
                .cloned()
                .collect()
        })
    }

    #[must_use]
    pub fn listing_link(&self, listing: ListingId) -> Option<AccountLink> {
        self.read(|t| {
            t.account_links.iter().find(|l| l.listing == listing && !l.disabled).cloned()
        })
    }

    /// Replaces the active link of a listing.
    pub fn link_account(&self, link: AccountLink) {
        let mut tables = self.tables.write();
        for existing in tables.account_links.iter_mut().filter(|l| l.listing == link.listing) {
            existing.disabled = true;
        }
        tables.account_links.push(link);
    }

    /// Current obligations of an account.
    #[must_use]
    pub fn account_obligations(&self, account: AccountId) -> AccountObligations {
        self.read(|t| obligations(t, account))
    }

    /// Cancels an account locally: disables its links, marks linked listings incomplete and
    /// flags the account inactive. Fails when obligations appear in the meantime.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] for unknown accounts and [`StoreError::Unique`] when
    /// the account still has obligations.
    pub fn cancel_account(&self, account: AccountId) -> Result<Vec<ListingId>, StoreError> {
        self.write(|t| {
            if !obligations(t, account).is_empty() {
                return Err(StoreError::Unique {
                    message: "account has outstanding obligations".into(),
                    context: None,
                });
            }
            t.account_mut(account)?.inactive = true;

            let mut unlinked = Vec::new();
            for link in t.account_links.iter_mut().filter(|l| l.account == account && !l.disabled)
            {
                link.disabled = true;
                unlinked.push(link.listing);
            }
            for id in &unlinked {
                if let Some(listing) = t.listings.get_mut(id) {
                    listing.status = ListingStatus::Incomplete;
                }
            }
            Ok(unlinked)
        })
    }

    pub fn insert_in_app_product(&self, mut product: InAppProduct) -> InAppProduct {
        let mut tables = self.tables.write();
        if product.id == 0 {
            product.id = tables.next_id();
        }
        tables.in_app_products.push(product.clone());
        product
    }

    #[must_use]
    pub fn in_app_products(&self, listing: ListingId) -> Vec<InAppProduct> {
        self.read(|t| t.in_app_products.iter().filter(|p| p.listing == listing).cloned().collect())
    }

    #[must_use]
    pub fn in_app_key(&self, owner: UserId) -> Option<InAppKey> {
        self.read(|t| t.in_app_keys.get(&owner).cloned())
    }

    pub fn set_in_app_key(&self, key: InAppKey) {
        self.tables.write().in_app_keys.insert(key.owner, key);
    }

    #[must_use]
    pub fn in_app_config(&self, listing: ListingId) -> Option<InAppConfig> {
        self.read(|t| t.in_app_configs.get(&listing).cloned())
    }

    pub fn set_in_app_config(&self, config: InAppConfig) {
        self.tables.write().in_app_configs.insert(config.listing, config);
    }
}

fn obligations(t: &Tables, account: AccountId) -> AccountObligations {
    let Some(record) = t.accounts.get(&account) else {
        return AccountObligations::default();
    };
    let linked: Vec<ListingId> = t
        .account_links
        .iter()
        .filter(|l| l.account == account && !l.disabled)
        .map(|l| l.listing)
        .collect();

    let shared_with = if record.shared { linked.clone() } else { Vec::new() };

    let in_app_listings = linked
        .iter()
        .copied()
        .filter(|id| t.in_app_products.iter().any(|p| p.listing == *id && p.active))
        .collect();

    AccountObligations { shared_with, in_app_listings }
}
