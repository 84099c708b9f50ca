//! Core store engine: a set of typed tables guarded by a single read/write lock.
//!
//! Every multi-record rule (collection slot uniqueness, account cancellation) runs inside
//! [`Store::write`] so the check and the mutation observe the same snapshot.

use crate::builder::StoreBuilder;
use crate::error::StoreError;
use mkt_domain::collection::{Collection, CollectionId};
use mkt_domain::listing::{Listing, ListingId, UserId};
use mkt_domain::payments::{
    AccountId, AccountLink, InAppConfig, InAppKey, InAppProduct, PaymentAccount,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

/// All persisted records.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub listings: BTreeMap<ListingId, Listing>,
    pub collections: BTreeMap<CollectionId, Collection>,
    pub accounts: BTreeMap<AccountId, PaymentAccount>,
    pub account_links: Vec<AccountLink>,
    pub in_app_products: Vec<InAppProduct>,
    pub in_app_keys: BTreeMap<UserId, InAppKey>,
    pub in_app_configs: BTreeMap<ListingId, InAppConfig>,
    sequence: u64,
}

impl Tables {
    /// Allocates the next record id. Ids are unique across tables.
    pub fn next_id(&mut self) -> u64 {
        let floor = [
            self.listings.keys().next_back(),
            self.collections.keys().next_back(),
            self.accounts.keys().next_back(),
        ]
        .into_iter()
        .flatten()
        .copied()
        .max()
        .unwrap_or(0);
        self.sequence = self.sequence.max(floor) + 1;
        self.sequence
    }

    /// # Errors
    /// Returns [`StoreError::NotFound`] for unknown ids.
    pub fn listing_mut(&mut self, id: ListingId) -> Result<&mut Listing, StoreError> {
        self.listings.get_mut(&id).ok_or_else(|| StoreError::not_found("listing", id))
    }

    /// # Errors
    /// Returns [`StoreError::NotFound`] for unknown ids.
    pub fn collection_mut(&mut self, id: CollectionId) -> Result<&mut Collection, StoreError> {
        self.collections.get_mut(&id).ok_or_else(|| StoreError::not_found("collection", id))
    }

    /// # Errors
    /// Returns [`StoreError::NotFound`] for unknown ids.
    pub fn account_mut(&mut self, id: AccountId) -> Result<&mut PaymentAccount, StoreError> {
        self.accounts.get_mut(&id).ok_or_else(|| StoreError::not_found("payment account", id))
    }
}

/// The internal shared state of a [`Store`] instance.
#[derive(Debug, Default)]
pub struct StoreInner {
    pub(crate) tables: RwLock<Tables>,
}

/// A thread-safe handle to the primary store.
///
/// The handle is reference-counted and can be cheaply cloned across tasks.
///
/// # Example
///
/// ```rust
/// use mkt_domain::listing::Listing;
/// use mkt_store::Store;
///
/// let store = Store::in_memory();
/// let listing = store.insert_listing(Listing { slug: "maps".to_owned(), ..Listing::default() });
/// assert_eq!(store.listing(listing.id).map(|l| l.slug), Some("maps".to_owned()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
}

impl Deref for Store {
    type Target = StoreInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Store {
    #[must_use = "The store is not opened until you call .open()"]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// An empty store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_tables(Tables::default())
    }

    #[must_use]
    pub fn from_tables(tables: Tables) -> Self {
        Self { inner: Arc::new(StoreInner { tables: RwLock::new(tables) }) }
    }

    /// Runs `f` against a consistent read snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        f(&self.tables.read())
    }

    /// Runs `f` with exclusive access. Checks and writes inside `f` are atomic with respect to
    /// every other store call.
    ///
    /// # Errors
    /// Propagates the error returned by `f`; partial mutations made before the error are kept.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        f(&mut self.tables.write())
    }

    /// Copies the current contents, e.g. for export.
    #[must_use]
    pub fn snapshot(&self) -> Tables {
        self.read(Clone::clone)
    }
}
