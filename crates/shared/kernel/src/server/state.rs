use axum::extract::FromRef;
use fxhash::FxHashMap;
use mkt_billing::{BillingProvider, MemoryBillingProvider};
use mkt_domain::config::ApiConfig;
use mkt_domain::listing::ListingId;
use mkt_domain::registry::{FeatureSlice, InitializedSlice};
use mkt_index::{IndexError, ListingDocument, MemoryIndex, SearchIndex};
use mkt_store::Store;
use std::any::TypeId;
use std::borrow::Cow;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[mkt_derive::mkt_error]
pub enum ApiStateError {
    #[error("State validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    #[error("State missing feature slice{}: {message}", format_context(.context))]
    MissingSlice { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[derive(Debug)]
pub struct ApiStateInner {
    pub config: ApiConfig,
    pub store: Store,
    pub index: Arc<dyn SearchIndex>,
    pub billing: Arc<dyn BillingProvider>,
    slices: FxHashMap<TypeId, InitializedSlice>,
}

#[derive(Debug, Clone)]
pub struct ApiState {
    inner: Arc<ApiStateInner>,
}

impl ApiState {
    #[must_use]
    pub fn builder() -> ApiStateBuilder {
        ApiStateBuilder::default()
    }

    #[must_use]
    pub fn get_slice<T: FeatureSlice>(&self) -> Option<&T> {
        self.inner
            .slices
            .get(&TypeId::of::<T>())
            .and_then(|initialized| initialized.state.as_any().downcast_ref::<T>())
    }

    /// Returns a reference to the slice if it is registered.
    ///
    /// # Errors
    /// Returns an error if the slice is not registered.
    pub fn try_get_slice<T: FeatureSlice>(&self) -> Result<&T, ApiStateError> {
        self.get_slice::<T>().ok_or_else(|| ApiStateError::MissingSlice {
            message: std::any::type_name::<T>().into(),
            context: None,
        })
    }

    /// Iterates over registered slice names (for diagnostics).
    pub fn slice_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.inner.slices.values().map(|slice| slice.name)
    }

    /// Brings the index copy of `ids` in line with the store. Listings missing from the store
    /// are removed from the index.
    ///
    /// The index is a derived replica, so failures are logged and not returned.
    pub async fn reindex(&self, ids: impl IntoIterator<Item = ListingId>) {
        let mut documents = Vec::new();
        for id in ids {
            match self.store.listing(id) {
                Some(listing) => {
                    let memberships = self.store.memberships(id);
                    documents.push(ListingDocument::from_listing(&listing, &memberships));
                },
                None => {
                    if let Err(err) = self.index.remove(id).await {
                        warn!(listing = id, error = %err, "Failed to drop listing from the index");
                    }
                },
            }
        }

        if documents.is_empty() {
            return;
        }
        let count = documents.len();
        match self.index.upsert(documents).await {
            Ok(()) => debug!(count, backend = self.index.backend(), "Listings reindexed"),
            Err(err) => warn!(count, error = %err, "Failed to refresh listings in the index"),
        }
    }

    /// Indexes every stored listing.
    ///
    /// # Errors
    /// Returns [`IndexError`] when the backend rejects the batch.
    pub async fn reindex_all(&self) -> Result<usize, IndexError> {
        let documents: Vec<_> = self
            .store
            .all_listings()
            .iter()
            .map(|listing| {
                ListingDocument::from_listing(listing, &self.store.memberships(listing.id))
            })
            .collect();
        let count = documents.len();
        self.index.upsert(documents).await?;
        info!(count, backend = self.index.backend(), "Search index rebuilt");
        Ok(count)
    }
}

impl Deref for ApiState {
    type Target = ApiStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FromRef<ApiState> for ApiConfig {
    fn from_ref(state: &ApiState) -> Self {
        state.inner.config.clone()
    }
}

impl FromRef<ApiState> for Store {
    fn from_ref(state: &ApiState) -> Self {
        state.inner.store.clone()
    }
}

#[derive(Debug, Default)]
pub struct ApiStateBuilder {
    config: Option<ApiConfig>,
    store: Option<Store>,
    index: Option<Arc<dyn SearchIndex>>,
    billing: Option<Arc<dyn BillingProvider>>,
    slices: FxHashMap<TypeId, InitializedSlice>,
}

impl ApiStateBuilder {
    #[must_use]
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.index = Some(index);
        self
    }

    #[must_use]
    pub fn billing(mut self, billing: Arc<dyn BillingProvider>) -> Self {
        self.billing = Some(billing);
        self
    }

    #[must_use]
    pub fn register_slice(mut self, slice: InitializedSlice) -> Self {
        self.slices.insert(slice.id, slice);
        self
    }

    /// Registers multiple slices at once.
    #[must_use]
    pub fn register_slices<I>(mut self, slices: I) -> Self
    where
        I: IntoIterator<Item = InitializedSlice>,
    {
        for slice in slices {
            self.slices.insert(slice.id, slice);
        }
        self
    }

    /// Finalizes the state. The store, index and billing provider default to in-process
    /// implementations.
    ///
    /// # Errors
    /// Returns [`ApiStateError::Validation`] when no configuration was provided.
    pub fn build(self) -> Result<ApiState, ApiStateError> {
        let config = self.config.ok_or_else(|| ApiStateError::Validation {
            message: "ApiConfig not provided".into(),
            context: None,
        })?;
        let store = self.store.unwrap_or_default();
        let index = self.index.unwrap_or_else(|| Arc::new(MemoryIndex::new()));
        let billing = self.billing.unwrap_or_else(|| Arc::new(MemoryBillingProvider::new()));

        Ok(ApiState {
            inner: Arc::new(ApiStateInner { config, store, index, billing, slices: self.slices }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkt_domain::collection::Collection;
    use mkt_domain::listing::{Listing, ListingStatus};
    use mkt_index::{Filter, SearchQuery};

    #[test]
    fn config_is_required() {
        let err = ApiState::builder().build().unwrap_err();
        assert!(matches!(err, ApiStateError::Validation { .. }));
    }

    #[tokio::test]
    async fn reindex_follows_the_store() {
        let state = ApiState::builder().config(ApiConfig::default()).build().unwrap();
        let listing = state.store.insert_listing(Listing {
            status: ListingStatus::Public,
            ..Listing::default()
        });
        state
            .store
            .create_collection(Collection { apps: vec![listing.id], ..Collection::default() })
            .unwrap();

        assert_eq!(state.reindex_all().await.unwrap(), 1);
        let query = SearchQuery::new().filter(Filter::term("status", "public")).page(0, 10);
        assert_eq!(state.index.search(&query).await.unwrap().ids(), vec![listing.id]);

        state.store.update_listing(listing.id, |l| {
            l.status = ListingStatus::Disabled;
            Ok(())
        })
        .unwrap();
        state.reindex([listing.id, 999]).await;
        assert!(state.index.search(&query).await.unwrap().hits.is_empty());
    }
}
