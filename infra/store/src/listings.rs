use crate::engine::Store;
use crate::error::StoreError;
use mkt_domain::listing::{Listing, ListingId, UserId};

impl Store {
    /// Inserts a listing, assigning an id when it has none.
    pub fn insert_listing(&self, mut listing: Listing) -> Listing {
        let mut tables = self.tables.write();
        if listing.id == 0 {
            listing.id = tables.next_id();
        }
        tables.listings.insert(listing.id, listing.clone());
        listing
    }

    #[must_use]
    pub fn listing(&self, id: ListingId) -> Option<Listing> {
        self.read(|t| t.listings.get(&id).cloned())
    }

    /// # Errors
    /// Returns [`StoreError::NotFound`] when the listing does not exist.
    pub fn try_listing(&self, id: ListingId) -> Result<Listing, StoreError> {
        self.listing(id).ok_or_else(|| StoreError::not_found("listing", id))
    }

    #[must_use]
    pub fn listing_by_slug(&self, slug: &str) -> Option<Listing> {
        self.read(|t| t.listings.values().find(|l| l.slug == slug).cloned())
    }

    /// Listings for the given ids, preserving the order of `ids` and skipping unknown ones.
    #[must_use]
    pub fn listings_by_ids(&self, ids: &[ListingId]) -> Vec<Listing> {
        self.read(|t| ids.iter().filter_map(|id| t.listings.get(id).cloned()).collect())
    }

    #[must_use]
    pub fn listings_owned_by(&self, user: UserId) -> Vec<Listing> {
        self.read(|t| t.listings.values().filter(|l| l.is_owned_by(user)).cloned().collect())
    }

    #[must_use]
    pub fn all_listings(&self) -> Vec<Listing> {
        self.read(|t| t.listings.values().cloned().collect())
    }

    /// Applies `f` to a stored listing and returns the updated copy.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the listing does not exist, or the error of `f`.
    pub fn update_listing(
        &self,
        id: ListingId,
        f: impl FnOnce(&mut Listing) -> Result<(), StoreError>,
    ) -> Result<Listing, StoreError> {
        self.write(|t| {
            let listing = t.listing_mut(id)?;
            f(listing)?;
            Ok(listing.clone())
        })
    }

    /// Removes a listing together with its collection memberships and payment links.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when the listing does not exist.
    pub fn delete_listing(&self, id: ListingId) -> Result<Listing, StoreError> {
        self.write(|t| {
            let listing = t.listings.remove(&id).ok_or_else(|| StoreError::not_found("listing", id))?;
            for collection in t.collections.values_mut() {
                collection.apps.retain(|member| *member != id);
            }
            for link in t.account_links.iter_mut().filter(|l| l.listing == id) {
                link.disabled = true;
            }
            t.in_app_configs.remove(&id);
            Ok(listing)
        })
    }
}
