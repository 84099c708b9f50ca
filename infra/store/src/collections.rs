use crate::engine::{Store, Tables};
use crate::error::StoreError;
use mkt_domain::collection::{Collection, CollectionId, CollectionSlot, CollectionType};
use mkt_domain::listing::ListingId;
use tracing::debug;

/// Filters for listing collections. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionFilter {
    pub collection_type: Option<CollectionType>,
    /// `Some(None)` matches collections without a category.
    pub category: Option<Option<String>>,
    pub region: Option<Option<u32>>,
    pub carrier: Option<Option<u32>>,
    pub public_only: bool,
}

impl CollectionFilter {
    #[must_use]
    pub fn matches(&self, c: &Collection) -> bool {
        self.collection_type.is_none_or(|t| t == c.collection_type)
            && self.category.as_ref().is_none_or(|cat| *cat == c.category)
            && self.region.is_none_or(|r| r == c.region)
            && self.carrier.is_none_or(|r| r == c.carrier)
            && (!self.public_only || c.is_public)
    }
}

/// Whether another featured/operator collection of the same type occupies `slot`.
fn slot_taken(
    tables: &Tables,
    collection_type: CollectionType,
    slot: &CollectionSlot,
    except: Option<CollectionId>,
) -> bool {
    collection_type.is_unique_per_slot()
        && tables.collections.values().any(|other| {
            Some(other.id) != except
                && other.collection_type == collection_type
                && other.slot() == *slot
        })
}

fn uniqueness_error() -> StoreError {
    StoreError::Unique {
        message: "You can not have more than one Featured Apps/Operator Shelf collection for \
                  the same category/carrier/region combination."
            .into(),
        context: Some("collection_uniqueness".into()),
    }
}

impl Store {
    /// Creates a collection, enforcing one featured and one operator collection per slot.
    ///
    /// # Errors
    /// Returns [`StoreError::Unique`] when the slot is already taken.
    pub fn create_collection(&self, mut collection: Collection) -> Result<Collection, StoreError> {
        self.write(|t| {
            if slot_taken(t, collection.collection_type, &collection.slot(), None) {
                return Err(uniqueness_error());
            }
            collection.id = t.next_id();
            debug!(id = collection.id, "Collection created");
            t.collections.insert(collection.id, collection.clone());
            Ok(collection)
        })
    }

    /// Applies `f` to a copy of the collection and stores it if the slot rule still holds.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`], [`StoreError::Unique`], or the error of `f`.
    pub fn update_collection(
        &self,
        id: CollectionId,
        f: impl FnOnce(&mut Collection) -> Result<(), StoreError>,
    ) -> Result<Collection, StoreError> {
        self.write(|t| {
            let mut updated = t.collection_mut(id)?.clone();
            f(&mut updated)?;
            if slot_taken(t, updated.collection_type, &updated.slot(), Some(id)) {
                return Err(uniqueness_error());
            }
            t.collections.insert(id, updated.clone());
            Ok(updated)
        })
    }

    /// # Errors
    /// Returns [`StoreError::NotFound`] when the collection does not exist.
    pub fn delete_collection(&self, id: CollectionId) -> Result<Collection, StoreError> {
        self.write(|t| {
            t.collections.remove(&id).ok_or_else(|| StoreError::not_found("collection", id))
        })
    }

    #[must_use]
    pub fn collection(&self, id: CollectionId) -> Option<Collection> {
        self.read(|t| t.collections.get(&id).cloned())
    }

    #[must_use]
    pub fn collection_by_slug(&self, slug: &str) -> Option<Collection> {
        self.read(|t| t.collections.values().find(|c| c.slug == slug).cloned())
    }

    #[must_use]
    pub fn collections(&self, filter: &CollectionFilter) -> Vec<Collection> {
        self.read(|t| t.collections.values().filter(|c| filter.matches(c)).cloned().collect())
    }

    /// `(collection id, rank)` pairs for every collection containing the listing.
    #[must_use]
    pub fn memberships(&self, listing: ListingId) -> Vec<(CollectionId, usize)> {
        self.read(|t| {
            t.collections
                .values()
                .filter_map(|c| c.position(listing).map(|rank| (c.id, rank)))
                .collect()
        })
    }
}
