//! The primary marketplace store.
//!
//! The store is the authoritative copy of listings, collections and payment records. The
//! search index is derived from it and may lag behind.
//!
//! # Architectural Overview
//!
//! 1.  **[`Store`]**: the thread-safe handle; typed accessors live next to their table.
//! 2.  **[`Tables`]**: the plain record set, also the JSON seed format.
//! 3.  **[`StoreBuilder`]**: opens an empty or seeded store.
//!
//! # Example
//!
//! ```rust
//! use mkt_domain::collection::{Collection, CollectionType};
//! use mkt_store::{Store, StoreError};
//!
//! let store = Store::in_memory();
//! let featured = Collection { collection_type: CollectionType::Featured, ..Collection::default() };
//!
//! store.create_collection(featured.clone()).unwrap();
//! let err = store.create_collection(featured).unwrap_err();
//! assert!(matches!(err, StoreError::Unique { .. }));
//! ```

mod builder;
mod collections;
mod engine;
mod error;
mod listings;
mod payments;

pub use builder::StoreBuilder;
pub use collections::CollectionFilter;
pub use engine::{Store, StoreInner, Tables};
pub use error::{StoreError, StoreErrorExt};
pub use payments::AccountObligations;
