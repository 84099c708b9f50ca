//! Search index abstraction for marketplace listings.
//!
//! The index is a derived projection of the primary store. Callers build a [`SearchQuery`]
//! and run it against any [`SearchIndex`] backend:
//!
//! - [`MemoryIndex`]: evaluates queries in process; used by default and in tests.
//! - `ElasticIndex` (feature `elastic`): forwards the rendered query to Elasticsearch.
//!
//! # Example
//!
//! ```rust
//! use mkt_index::{Filter, MemoryIndex, SearchQuery};
//!
//! let index = MemoryIndex::new();
//! let hits = index.execute(&SearchQuery::new().filter(Filter::term("status", "public")).page(0, 10));
//! assert_eq!(hits.total, 0);
//! ```

mod document;
#[cfg(feature = "elastic")]
mod elastic;
mod error;
mod memory;
mod query;

pub use document::{ListingDocument, Membership};
#[cfg(feature = "elastic")]
pub use elastic::ElasticIndex;
pub use error::{IndexError, IndexErrorExt};
pub use memory::MemoryIndex;
pub use query::{Clause, Filter, NestedSort, Order, SearchQuery, Sort};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One matching document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: u64,
    pub score: f64,
}

/// A page of matches plus the total number of matching documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    pub total: u64,
    pub hits: Vec<Hit>,
}

impl SearchHits {
    #[must_use]
    pub fn ids(&self) -> Vec<u64> {
        self.hits.iter().map(|h| h.id).collect()
    }
}

/// A queryable listing index.
#[async_trait]
pub trait SearchIndex: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// # Errors
    /// Returns [`IndexError`] when the backend fails.
    async fn search(&self, query: &SearchQuery) -> Result<SearchHits, IndexError>;

    /// Inserts or replaces documents by id.
    ///
    /// # Errors
    /// Returns [`IndexError`] when a document cannot be encoded or stored.
    async fn upsert(&self, documents: Vec<ListingDocument>) -> Result<(), IndexError>;

    /// Removes a document; unknown ids are ignored.
    ///
    /// # Errors
    /// Returns [`IndexError`] when the backend fails.
    async fn remove(&self, id: u64) -> Result<(), IndexError>;
}
