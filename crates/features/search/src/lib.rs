//! Search feature slice.
//!
//! The [`composer`] turns request parameters into a typed index query; the endpoints run it
//! and serialize the matching listings for search, the featured feed, browser suggestions
//! and the rocketbar.

#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod composer;
mod error;

pub use crate::error::{SearchError, SearchErrorExt};
#[cfg(feature = "server")]
use mkt_kernel::domain::{config::ApiConfig, registry::InitializedSlice};

/// Search feature state.
#[mkt_derive::mkt_slice]
pub struct Search {
    /// Page size when the request sends no `limit`.
    pub default_limit: usize,
    /// Hard cap on the number of results of one query.
    pub max_results: usize,
}

/// Initialize the search feature.
///
/// # Errors
/// Returns [`SearchError::Config`] when `search.max_results` or `search.default_limit` is zero.
#[cfg(feature = "server")]
pub fn init(config: &ApiConfig) -> Result<InitializedSlice, SearchError> {
    let search = &config.search;
    if search.max_results == 0 || search.default_limit == 0 {
        return Err(SearchError::Config {
            message: "search.max_results and search.default_limit must be positive".into(),
            context: None,
        });
    }

    let slice = Search::new(SearchInner {
        default_limit: search.default_limit.min(search.max_results),
        max_results: search.max_results,
    });
    tracing::info!(max_results = search.max_results, "Search server slice initialized");

    Ok(slice.into())
}
