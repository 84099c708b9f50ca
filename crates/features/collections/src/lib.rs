//! Collections feature slice.
//!
//! Curated, ordered groups of listings: validation and slot uniqueness, the membership
//! resolver that picks the members a device can run, the filtered listing with fallback used
//! by the featured feed, and the collection endpoints.

#[cfg(feature = "server")]
pub mod api;
mod error;
#[cfg(feature = "server")]
pub mod fallback;
#[cfg(feature = "server")]
pub mod membership;
#[cfg(feature = "server")]
pub mod serializer;
#[cfg(feature = "server")]
pub mod validation;

pub use crate::error::{CollectionsError, CollectionsErrorExt};
#[cfg(feature = "server")]
use mkt_kernel::domain::{config::ApiConfig, registry::InitializedSlice};

/// Collections feature state.
#[mkt_derive::mkt_slice]
pub struct Collections {
    pub default_limit: usize,
    pub max_limit: usize,
}

/// Initialize the collections feature.
///
/// # Errors
/// Returns [`CollectionsError::Config`] when the configured page sizes are unusable.
#[cfg(feature = "server")]
pub fn init(config: &ApiConfig) -> Result<InitializedSlice, CollectionsError> {
    let search = &config.search;
    if search.default_limit == 0 || search.max_results == 0 {
        return Err(CollectionsError::Config {
            message: "search.default_limit and search.max_results must be positive".into(),
            context: None,
        });
    }

    let slice = Collections::new(CollectionsInner {
        default_limit: search.default_limit.min(search.max_results),
        max_limit: search.max_results,
    });
    tracing::info!("Collections server slice initialized");

    Ok(slice.into())
}
