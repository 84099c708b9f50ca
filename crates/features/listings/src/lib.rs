//! Listings feature slice: the listing resource, its validation rules and the legacy
//! device-type compatibility layer.

#[cfg(feature = "server")]
pub mod api;
mod error;
#[cfg(feature = "server")]
pub mod serializer;
#[cfg(feature = "server")]
pub mod validation;

pub use crate::error::{ListingsError, ListingsErrorExt};
#[cfg(feature = "server")]
use mkt_kernel::domain::{config::ApiConfig, registry::InitializedSlice};

/// Listings feature state.
#[mkt_derive::mkt_slice]
pub struct Listings {
    /// Page size of the developer listing when no `limit` is sent.
    pub default_limit: usize,
    pub max_limit: usize,
}

/// Initialize the listings feature.
///
/// # Errors
/// Returns [`ListingsError::Config`] when the configured page sizes are unusable.
#[cfg(feature = "server")]
pub fn init(config: &ApiConfig) -> Result<InitializedSlice, ListingsError> {
    let search = &config.search;
    if search.default_limit == 0 || search.max_results == 0 {
        return Err(ListingsError::Config {
            message: "search.default_limit and search.max_results must be positive".into(),
            context: None,
        });
    }

    let slice = Listings::new(ListingsInner {
        default_limit: search.default_limit.min(search.max_results),
        max_limit: search.max_results,
    });
    tracing::info!("Listings server slice initialized");

    Ok(slice.into())
}
