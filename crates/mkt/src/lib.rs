//! Facade crate for the marketplace features and shared modules.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Add `mkt` with the `server` feature.
//! - Call `mkt::init` to build the feature slices, then mount `mkt::server::router::api_router`.

pub use mkt_domain as domain;
#[cfg(feature = "server")]
use mkt_domain::config::ApiConfig;
pub use mkt_kernel as kernel;

#[cfg(feature = "server")]
pub mod server {
    pub mod router {
        use mkt_kernel::server::ApiState;
        pub use mkt_kernel::server::router::system_router;
        use utoipa_axum::router::OpenApiRouter;

        /// Every feature router merged with the system routes.
        pub fn api_router() -> OpenApiRouter<ApiState> {
            OpenApiRouter::new()
                .merge(system_router())
                .merge(mkt_listings::api::router())
                .merge(mkt_collections::api::router())
                .merge(mkt_search::api::router())
                .merge(mkt_payments::api::router())
        }
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    pub use mkt_collections as collections;
    pub use mkt_listings as listings;
    pub use mkt_payments as payments;
    pub use mkt_search as search;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        #[cfg(feature = "server")]
        "server",
        #[cfg(feature = "server")]
        "listings",
        #[cfg(feature = "server")]
        "collections",
        #[cfg(feature = "server")]
        "search",
        #[cfg(feature = "server")]
        "payments",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Initialize all enabled features for server mode.
///
/// # Errors
/// Returns an error if any feature initialization fails.
#[cfg(feature = "server")]
pub fn init(
    config: &ApiConfig,
) -> Result<Vec<domain::registry::InitializedSlice>, Box<dyn std::error::Error>> {
    let slices = vec![
        features::listings::init(config)?,
        features::collections::init(config)?,
        features::search::init(config)?,
        features::payments::init(config)?,
    ];
    Ok(slices)
}

#[cfg(all(test, feature = "server"))]
mod tests {
    use super::*;

    #[test]
    fn every_slice_initializes_with_defaults() {
        let slices = init(&ApiConfig::default()).unwrap();
        assert_eq!(slices.len(), 4);
        let names: Vec<_> = slices.iter().map(|slice| slice.name).collect();
        assert_eq!(names, ["listings", "collections", "search", "payments"]);
        assert!(names.iter().all(|name| features::is_enabled(name)));
        assert!(features::is_enabled("payments"));
        assert!(!features::is_enabled("licensing"));
    }
}
