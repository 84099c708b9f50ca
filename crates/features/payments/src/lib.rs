//! Payments feature slice.
//!
//! - [`orchestrator`]: payment account lifecycle against the billing provider
//!   (create, update, terms, cancel).
//! - [`monetization`]: per-listing premium type, price, regions, upsell and account link.
//! - [`in_app`]: developer in-app keys and per-listing in-app product secrets.
//!
//! Remote steps are single attempts. A failing step is logged and reported as 502; local
//! changes saved before it stay in place.

#[cfg(feature = "server")]
pub mod api;
mod error;
#[cfg(feature = "server")]
pub mod in_app;
#[cfg(feature = "server")]
pub mod monetization;
#[cfg(feature = "server")]
pub mod orchestrator;
#[cfg(feature = "server")]
pub mod serializer;
#[cfg(feature = "server")]
pub mod validation;

pub use crate::error::{PaymentsError, PaymentsErrorExt};
#[cfg(feature = "server")]
use mkt_kernel::domain::{config::ApiConfig, registry::InitializedSlice};

/// Payments feature state.
#[mkt_derive::mkt_slice]
pub struct Payments {
    /// Developer portal base URL.
    pub portal_url: String,
    pub android_payments: bool,
    pub android_packaged: bool,
}

/// Initialize the payments feature.
///
/// # Errors
/// Returns [`PaymentsError::Config`] when `billing.portal_url` is not an absolute URL.
#[cfg(feature = "server")]
pub fn init(config: &ApiConfig) -> Result<InitializedSlice, PaymentsError> {
    let portal_url = config.billing.portal_url.trim();
    if !(portal_url.starts_with("https://") || portal_url.starts_with("http://")) {
        return Err(PaymentsError::Config {
            message: format!("billing.portal_url must be an absolute URL, got \"{portal_url}\"").into(),
            context: None,
        });
    }

    let slice = Payments::new(PaymentsInner {
        portal_url: portal_url.to_owned(),
        android_payments: config.payments.android_payments,
        android_packaged: config.payments.android_packaged,
    });
    tracing::info!(
        android_payments = config.payments.android_payments,
        "Payments server slice initialized"
    );

    Ok(slice.into())
}
