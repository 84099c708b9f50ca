#![cfg(feature = "server")]

use mkt_kernel::domain::config::ApiConfig;
use mkt_payments::{PaymentsError, init};

#[test]
fn init_creates_slice() {
    let slice = init(&ApiConfig::default()).expect("init should succeed");
    assert_eq!(slice.id, std::any::TypeId::of::<mkt_payments::Payments>());
}

#[test]
fn init_rejects_a_relative_portal_url() {
    let mut config = ApiConfig::default();
    config.billing.portal_url = "/portal".to_owned();
    assert!(matches!(init(&config), Err(PaymentsError::Config { .. })));
}
