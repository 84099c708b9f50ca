#![cfg(feature = "server")]

use mkt_kernel::domain::config::ApiConfig;
use mkt_listings::{ListingsError, init};

#[test]
fn init_creates_slice() {
    let slice = init(&ApiConfig::default()).expect("init should succeed");
    assert_eq!(slice.id, std::any::TypeId::of::<mkt_listings::Listings>());
}

#[test]
fn init_rejects_zero_page_sizes() {
    let mut config = ApiConfig::default();
    config.search.default_limit = 0;
    assert!(matches!(init(&config), Err(ListingsError::Config { .. })));
}
