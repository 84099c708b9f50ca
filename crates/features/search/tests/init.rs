#![cfg(feature = "server")]

use mkt_kernel::domain::config::ApiConfig;
use mkt_search::{SearchError, init};

#[test]
fn init_creates_slice() {
    let slice = init(&ApiConfig::default()).expect("init should succeed");
    assert_eq!(slice.id, std::any::TypeId::of::<mkt_search::Search>());
}

#[test]
fn init_rejects_a_zero_cap() {
    let mut config = ApiConfig::default();
    config.search.max_results = 0;
    assert!(matches!(init(&config), Err(SearchError::Config { .. })));
}
