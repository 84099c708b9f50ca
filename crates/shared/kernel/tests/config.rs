use mkt_kernel::config::{ConfigError, load_config};
use mkt_kernel::domain::config::{ApiConfig, SearchBackend};
use std::fs;
use tempfile::tempdir;

#[test]
fn file_sections_override_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("server.toml");
    fs::write(
        &path,
        r#"
[server]
port = 8081

[search]
backend = "elastic"
url = "http://es.internal:9200"
max_results = 40

[payments]
android_payments = true

[billing]
url = "http://billing.internal"
"#,
    )
    .unwrap();

    let cfg: ApiConfig = load_config(Some(&path)).unwrap();
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.search.backend, SearchBackend::Elastic);
    assert_eq!(cfg.search.max_results, 40);
    assert_eq!(cfg.search.index, "apps");
    assert!(cfg.payments.android_payments);
    assert_eq!(cfg.billing.url.as_deref(), Some("http://billing.internal"));
    assert_eq!(cfg.market.default_region, "restofworld");
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = load_config::<ApiConfig>(Some(dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Config { .. }));
    assert!(err.to_string().contains("Failed to build config"));
}

#[test]
fn malformed_values_fail_to_deserialize() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("server.toml");
    fs::write(&path, "[search]\nbackend = \"solr\"\n").unwrap();

    let err = load_config::<ApiConfig>(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Failed to deserialize config"));
}
