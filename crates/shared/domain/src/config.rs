use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level API configuration shared across services.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfigInner {
    pub server: ServerConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
    pub search: SearchConfig,
    pub billing: BillingConfig,
    pub payments: PaymentsConfig,
    pub market: MarketConfig,
    pub store: StoreConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten, default)]
    inner: Arc<ApiConfigInner>,
}

impl Deref for ApiConfig {
    type Target = ApiConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ApiConfig {
    fn deref_mut(&mut self) -> &mut ApiConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub ssl: Option<SslConfig>,
    /// Seconds to wait for in-flight requests on shutdown.
    pub shutdown_grace_secs: u64,
}

/// TLS certificate/key paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Tokio runtime sizing. `None` worker threads means one per available core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub worker_threads: Option<usize>,
    pub stack_size: usize,
    pub thread_name: String,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Module directives such as `mkt_search=debug,tower_http=info`.
    pub filter: Option<String>,
    pub console: bool,
    /// Directory for rolling log files; file logging is off when unset.
    pub directory: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    #[default]
    Memory,
    Elastic,
}

/// Search index settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub backend: SearchBackend,
    pub url: String,
    pub index: String,
    /// Hard ceiling on the number of hits a single search may return.
    pub max_results: usize,
    pub default_limit: usize,
    pub timeout_secs: u64,
}

/// Remote billing provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Provider base URL; an in-process provider is used when unset.
    pub url: Option<String>,
    pub timeout_secs: u64,
    /// Developer portal base URL; login parameters are appended as a query string.
    pub portal_url: String,
}

/// Platform payment switches.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    pub android_payments: bool,
    pub android_packaged: bool,
    pub desktop_packaged: bool,
}

/// Marketplace presentation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub site_url: String,
    pub static_url: String,
    pub default_region: String,
    pub default_locale: String,
}

/// Primary store bootstrap.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot loaded at startup.
    pub seed: Option<PathBuf>,
    /// Fail startup when the seed file is missing.
    pub seed_required: bool,
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 4583,
            ssl: None,
            shutdown_grace_secs: 30,
        }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { worker_threads: None, stack_size: 4 * 1024 * 1024, thread_name: "mkt-worker".to_owned() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), filter: None, console: true, directory: None, json: false }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::Memory,
            url: "http://127.0.0.1:9200".to_owned(),
            index: "apps".to_owned(),
            max_results: 100,
            default_limit: 25,
            timeout_secs: 10,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 10,
            portal_url: "https://billing.example.com/portal".to_owned(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:4583".to_owned(),
            static_url: "http://localhost:4583".to_owned(),
            default_region: "restofworld".to_owned(),
            default_locale: "en-US".to_owned(),
        }
    }
}
