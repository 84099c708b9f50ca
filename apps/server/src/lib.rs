//! # Marketplace Server
//!
//! Serves the marketplace API on `Axum`: listings, collections, search and payments, with the
//! OpenAPI reference rendered at `/api`.
//!
//! ## Example
//! ```no_run
//! use mkt_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .port(4583)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod router;

pub use router::init as app_router;

use anyhow::{Context, Result, anyhow};
use axum_server::Handle;
use mkt::domain::config::{ApiConfig, SearchBackend};
use mkt::kernel::server::ApiState;
use mkt_billing::{BillingProvider, HttpBillingProvider, MemoryBillingProvider};
use mkt_index::{MemoryIndex, SearchIndex};
use mkt_store::{Store, StoreBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: ApiConfig,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: ApiConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    async fn init_store(&self) -> Result<Store> {
        let store_cfg = &self.cfg.store;
        let builder = StoreBuilder::new().required(store_cfg.seed_required);
        let builder = match &store_cfg.seed {
            Some(seed) => builder.seed(seed),
            None => builder,
        };
        builder.open().await.context("Failed to open the primary store")
    }

    fn init_index(&self) -> Result<Arc<dyn SearchIndex>> {
        let search = &self.cfg.search;
        match search.backend {
            SearchBackend::Memory => Ok(Arc::new(MemoryIndex::new())),
            #[cfg(feature = "elastic")]
            SearchBackend::Elastic => {
                let index = mkt_index::ElasticIndex::new(
                    &search.url,
                    &search.index,
                    Duration::from_secs(search.timeout_secs),
                )
                .context("Failed to create the search client")?;
                info!(url = %search.url, index = %search.index, "Using remote search index");
                Ok(Arc::new(index))
            },
            #[cfg(not(feature = "elastic"))]
            SearchBackend::Elastic => {
                anyhow::bail!("search.backend = \"elastic\" requires the `elastic` feature")
            },
        }
    }

    fn init_billing(&self) -> Result<Arc<dyn BillingProvider>> {
        let billing = &self.cfg.billing;
        match &billing.url {
            Some(url) => {
                let provider = HttpBillingProvider::new(url, Duration::from_secs(billing.timeout_secs))
                    .context("Failed to create the billing client")?;
                info!(url = %url, "Using remote billing provider");
                Ok(Arc::new(provider))
            },
            None => {
                warn!("billing.url is not set, payments are recorded by the in-process provider");
                Ok(Arc::new(MemoryBillingProvider::new()))
            },
        }
    }

    fn validate_ssl_config(&self) -> Result<()> {
        if let Some(ssl) = &self.cfg.server.ssl {
            if !ssl.cert.exists() {
                anyhow::bail!("SSL certificate not found at: {}", ssl.cert.display());
            }
            if !ssl.key.exists() {
                anyhow::bail!("SSL key not found at: {}", ssl.key.display());
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let metadata = ssl.key.metadata()?;
                if metadata.permissions().mode() & 0o077 != 0 {
                    warn!(
                        "SECURITY: SSL Private Key {} has insecure permissions (should be 600)",
                        ssl.key.display()
                    );
                }
            }
        }
        Ok(())
    }

    /// Consumes the builder and initializes the server.
    ///
    /// # Process
    /// 1. Validates the SSL configuration
    /// 2. Opens the store, seeding it when a snapshot is configured
    /// 3. Selects the search index and billing provider backends
    /// 4. Initializes the feature slices and constructs application state
    /// 5. Indexes every stored listing
    ///
    /// # Errors
    /// Returns an error if:
    /// * A required seed snapshot is missing or malformed
    /// * A remote client cannot be created
    /// * A feature slice rejects the configuration
    /// * The initial indexing run fails
    pub async fn build(self) -> Result<Server> {
        self.validate_ssl_config()?;

        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, "Initializing server");

        let store = self.init_store().await?;
        let index = self.init_index()?;
        let billing = self.init_billing()?;

        let slices =
            mkt::init(&self.cfg).map_err(|e| anyhow!("Platform bootstrap failed: {e}"))?;

        let state = slices
            .into_iter()
            .fold(
                ApiState::builder().config(self.cfg).store(store).index(index).billing(billing),
                |builder, slice| builder.register_slice(slice),
            )
            .build()
            .context("Failed to finalize API state registry")?;

        let indexed = state.reindex_all().await.context("Initial indexing failed")?;
        info!(indexed, "Search index populated");

        Ok(Server { state })
    }
}

/// A fully initialized server instance ready to run.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    state: ApiState,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Starts the server and runs until the shutdown signal is received.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the configured address
    /// or if SSL/TLS setup fails.
    pub async fn run(self) -> Result<()> {
        let cfg = self.state.config.clone();
        let address = SocketAddr::new(cfg.server.address, cfg.server.port);
        let grace = Duration::from_secs(cfg.server.shutdown_grace_secs);

        info!(address = %address, ssl = cfg.server.ssl.is_some(), "Starting server");

        let app = router::init(self.state);

        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();

        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, starting graceful shutdown...");
            shutdown_handle.graceful_shutdown(Some(grace));
        });

        if let Some(ssl_config) = &cfg.server.ssl {
            info!("Starting HTTPS server on https://{address}");

            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &ssl_config.cert,
                &ssl_config.key,
            )
            .await
            .context("Failed to load SSL/TLS certificates")?;

            axum_server::bind_rustls(address, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")?;
        } else {
            info!("Starting HTTP server on http://{address}");

            axum_server::bind(address)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTP server failed")?;
        }

        info!("Server shutdown complete");
        Ok(())
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub const fn state(&self) -> &ApiState {
        &self.state
    }
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}
