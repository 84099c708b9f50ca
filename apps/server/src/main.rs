use anyhow::Context;
use mkt::domain::config::ApiConfig;
use mkt::kernel::config::load_config;
use mkt::kernel::runtime::build_runtime;
use mkt_logger::Logger;
use mkt_server::Server;

/// Usage: `mkt-server [config-file]`. Without a file, `./server.toml` is read when present.
fn main() -> anyhow::Result<()> {
    let cfg: ApiConfig =
        load_config(std::env::args().nth(1)).context("Critical: Configuration is malformed")?;

    let _log = Logger::from_config(env!("CARGO_PKG_NAME"), &cfg.logging)?;

    let runtime = build_runtime(&cfg.runtime).context("Failed to build the Tokio runtime")?;
    runtime.block_on(async { Server::builder().config(cfg).build().await?.run().await })
}
