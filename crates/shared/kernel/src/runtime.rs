//! Tokio runtime construction from the `runtime` configuration section.

use mkt_domain::config::RuntimeConfig;
use std::thread::available_parallelism;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::info;

/// The default number of worker threads if detection fails.
const DEFAULT_WORKER_THREADS: usize = 4;
const MAX_WORKER_THREADS: usize = 1024;
/// Minimum allowed stack size (1 `MiB`).
const MIN_STACK_SIZE: usize = 1024 * 1024;
/// Maximum allowed stack size (16 `MiB`).
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
/// How long an idle blocking thread stays alive.
const THREAD_KEEP_ALIVE: Duration = Duration::from_secs(60);
const DEFAULT_THREAD_NAME: &str = "mkt-worker";

/// Runtime settings after defaults and bounds are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeProfile {
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
}

impl RuntimeProfile {
    /// Resolves the configured values: explicit worker threads, else `TOKIO_WORKER_THREADS`,
    /// else one per available core.
    #[must_use]
    pub fn resolve(config: &RuntimeConfig) -> Self {
        let worker_threads = config
            .worker_threads
            .or_else(|| {
                std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|s| s.parse::<usize>().ok())
            })
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                available_parallelism().map(std::num::NonZero::get).unwrap_or(DEFAULT_WORKER_THREADS)
            })
            .min(MAX_WORKER_THREADS);

        let thread_name = if config.thread_name.trim().is_empty() {
            DEFAULT_THREAD_NAME.to_owned()
        } else {
            config.thread_name.trim().to_owned()
        };

        Self {
            worker_threads,
            stack_size: config.stack_size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE),
            thread_name,
        }
    }
}

/// Builds the multi-threaded server runtime.
///
/// # Errors
/// Returns the I/O error reported by Tokio when the runtime cannot be created.
pub fn build_runtime(config: &RuntimeConfig) -> std::io::Result<Runtime> {
    let profile = RuntimeProfile::resolve(config);

    info!(
        worker_threads = profile.worker_threads,
        stack_size = profile.stack_size,
        thread_name = %profile.thread_name,
        "Building Tokio runtime"
    );

    Builder::new_multi_thread()
        .enable_all()
        .worker_threads(profile.worker_threads)
        .thread_stack_size(profile.stack_size)
        .thread_name(profile.thread_name)
        .thread_keep_alive(THREAD_KEEP_ALIVE)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_values_are_bounded() {
        let config = RuntimeConfig {
            worker_threads: Some(4096),
            stack_size: 64 * 1024 * 1024,
            thread_name: "  ".to_owned(),
        };
        let profile = RuntimeProfile::resolve(&config);

        assert_eq!(profile.worker_threads, MAX_WORKER_THREADS);
        assert_eq!(profile.stack_size, MAX_STACK_SIZE);
        assert_eq!(profile.thread_name, DEFAULT_THREAD_NAME);
    }

    #[test]
    fn small_stacks_are_raised() {
        let config =
            RuntimeConfig { worker_threads: Some(2), stack_size: 1, thread_name: "api".to_owned() };
        let profile = RuntimeProfile::resolve(&config);

        assert_eq!(profile.worker_threads, 2);
        assert_eq!(profile.stack_size, MIN_STACK_SIZE);
        assert_eq!(profile.thread_name, "api");
    }

    #[test]
    fn runtime_runs_futures() {
        let config = RuntimeConfig { worker_threads: Some(1), ..RuntimeConfig::default() };
        let runtime = build_runtime(&config).unwrap();
        assert_eq!(runtime.block_on(async { 2 + 2 }), 4);
    }
}
