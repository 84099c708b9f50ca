use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// Prefix of environment overrides (`MKT__SEARCH__URL` maps to `search.url`).
pub const ENV_PREFIX: &str = "MKT";
/// Base name of the configuration file looked up when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "server";

/// Custom error type for config loading.
#[mkt_derive::mkt_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// A reusable configuration loader that combines file-based settings with environment overrides.
///
/// Layers, later ones winning:
/// 1. **Base File**: the file at `path` (required), or the optional `server.{toml,json,yaml}`
///    in the working directory when no path is given.
/// 2. **Environment Overrides**: variables prefixed with `MKT__`; nested keys are separated
///    by double underscores (e.g., `MKT__SEARCH__BACKEND=elastic`).
///
/// Every section of the marketplace configuration has defaults, so an empty source set yields
/// a usable configuration.
///
/// # Errors
/// This function will return an error if:
/// * An explicitly given configuration file cannot be found.
/// * The content of the file or the environment does not match the structure of type `T`.
///
/// # Example
/// ```rust
/// use mkt_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let file = match &path {
        Some(path) => {
            info!("Loading config from {}", path.as_ref().display());
            File::from(path.as_ref()).required(true)
        },
        None => {
            info!("Loading optional config from ./{DEFAULT_CONFIG_FILE}");
            File::with_name(DEFAULT_CONFIG_FILE).required(false)
        },
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .convert_case(config::Case::Snake),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
