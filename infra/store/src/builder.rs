use crate::engine::{Store, Tables};
use crate::error::{StoreError, StoreErrorExt};
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

/// Fluent builder for a [`Store`], optionally seeded from a JSON snapshot.
#[derive(Debug, Default)]
pub struct StoreBuilder {
    seed: Option<PathBuf>,
    required: bool,
}

impl StoreBuilder {
    #[must_use = "Creates a new store builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads initial records from a JSON file shaped like [`Tables`].
    #[must_use = "Sets the seed snapshot for the store"]
    pub fn seed(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed = Some(path.into());
        self
    }

    /// Fail instead of starting empty when the seed file is missing.
    #[must_use = "Sets whether a missing seed file is an error"]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Opens the store.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if a required seed cannot be read and
    /// [`StoreError::Decode`] if it is not a valid snapshot.
    pub async fn open(self) -> Result<Store, StoreError> {
        let Some(path) = self.seed else {
            return Ok(Store::in_memory());
        };

        if !self.required && !fs::try_exists(&path).await.unwrap_or(false) {
            info!(path = %path.display(), "Seed file not found, starting with an empty store");
            return Ok(Store::in_memory());
        }

        let raw = fs::read(&path)
            .await
            .context(format!("Failed to read seed {}", path.display()))?;
        let tables: Tables = serde_json::from_slice(&raw).context("Invalid seed snapshot")?;

        info!(
            path = %path.display(),
            listings = tables.listings.len(),
            collections = tables.collections.len(),
            accounts = tables.accounts.len(),
            "Store seeded"
        );
        Ok(Store::from_tables(tables))
    }
}
