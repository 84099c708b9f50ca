//! Elasticsearch backend over the REST API.

use crate::document::ListingDocument;
use crate::error::{IndexError, IndexErrorExt};
use crate::query::SearchQuery;
use crate::{Hit, SearchHits, SearchIndex};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// A search index stored in an Elasticsearch cluster.
#[derive(Debug, Clone)]
pub struct ElasticIndex {
    client: Client,
    base: String,
    index: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: ResponseHits,
}

#[derive(Debug, Deserialize)]
struct ResponseHits {
    total: Total,
    #[serde(default)]
    hits: Vec<ResponseHit>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Total {
    Count(u64),
    Object { value: u64 },
}

#[derive(Debug, Deserialize)]
struct ResponseHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
}

impl ElasticIndex {
    /// # Errors
    /// Returns [`IndexError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        index: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IndexError> {
        let client =
            Client::builder().timeout(timeout).build().context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base: url.into().trim_end_matches('/').to_owned(),
            index: index.into(),
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/{}/{suffix}", self.base, self.index)
    }

    async fn check(response: Response) -> Result<Response, IndexError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(IndexError::Backend {
            message: format!("{status}: {body}").into(),
            context: Some("elasticsearch".into()),
        })
    }
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    fn backend(&self) -> &'static str {
        "elastic"
    }

    #[instrument(skip_all, fields(index = %self.index))]
    async fn search(&self, query: &SearchQuery) -> Result<SearchHits, IndexError> {
        let response = self
            .client
            .post(self.url("_search"))
            .json(&query.to_body())
            .send()
            .await
            .context("search")?;
        let parsed: SearchResponse =
            Self::check(response).await?.json().await.context("search response")?;

        let total = match parsed.hits.total {
            Total::Count(n) | Total::Object { value: n } => n,
        };
        let mut hits = Vec::with_capacity(parsed.hits.hits.len());
        for hit in parsed.hits.hits {
            match hit.id.parse() {
                Ok(id) => hits.push(Hit { id, score: hit.score.unwrap_or_default() }),
                Err(_) => warn!(id = %hit.id, "Skipping hit with non-numeric id"),
            }
        }
        debug!(total, returned = hits.len(), "Search completed");
        Ok(SearchHits { total, hits })
    }

    #[instrument(skip_all, fields(index = %self.index, count = documents.len()))]
    async fn upsert(&self, documents: Vec<ListingDocument>) -> Result<(), IndexError> {
        for doc in documents {
            let response = self
                .client
                .put(self.url(&format!("_doc/{}", doc.id)))
                .json(&doc)
                .send()
                .await
                .context("index document")?;
            Self::check(response).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(index = %self.index))]
    async fn remove(&self, id: u64) -> Result<(), IndexError> {
        let response = self
            .client
            .delete(self.url(&format!("_doc/{id}")))
            .send()
            .await
            .context("delete document")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await.map(drop)
    }
}
