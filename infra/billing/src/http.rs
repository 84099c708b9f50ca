//! REST client for the remote billing provider.

use crate::error::{BillingError, BillingErrorExt};
use crate::types::{AccountDetails, PortalLogin, ProductSpec, RemoteAccount, RemoteKey, Terms};
use crate::BillingProvider;
use async_trait::async_trait;
use mkt_domain::listing::UserId;
use mkt_domain::payments::{InAppKey, PaymentAccount};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Billing provider reached over HTTP. Every call is a single attempt bounded by the client
/// timeout.
#[derive(Debug, Clone)]
pub struct HttpBillingProvider {
    client: Client,
    base: String,
}

#[derive(Debug, Deserialize)]
struct UriBody {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct SecretBody {
    secret: String,
}

impl HttpBillingProvider {
    /// # Errors
    /// Returns [`BillingError::Transport`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BillingError> {
        let client =
            Client::builder().timeout(timeout).build().context("Failed to create HTTP client")?;
        Ok(Self { client, base: url.into().trim_end_matches('/').to_owned() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        op: &'static str,
    ) -> Result<Response, BillingError> {
        let response = request
            .send()
            .await
            .inspect_err(|e| warn!(op, error = %e, "Billing request failed"))
            .context(op)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(op, %status, "Billing provider returned an error");
        if status == StatusCode::NOT_FOUND {
            return Err(BillingError::NotFound { message: body.into(), context: Some(op.into()) });
        }
        if status.is_client_error() {
            let payload = serde_json::from_str(&body).unwrap_or(Value::String(body));
            return Err(BillingError::Rejected {
                message: format!("{status}").into(),
                payload,
                context: Some(op.into()),
            });
        }
        Err(BillingError::Unavailable {
            message: format!("{status}: {body}").into(),
            context: Some(op.into()),
        })
    }

    async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        op: &'static str,
    ) -> Result<T, BillingError> {
        let bytes = self.execute(request, op).await?.bytes().await.context(op)?;
        let parsed = serde_json::from_slice(&bytes).context(op)?;
        debug!(op, "Billing call completed");
        Ok(parsed)
    }

    async fn unit(&self, request: RequestBuilder, op: &'static str) -> Result<(), BillingError> {
        self.execute(request, op).await?;
        debug!(op, "Billing call completed");
        Ok(())
    }
}

#[async_trait]
impl BillingProvider for HttpBillingProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip(self, details))]
    async fn create_account(
        &self,
        owner: UserId,
        details: &AccountDetails,
    ) -> Result<RemoteAccount, BillingError> {
        let mut body = serde_json::to_value(details).context("create_account")?;
        if let Some(map) = body.as_object_mut() {
            map.insert("owner".to_owned(), Value::from(owner));
        }
        self.json(self.client.post(self.url("/accounts/")).json(&body), "create_account").await
    }

    #[instrument(skip_all, fields(account = %account.uri))]
    async fn update_account(
        &self,
        account: &PaymentAccount,
        details: &AccountDetails,
    ) -> Result<(), BillingError> {
        self.unit(self.client.put(self.url(&account.uri)).json(details), "update_account").await
    }

    #[instrument(skip_all, fields(account = %account.uri))]
    async fn account_details(&self, account: &PaymentAccount) -> Result<AccountDetails, BillingError> {
        self.json(self.client.get(self.url(&account.uri)), "account_details").await
    }

    #[instrument(skip_all, fields(account = %account.uri))]
    async fn terms(&self, account: &PaymentAccount) -> Result<Terms, BillingError> {
        let url = self.url(&format!("{}terms/", account.uri));
        self.json(self.client.get(url), "terms").await
    }

    #[instrument(skip_all, fields(account = %account.uri, accept))]
    async fn update_terms(&self, account: &PaymentAccount, accept: bool) -> Result<Terms, BillingError> {
        let url = self.url(&format!("{}terms/", account.uri));
        self.json(self.client.put(url).json(&json!({ "accepted": accept })), "update_terms").await
    }

    #[instrument(skip_all, fields(account = %account.uri, listing = product.listing))]
    async fn create_product(
        &self,
        account: &PaymentAccount,
        product: &ProductSpec,
    ) -> Result<String, BillingError> {
        let body = json!({
            "account": account.uri,
            "listing": product.listing,
            "name": product.name,
            "price_tier": product.price_tier,
        });
        let created: UriBody =
            self.json(self.client.post(self.url("/products/")).json(&body), "create_product").await?;
        Ok(created.uri)
    }

    #[instrument(skip(self, product))]
    async fn update_product(&self, product_uri: &str, product: &ProductSpec) -> Result<(), BillingError> {
        self.unit(self.client.patch(self.url(product_uri)).json(product), "update_product").await
    }

    #[instrument(skip(self, secret))]
    async fn set_product_secret(&self, product_uri: &str, secret: &str) -> Result<(), BillingError> {
        let request = self.client.patch(self.url(product_uri)).json(&json!({ "secret": secret }));
        self.unit(request, "set_product_secret").await
    }

    #[instrument(skip(self))]
    async fn product_secret(&self, product_uri: &str) -> Result<String, BillingError> {
        let body: SecretBody = self.json(self.client.get(self.url(product_uri)), "product_secret").await?;
        Ok(body.secret)
    }

    #[instrument(skip(self))]
    async fn create_in_app_key(&self, owner: UserId) -> Result<RemoteKey, BillingError> {
        let request = self.client.post(self.url("/inapp-keys/")).json(&json!({ "owner": owner }));
        self.json(request, "create_in_app_key").await
    }

    #[instrument(skip_all, fields(owner = key.owner))]
    async fn reset_in_app_key(&self, key: &InAppKey) -> Result<(), BillingError> {
        let url = self.url(&format!("{}reset/", key.secret_uri));
        self.unit(self.client.post(url), "reset_in_app_key").await
    }

    #[instrument(skip_all, fields(owner = key.owner))]
    async fn in_app_key_secret(&self, key: &InAppKey) -> Result<String, BillingError> {
        let body: SecretBody =
            self.json(self.client.get(self.url(&key.secret_uri)), "in_app_key_secret").await?;
        Ok(body.secret)
    }

    #[instrument(skip_all, fields(account = %account.uri))]
    async fn portal_login(&self, account: &PaymentAccount) -> Result<PortalLogin, BillingError> {
        let request = self
            .client
            .post(self.url("/portal/login/"))
            .json(&json!({ "account_id": account.account_id }));
        self.json(request, "portal_login").await
    }
}
