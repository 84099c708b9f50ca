//! In-process billing provider used when no remote provider is configured.

use crate::error::BillingError;
use crate::types::{AccountDetails, PortalLogin, ProductSpec, RemoteAccount, RemoteKey, Terms};
use crate::BillingProvider;
use async_trait::async_trait;
use mkt_domain::listing::UserId;
use mkt_domain::payments::{InAppKey, PaymentAccount};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const TERMS_TEXT: &str = "Seller agreement: payouts follow the published schedule.";

#[derive(Debug, Default)]
struct Ledger {
    sequence: u64,
    accounts: BTreeMap<String, (AccountDetails, Terms)>,
    products: BTreeMap<String, (ProductSpec, Option<String>)>,
    keys: BTreeMap<String, String>,
    calls: Vec<&'static str>,
    failing: BTreeSet<&'static str>,
}

impl Ledger {
    fn next(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Records the call and fails it when an outage was injected for `op`.
    fn enter(&mut self, op: &'static str) -> Result<(), BillingError> {
        self.calls.push(op);
        if self.failing.contains(op) {
            return Err(BillingError::Unavailable {
                message: "provider outage".into(),
                context: Some(op.into()),
            });
        }
        Ok(())
    }
}

fn missing(kind: &str, uri: &str) -> BillingError {
    BillingError::NotFound { message: format!("{kind} {uri}").into(), context: None }
}

fn secret() -> String {
    nanoid::nanoid!(32)
}

/// Billing provider that keeps its records in memory.
///
/// Outages can be injected per operation with [`MemoryBillingProvider::fail_on`].
#[derive(Debug, Default)]
pub struct MemoryBillingProvider {
    ledger: Mutex<Ledger>,
}

impl MemoryBillingProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `op` fail as unavailable.
    pub fn fail_on(&self, op: &'static str) {
        self.ledger.lock().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.ledger.lock().failing.remove(op);
    }

    /// Operations called so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.ledger.lock().calls.clone()
    }

    /// Registered products by uri.
    #[must_use]
    pub fn products(&self) -> BTreeMap<String, ProductSpec> {
        self.ledger.lock().products.iter().map(|(uri, (spec, _))| (uri.clone(), spec.clone())).collect()
    }
}

fn validate(details: &AccountDetails) -> Result<(), BillingError> {
    if details.country_iso.len() == 3 && details.currency_iso.len() == 3 {
        return Ok(());
    }
    Err(BillingError::Rejected {
        message: "invalid seller details".into(),
        payload: json!({ "country_iso": ["Use a three letter country and currency code."] }),
        context: None,
    })
}

#[async_trait]
impl BillingProvider for MemoryBillingProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_account(
        &self,
        owner: UserId,
        details: &AccountDetails,
    ) -> Result<RemoteAccount, BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("create_account")?;
        validate(details)?;

        let id = ledger.next();
        let uri = format!("/accounts/{id}/");
        let terms = Terms { text: TERMS_TEXT.to_owned(), accepted: false };
        ledger.accounts.insert(uri.clone(), (details.clone(), terms));
        debug!(owner, %uri, "Memory billing account created");
        Ok(RemoteAccount { account_id: format!("{owner}-{id}"), uri })
    }

    async fn update_account(
        &self,
        account: &PaymentAccount,
        details: &AccountDetails,
    ) -> Result<(), BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("update_account")?;
        validate(details)?;
        let entry = ledger.accounts.get_mut(&account.uri).ok_or_else(|| missing("account", &account.uri))?;
        entry.0 = details.clone();
        Ok(())
    }

    async fn account_details(&self, account: &PaymentAccount) -> Result<AccountDetails, BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("account_details")?;
        ledger.accounts.get(&account.uri).map(|(d, _)| d.clone()).ok_or_else(|| missing("account", &account.uri))
    }

    async fn terms(&self, account: &PaymentAccount) -> Result<Terms, BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("terms")?;
        ledger.accounts.get(&account.uri).map(|(_, t)| t.clone()).ok_or_else(|| missing("account", &account.uri))
    }

    async fn update_terms(&self, account: &PaymentAccount, accept: bool) -> Result<Terms, BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("update_terms")?;
        let entry = ledger.accounts.get_mut(&account.uri).ok_or_else(|| missing("account", &account.uri))?;
        entry.1.accepted = accept;
        Ok(entry.1.clone())
    }

    async fn create_product(
        &self,
        account: &PaymentAccount,
        product: &ProductSpec,
    ) -> Result<String, BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("create_product")?;
        if !ledger.accounts.contains_key(&account.uri) {
            return Err(missing("account", &account.uri));
        }
        let uri = format!("/products/{}/", ledger.next());
        ledger.products.insert(uri.clone(), (product.clone(), Some(secret())));
        Ok(uri)
    }

    async fn update_product(&self, product_uri: &str, product: &ProductSpec) -> Result<(), BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("update_product")?;
        let entry = ledger.products.get_mut(product_uri).ok_or_else(|| missing("product", product_uri))?;
        entry.0 = product.clone();
        Ok(())
    }

    async fn set_product_secret(&self, product_uri: &str, secret: &str) -> Result<(), BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("set_product_secret")?;
        let entry = ledger.products.get_mut(product_uri).ok_or_else(|| missing("product", product_uri))?;
        entry.1 = Some(secret.to_owned());
        Ok(())
    }

    async fn product_secret(&self, product_uri: &str) -> Result<String, BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("product_secret")?;
        ledger
            .products
            .get(product_uri)
            .and_then(|(_, secret)| secret.clone())
            .ok_or_else(|| missing("product secret", product_uri))
    }

    async fn create_in_app_key(&self, owner: UserId) -> Result<RemoteKey, BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("create_in_app_key")?;
        let uri = format!("/inapp-keys/{}/", ledger.next());
        ledger.keys.insert(uri.clone(), secret());
        Ok(RemoteKey { owner, public_id: nanoid::nanoid!(16), uri })
    }

    async fn reset_in_app_key(&self, key: &InAppKey) -> Result<(), BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("reset_in_app_key")?;
        let stored = ledger.keys.get_mut(&key.secret_uri).ok_or_else(|| missing("key", &key.secret_uri))?;
        *stored = secret();
        Ok(())
    }

    async fn in_app_key_secret(&self, key: &InAppKey) -> Result<String, BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("in_app_key_secret")?;
        ledger.keys.get(&key.secret_uri).cloned().ok_or_else(|| missing("key", &key.secret_uri))
    }

    async fn portal_login(&self, account: &PaymentAccount) -> Result<PortalLogin, BillingError> {
        let mut ledger = self.ledger.lock();
        ledger.enter("portal_login")?;
        Ok(PortalLogin {
            authentication_token: secret(),
            email_address: format!("seller-{}@billing.invalid", account.owner),
            person_id: account.account_id.clone(),
        })
    }
}
