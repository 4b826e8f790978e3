//! In-memory default implementation of the gateway backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::backend::CoinbaseBackend;
use crate::app_switch::types::CoinbasePaymentMethod;
use crate::error::{CoinbaseError, Result};

/// Backend keeping the link in memory, for tests and offline demos.
///
/// Failures can be scripted per call and a delay can be injected to hold a call open.
#[derive(Clone, Default)]
pub struct InMemoryCoinbaseBackend {
    linked: Arc<RwLock<Option<CoinbasePaymentMethod>>>,
    vaulted: Arc<DashMap<String, CoinbasePaymentMethod>>,
    calls: Arc<DashMap<&'static str, usize>>,
    failures: Arc<DashMap<&'static str, CoinbaseError>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl InMemoryCoinbaseBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts out with an account already linked.
    pub fn linked(payment_method: CoinbasePaymentMethod) -> Self {
        Self { linked: Arc::new(RwLock::new(Some(payment_method))), ..Self::default() }
    }

    /// Makes every subsequent `call` ("link", "unlink" or "status") fail with `error`.
    pub fn fail(&self, call: &'static str, error: CoinbaseError) {
        self.failures.insert(call, error);
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    /// Delays every call by `delay`.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    /// How many times `call` was issued, failed ones included.
    pub fn call_count(&self, call: &'static str) -> usize {
        self.calls.get(call).map(|entry| *entry.value()).unwrap_or(0)
    }

    /// Vault tokens of every payment method stored so far.
    pub fn vaulted_tokens(&self) -> Vec<String> {
        self.vaulted.iter().map(|entry| entry.key().clone()).collect()
    }

    pub async fn linked_account(&self) -> Option<CoinbasePaymentMethod> {
        self.linked.read().await.clone()
    }

    async fn enter(&self, call: &'static str) -> Result<()> {
        *self.calls.entry(call).or_insert(0) += 1;
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.get(call) {
            Some(entry) => Err(entry.value().clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CoinbaseBackend for InMemoryCoinbaseBackend {
    async fn link_account(&self, payment_method: &CoinbasePaymentMethod, store_in_vault: bool) -> Result<()> {
        self.enter("link").await?;
        if payment_method.code.is_empty() {
            return Err(CoinbaseError::ValidationError("authorization code is empty".into()));
        }
        if store_in_vault {
            self.vaulted.insert(Uuid::new_v4().to_string(), payment_method.clone());
        }
        *self.linked.write().await = Some(payment_method.clone());
        Ok(())
    }

    async fn unlink_account(&self) -> Result<()> {
        self.enter("unlink").await?;
        *self.linked.write().await = None;
        Ok(())
    }

    async fn fetch_link_status(&self) -> Result<bool> {
        self.enter("status").await?;
        Ok(self.linked.read().await.is_some())
    }
}
