//! Gateway calls behind account linking.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::http_client::{GatewayHttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::app_switch::types::CoinbasePaymentMethod;
use crate::error::{CoinbaseError, Result};

/// Path of the Coinbase account resource on the gateway.
pub const COINBASE_ACCOUNTS_PATH: &str = "/v1/payment_methods/coinbase_accounts";

/// Link, unlink and status calls. Implementations never retry on their own.
#[async_trait]
pub trait CoinbaseBackend: Send + Sync + 'static {
    /// Associates the authorized account with the customer, vaulting it when asked.
    async fn link_account(&self, payment_method: &CoinbasePaymentMethod, store_in_vault: bool) -> Result<()>;

    /// Removes the association. Succeeds when nothing was linked.
    async fn unlink_account(&self) -> Result<()>;

    /// Whether an account is linked right now.
    async fn fetch_link_status(&self) -> Result<bool>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkBody<'a> {
    coinbase_account: LinkAccountBody<'a>,
    options: LinkOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkAccountBody<'a> {
    code: &'a str,
    redirect_uri: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkOptions {
    store_in_vault: bool,
}

#[derive(Debug, Deserialize)]
struct LinkStatus {
    linked: bool,
}

/// [`CoinbaseBackend`] speaking JSON to the gateway over any [`GatewayHttpClient`].
#[derive(Clone)]
pub struct HttpCoinbaseBackend<C: GatewayHttpClient> {
    client: C,
    base_url: String,
    authorization_fingerprint: Option<String>,
    timeout: Option<Duration>,
}

impl<C: GatewayHttpClient> HttpCoinbaseBackend<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, authorization_fingerprint: None, timeout: None }
    }

    /// Sent as a bearer token on every call.
    pub fn with_authorization_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.authorization_fingerprint = Some(fingerprint.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}{}{}", self.base_url, COINBASE_ACCOUNTS_PATH, suffix)
    }

    async fn send(&self, method: HttpMethod, url: String, body: Option<Vec<u8>>) -> Result<HttpResponse> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if let Some(fingerprint) = &self.authorization_fingerprint {
            headers.push(("Authorization".to_string(), format!("Bearer {}", fingerprint)));
        }
        let request = HttpRequest { method, url, headers, body, timeout: self.timeout };
        let response = self.client.execute(request).await.map_err(|e| {
            warn!(error = %e, %method, "Gateway request failed");
            CoinbaseError::NetworkError(e.to_string())
        })?;
        check_status(response)
    }
}

/// Maps non-2xx responses onto the error taxonomy.
fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let message = error_message(&response.body).unwrap_or_else(|| format!("gateway responded with status {}", response.status));
    debug!(status = response.status, message = %message, "Gateway rejected Coinbase request");
    match response.status {
        400 | 422 => Err(CoinbaseError::ValidationError(message)),
        _ => Err(CoinbaseError::NetworkError(message)),
    }
}

/// Pulls `error.message` (or a top-level `message`) out of a gateway error body.
fn error_message(body: &[u8]) -> Option<String> {
    let v: Value = serde_json::from_slice(body).ok()?;
    v.get("error")
        .and_then(|e| e.get("message"))
        .or_else(|| v.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

#[async_trait]
impl<C: GatewayHttpClient> CoinbaseBackend for HttpCoinbaseBackend<C> {
    #[instrument(skip(self, payment_method), level = "debug")]
    async fn link_account(&self, payment_method: &CoinbasePaymentMethod, store_in_vault: bool) -> Result<()> {
        let body = LinkBody {
            coinbase_account: LinkAccountBody {
                code: payment_method.code(),
                redirect_uri: payment_method.redirect_uri(),
            },
            options: LinkOptions { store_in_vault },
        };
        let bytes = serde_json::to_vec(&body).map_err(|e| CoinbaseError::ValidationError(e.to_string()))?;
        self.send(HttpMethod::POST, self.url(""), Some(bytes)).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn unlink_account(&self) -> Result<()> {
        self.send(HttpMethod::DELETE, self.url("/current"), None).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_link_status(&self) -> Result<bool> {
        let response = self.send(HttpMethod::GET, self.url("/current"), None).await?;
        let status: LinkStatus = serde_json::from_slice(&response.body)?;
        Ok(status.linked)
    }
}
