//! App switch primitives: configuration snapshot, pending attempt, payment method and outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Scope requested when the gateway configuration does not list any.
pub const DEFAULT_SCOPES: &[&str] = &["authorizations:braintree", "user"];

/// Path every Coinbase return URL is routed through.
pub const RETURN_URL_HOST: &str = "x-callback-url";
pub const RETURN_URL_PATH: &str = "/vzero/auth/coinbase/redirect";

/// Coinbase environment the gateway points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinbaseEnvironment {
    #[default]
    Production,
    Sandbox,
    /// Used by gateway test fixtures; behaves like sandbox.
    Mock,
}

impl CoinbaseEnvironment {
    /// Host serving the browser authorization page.
    pub fn web_host(&self) -> &'static str {
        match self {
            Self::Production => "https://www.coinbase.com",
            Self::Sandbox | Self::Mock => "https://sandbox.coinbase.com",
        }
    }
}

/// Immutable snapshot of the client configuration relevant to Coinbase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Scheme the host app registered for deep-link returns.
    pub return_url_scheme: String,
    /// Whether Coinbase is enabled in the merchant's control panel.
    pub coinbase_enabled_remotely: bool,
    /// Client-side kill switch baked into the configuration.
    pub disabled_locally: bool,
    /// OAuth client id issued by Coinbase for this merchant.
    pub client_id: String,
    /// Merchant account the authorization is granted to.
    pub merchant_account: String,
    /// Requested scopes. Empty means [`DEFAULT_SCOPES`].
    pub scopes: Vec<String>,
    /// Overrides the redirect URI derived from the return scheme.
    pub redirect_url: Option<String>,
    pub environment: CoinbaseEnvironment,
}

impl Configuration {
    /// Creates a configuration with the fields the availability check reads.
    pub fn new(return_url_scheme: impl Into<String>, coinbase_enabled_remotely: bool, disabled_locally: bool) -> Self {
        Self {
            return_url_scheme: return_url_scheme.into(),
            coinbase_enabled_remotely,
            disabled_locally,
            ..Self::default()
        }
    }

    /// Parses the gateway's client configuration JSON.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_merchant_account(mut self, merchant_account: impl Into<String>) -> Self {
        self.merchant_account = merchant_account.into();
        self
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = String>) -> Self {
        self.scopes = scopes.into_iter().collect();
        self
    }

    pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
        self.redirect_url = Some(redirect_url.into());
        self
    }

    pub fn with_environment(mut self, environment: CoinbaseEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Redirect URI sent to Coinbase and expected back on return.
    pub fn redirect_uri(&self) -> String {
        match &self.redirect_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("{}://{}{}", self.return_url_scheme, RETURN_URL_HOST, RETURN_URL_PATH),
        }
    }

    /// Space-separated scope string.
    pub fn scope(&self) -> String {
        if self.scopes.is_empty() {
            DEFAULT_SCOPES.join(" ")
        } else {
            self.scopes.join(" ")
        }
    }
}

/// Where the authorization request was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchTarget {
    /// The installed Coinbase app.
    NativeApp,
    /// The Coinbase web authorization page.
    Browser,
}

/// Caller-side knobs for a single authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Open the browser when the Coinbase app refuses the URL.
    pub allow_browser_fallback: bool,
}

impl Default for AuthorizationRequest {
    fn default() -> Self {
        Self { allow_browser_fallback: true }
    }
}

/// The single in-flight app switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttempt {
    /// Correlation token echoed back as `state`.
    pub attempt_id: String,
    pub created_at: DateTime<Utc>,
    pub expected_return_scheme: String,
    /// Flips to true once, when the attempt is resolved.
    pub outcome_delivered: bool,
    pub target: SwitchTarget,
    pub redirect_uri: String,
}

impl PendingAttempt {
    /// Whether the attempt is younger than `timeout` at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, timeout: std::time::Duration) -> bool {
        match chrono::Duration::from_std(timeout) {
            Ok(limit) => now.signed_duration_since(self.created_at) < limit,
            // Timeouts beyond chrono's range never expire.
            Err(_) => true,
        }
    }
}

/// Authorized Coinbase account credential returned by the app switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinbasePaymentMethod {
    /// OAuth authorization code issued by Coinbase.
    pub code: String,
    /// Redirect URI the code was issued for.
    pub redirect_uri: String,
    /// Attempt that produced this credential.
    pub attempt_id: String,
    /// Scope Coinbase reported as granted, if any.
    pub granted_scope: Option<String>,
}

impl CoinbasePaymentMethod {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

/// Outcome of feeding a URL to the return handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandledResult {
    /// Unrelated, duplicate, stale or unparseable; nothing changed.
    NotMine,
    /// The pending attempt was resolved by this call.
    Resolved(Result<CoinbasePaymentMethod>),
}

impl HandledResult {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Convenience for callers that only care about the resolved result.
    pub fn into_result(self) -> Option<Result<CoinbasePaymentMethod>> {
        match self {
            Self::NotMine => None,
            Self::Resolved(result) => Some(result),
        }
    }
}
