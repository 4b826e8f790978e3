use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use super::state::{PendingOutcome, SharedState};
use super::surface::{AppSwitchObserver, ExternalSurface, NoopObserver};
use super::types::{AuthorizationRequest, Configuration, PendingAttempt, SwitchTarget};
use crate::crypto::generate_attempt_id;
use crate::error::{CoinbaseError, Result};
use crate::url_encoding::encode_query;

/// Authorization endpoint understood by the Coinbase app.
pub const NATIVE_AUTHORIZE_URL: &str = "com.coinbase.oauth-authorize:authorize";

/// Path of the browser authorization page, relative to the environment host.
pub const WEB_AUTHORIZE_PATH: &str = "/oauth/authorize";

/// How long a launched attempt blocks new launches.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Launcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherOptions {
    /// Age after which a pending attempt is considered stale and may be superseded.
    pub attempt_timeout: Duration,
}

impl Default for LauncherOptions {
    fn default() -> Self {
        Self { attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT }
    }
}

impl LauncherOptions {
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}

/// A launched attempt and the receiver for its eventual outcome.
#[derive(Debug)]
pub struct LaunchedAttempt {
    pub attempt: PendingAttempt,
    pub outcome: PendingOutcome,
}

/// Query parameters of the Coinbase authorization request.
pub fn authorization_query(config: &Configuration, attempt_id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("response_type", "code".to_string()),
        ("client_id", config.client_id.clone()),
        ("redirect_uri", config.redirect_uri()),
        ("scope", config.scope()),
        ("state", attempt_id.to_string()),
        ("meta[authorizations_merchant_account]", config.merchant_account.clone()),
    ]
}

/// Full authorization URL for `target`.
pub fn authorization_url(config: &Configuration, target: SwitchTarget, attempt_id: &str) -> String {
    let query = encode_query(&authorization_query(config, attempt_id));
    match target {
        SwitchTarget::NativeApp => format!("{}?{}", NATIVE_AUTHORIZE_URL, query),
        SwitchTarget::Browser => format!("{}{}?{}", config.environment.web_host(), WEB_AUTHORIZE_PATH, query),
    }
}

/// Opens the Coinbase authorization and records the attempt as pending.
pub struct SwitchLauncher<S: ExternalSurface> {
    state: SharedState,
    surface: Arc<S>,
    observer: Arc<dyn AppSwitchObserver>,
    options: LauncherOptions,
}

impl<S: ExternalSurface> SwitchLauncher<S> {
    pub fn new(state: SharedState, surface: Arc<S>) -> Self {
        Self {
            state,
            surface,
            observer: Arc::new(NoopObserver),
            options: LauncherOptions::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AppSwitchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_options(mut self, options: LauncherOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LauncherOptions {
        &self.options
    }

    pub fn surface(&self) -> &Arc<S> {
        &self.surface
    }

    /// Launches a new authorization attempt.
    ///
    /// A fresh unresolved attempt makes this fail with
    /// [`CoinbaseError::AttemptAlreadyInProgress`]; a stale one is superseded.
    /// The handoff is fire-and-forget: the outcome arrives through the return handler.
    #[instrument(skip(self, config, request), level = "debug")]
    pub fn launch(&self, config: &Configuration, request: &AuthorizationRequest) -> Result<LaunchedAttempt> {
        let first_target = if self.surface.is_app_installed() {
            SwitchTarget::NativeApp
        } else if request.allow_browser_fallback {
            SwitchTarget::Browser
        } else {
            return Err(CoinbaseError::Unavailable("Coinbase app is not installed".into()));
        };

        let attempt_id = generate_attempt_id()?;
        let attempt = PendingAttempt {
            attempt_id: attempt_id.clone(),
            created_at: Utc::now(),
            expected_return_scheme: config.return_url_scheme.clone(),
            outcome_delivered: false,
            target: first_target,
            redirect_uri: config.redirect_uri(),
        };

        let outcome = {
            let mut state = self.state.lock();
            if let Some(existing) = state.pending_attempt() {
                if !existing.outcome_delivered && existing.is_fresh(Utc::now(), self.options.attempt_timeout) {
                    return Err(CoinbaseError::AttemptAlreadyInProgress);
                }
                warn!(
                    superseded = %existing.attempt_id,
                    created_at = %existing.created_at,
                    "Superseding stale Coinbase attempt"
                );
            }
            self.state.install_attempt(&mut state, attempt.clone())
        };

        self.observer.will_perform_app_switch();
        let target = match self.hand_off(config, first_target, request, &attempt_id) {
            Some(target) => target,
            None => {
                self.state.discard_attempt(&attempt_id);
                warn!(attempt_id = %attempt_id, "No surface accepted the Coinbase authorization URL");
                return Err(CoinbaseError::SwitchFailed);
            }
        };
        // A surface that returns synchronously may already have resolved the attempt.
        let attempt = self.state.retarget_attempt(&attempt_id, target).unwrap_or(PendingAttempt {
            target,
            outcome_delivered: true,
            ..attempt
        });
        self.observer.did_perform_app_switch(target);
        debug!(attempt_id = %attempt_id, ?target, "Coinbase app switch performed");

        Ok(LaunchedAttempt { attempt, outcome })
    }

    fn hand_off(
        &self,
        config: &Configuration,
        first_target: SwitchTarget,
        request: &AuthorizationRequest,
        attempt_id: &str,
    ) -> Option<SwitchTarget> {
        if self.surface.open(first_target, &authorization_url(config, first_target, attempt_id)) {
            return Some(first_target);
        }
        if first_target == SwitchTarget::NativeApp && request.allow_browser_fallback {
            debug!(attempt_id = %attempt_id, "Coinbase app refused the URL, falling back to browser");
            let browser = SwitchTarget::Browser;
            if self.surface.open(browser, &authorization_url(config, browser, attempt_id)) {
                return Some(browser);
            }
        }
        None
    }
}
