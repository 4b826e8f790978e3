use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::return_url::{ReturnPayload, ReturnUrl};
use super::state::SharedState;
use super::surface::{AppSwitchObserver, NoopObserver};
use super::types::{CoinbasePaymentMethod, HandledResult};
use crate::crypto::tokens_match;
use crate::error::CoinbaseError;

/// Matches deep-link returns to the pending attempt and resolves it exactly once.
pub struct ReturnHandler {
    state: SharedState,
    observer: Arc<dyn AppSwitchObserver>,
}

impl ReturnHandler {
    pub fn new(state: SharedState) -> Self {
        Self { state, observer: Arc::new(NoopObserver) }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AppSwitchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Whether `url` is addressed to the pending attempt's redirect URI.
    /// Does not check the correlation token.
    pub fn can_handle_return_url(&self, url: &str) -> bool {
        let Some(pending) = self.state.pending_attempt() else {
            return false;
        };
        ReturnUrl::parse(url).is_some_and(|parsed| parsed.is_return_to(&pending.redirect_uri))
    }

    /// Resolves the pending attempt from a deep link.
    ///
    /// Anything that is not a well-formed Coinbase return carrying the pending
    /// attempt's token is `NotMine` and changes nothing. So is a repeat delivery
    /// of a URL that already resolved the attempt.
    #[instrument(skip(self, url), level = "debug")]
    pub fn handle_return(&self, url: &str) -> HandledResult {
        let Some(pending) = self.state.pending_attempt() else {
            debug!("No pending Coinbase attempt, ignoring return URL");
            return HandledResult::NotMine;
        };
        if pending.outcome_delivered {
            return HandledResult::NotMine;
        }
        let Some(parsed) = ReturnUrl::parse(url) else {
            debug!("Unparseable return URL ignored");
            return HandledResult::NotMine;
        };
        if !parsed.is_return_to(&pending.redirect_uri) {
            return HandledResult::NotMine;
        }
        match parsed.state() {
            Some(token) if tokens_match(&pending.attempt_id, token) => {}
            _ => {
                warn!(attempt_id = %pending.attempt_id, "Coinbase return URL with unknown state ignored");
                return HandledResult::NotMine;
            }
        }

        let outcome = match parsed.payload() {
            ReturnPayload::Authorized { code, granted_scope } => Ok(CoinbasePaymentMethod {
                code,
                redirect_uri: pending.redirect_uri.clone(),
                attempt_id: pending.attempt_id.clone(),
                granted_scope,
            }),
            ReturnPayload::Cancelled => Err(CoinbaseError::UserCancelled),
            ReturnPayload::Denied(reason) => Err(CoinbaseError::AuthorizationDenied(reason)),
        };

        if !self.state.resolve_pending(&pending.attempt_id, outcome.clone()) {
            // Lost a race with another delivery of the same return.
            return HandledResult::NotMine;
        }
        self.observer.will_process_app_switch();
        match &outcome {
            Ok(_) => info!(attempt_id = %pending.attempt_id, "Coinbase authorization succeeded"),
            Err(e) => info!(attempt_id = %pending.attempt_id, error = %e, "Coinbase authorization failed"),
        }
        HandledResult::Resolved(outcome)
    }

    /// Resolves `attempt_id` with [`CoinbaseError::Timeout`] if it is still pending.
    pub fn expire(&self, attempt_id: &str) -> HandledResult {
        if self.state.resolve_pending(attempt_id, Err(CoinbaseError::Timeout)) {
            info!(attempt_id = %attempt_id, "Coinbase attempt expired");
            HandledResult::Resolved(Err(CoinbaseError::Timeout))
        } else {
            HandledResult::NotMine
        }
    }
}
