//! Process-wide coordinator state shared by the launcher, return handler and account coordinator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lazy_static::lazy_static;
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::types::{CoinbasePaymentMethod, PendingAttempt, SwitchTarget};
use crate::error::{CoinbaseError, Result};

lazy_static! {
    static ref SHARED: SharedState = SharedState::new();
}

type OutcomeSender = oneshot::Sender<Result<CoinbasePaymentMethod>>;

/// The pending attempt together with whoever is waiting on it.
struct PendingSlot {
    attempt: PendingAttempt,
    notifier: Option<OutcomeSender>,
}

/// Everything the coordinator mutates. Only reachable through [`SharedState`].
#[derive(Default)]
pub struct CoordinatorState {
    pub disabled: bool,
    pub store_in_vault: bool,
    pub is_account_linked: bool,
    pending: Option<PendingSlot>,
    operation_in_flight: bool,
    /// Bumped by every confirmed link or unlink.
    link_generation: u64,
}

impl CoordinatorState {
    pub fn pending_attempt(&self) -> Option<&PendingAttempt> {
        self.pending.as_ref().map(|slot| &slot.attempt)
    }
}

/// Cheaply clonable handle to one [`CoordinatorState`].
///
/// All mutation goes through a mutex that is never held across an await point.
#[derive(Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<CoordinatorState>>,
}

impl SharedState {
    /// Creates an isolated state, mostly useful for tests and multi-tenant hosts.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide state.
    pub fn shared() -> SharedState {
        SHARED.clone()
    }

    /// Restores the default state, dropping any pending attempt without an outcome.
    pub fn reset(&self) {
        *self.lock() = CoordinatorState::default();
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn disabled(&self) -> bool {
        self.lock().disabled
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.lock().disabled = disabled;
    }

    pub fn store_in_vault(&self) -> bool {
        self.lock().store_in_vault
    }

    pub fn set_store_in_vault(&self, store_in_vault: bool) {
        self.lock().store_in_vault = store_in_vault;
    }

    pub fn is_account_linked(&self) -> bool {
        self.lock().is_account_linked
    }

    /// Records a link or unlink the gateway confirmed.
    pub(crate) fn set_account_linked(&self, linked: bool) {
        let mut state = self.lock();
        state.is_account_linked = linked;
        state.link_generation += 1;
    }

    pub(crate) fn link_generation(&self) -> u64 {
        self.lock().link_generation
    }

    /// Stores a status read taken at `generation`, unless a link or unlink
    /// completed since. Returns the cached flag afterwards.
    pub(crate) fn refresh_account_linked(&self, generation: u64, linked: bool) -> bool {
        let mut state = self.lock();
        if state.link_generation == generation {
            state.is_account_linked = linked;
        } else {
            debug!(linked, "Discarding link status read overtaken by a link or unlink");
        }
        state.is_account_linked
    }

    /// Snapshot of the pending attempt, if any.
    pub fn pending_attempt(&self) -> Option<PendingAttempt> {
        self.lock().pending_attempt().cloned()
    }

    /// Installs `attempt` as the pending one and returns a receiver for its outcome.
    /// Whatever was pending before is dropped without an outcome.
    pub(crate) fn install_attempt(&self, state: &mut CoordinatorState, attempt: PendingAttempt) -> PendingOutcome {
        let (tx, rx) = oneshot::channel();
        let attempt_id = attempt.attempt_id.clone();
        state.pending = Some(PendingSlot { attempt, notifier: Some(tx) });
        PendingOutcome { attempt_id, receiver: rx, state: self.clone() }
    }

    /// Drops the pending attempt without delivering any outcome.
    pub fn cancel_pending_attempt(&self) -> Option<PendingAttempt> {
        let cancelled = self.lock().pending.take().map(|slot| slot.attempt);
        if let Some(attempt) = &cancelled {
            info!(attempt_id = %attempt.attempt_id, "Pending Coinbase attempt cancelled");
        }
        cancelled
    }

    /// Drops the pending attempt without an outcome, but only if it is still `attempt_id`.
    pub(crate) fn discard_attempt(&self, attempt_id: &str) -> bool {
        let mut state = self.lock();
        let ours = state.pending.as_ref().is_some_and(|slot| slot.attempt.attempt_id == attempt_id);
        if ours {
            state.pending = None;
        }
        ours
    }

    /// Records the surface that actually accepted the attempt's URL.
    pub(crate) fn retarget_attempt(&self, attempt_id: &str, target: SwitchTarget) -> Option<PendingAttempt> {
        let mut state = self.lock();
        match state.pending.as_mut() {
            Some(slot) if slot.attempt.attempt_id == attempt_id => {
                slot.attempt.target = target;
                Some(slot.attempt.clone())
            }
            _ => None,
        }
    }

    /// Resolves the pending attempt if it is `attempt_id` and has not been resolved yet.
    ///
    /// Returns false, changing nothing, for any other attempt.
    pub(crate) fn resolve_pending(&self, attempt_id: &str, outcome: Result<CoinbasePaymentMethod>) -> bool {
        let slot = {
            let mut state = self.lock();
            match state.pending.as_mut() {
                Some(slot) if slot.attempt.attempt_id == attempt_id && !slot.attempt.outcome_delivered => {
                    slot.attempt.outcome_delivered = true;
                }
                _ => return false,
            }
            state.pending.take()
        };
        if let Some(PendingSlot { attempt, notifier }) = slot {
            debug!(attempt_id = %attempt.attempt_id, success = outcome.is_ok(), "Pending Coinbase attempt resolved");
            if let Some(tx) = notifier {
                // The waiter may have gone away; the outcome is still returned to the caller.
                let _ = tx.send(outcome);
            }
        }
        true
    }

    /// Marks the start of a link/unlink call, failing if one is already running.
    pub(crate) fn begin_account_operation(&self) -> Result<AccountOperationGuard> {
        let mut state = self.lock();
        if state.operation_in_flight {
            return Err(CoinbaseError::OperationInProgress);
        }
        state.operation_in_flight = true;
        Ok(AccountOperationGuard { state: self.clone() })
    }
}

/// Clears the in-flight marker when the account operation ends or is dropped.
pub(crate) struct AccountOperationGuard {
    state: SharedState,
}

impl Drop for AccountOperationGuard {
    fn drop(&mut self) {
        self.state.lock().operation_in_flight = false;
    }
}

/// Receiver side of a launched attempt.
pub struct PendingOutcome {
    attempt_id: String,
    receiver: oneshot::Receiver<Result<CoinbasePaymentMethod>>,
    state: SharedState,
}

impl std::fmt::Debug for PendingOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingOutcome").field("attempt_id", &self.attempt_id).finish()
    }
}

impl PendingOutcome {
    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    /// Waits for the attempt to resolve.
    ///
    /// With a timeout, an attempt still pending when it elapses is resolved with
    /// [`CoinbaseError::Timeout`]. Returns `None` when the attempt was cancelled
    /// or superseded before resolving.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Option<Result<CoinbasePaymentMethod>> {
        let Some(limit) = timeout else {
            return self.receiver.await.ok();
        };
        if let Ok(received) = tokio::time::timeout(limit, &mut self.receiver).await {
            return received.ok();
        }
        if self.state.resolve_pending(&self.attempt_id, Err(CoinbaseError::Timeout)) {
            info!(attempt_id = %self.attempt_id, "Pending Coinbase attempt timed out");
        }
        // Our slot is gone by now, so the sender was either used or dropped.
        self.receiver.await.ok()
    }
}
