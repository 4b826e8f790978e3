use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::backend::CoinbaseBackend;
use crate::app_switch::state::SharedState;
use crate::app_switch::types::CoinbasePaymentMethod;
use crate::error::Result;

/// Links, unlinks and verifies the Coinbase account against the gateway.
///
/// Each call returns exactly one result. The cached link flag only changes
/// after the gateway confirms; failures leave it untouched and are never retried.
pub struct AccountLinkCoordinator<B: CoinbaseBackend> {
    state: SharedState,
    backend: Arc<B>,
}

impl<B: CoinbaseBackend> Clone for AccountLinkCoordinator<B> {
    fn clone(&self) -> Self {
        Self { state: self.state.clone(), backend: self.backend.clone() }
    }
}

impl<B: CoinbaseBackend> AccountLinkCoordinator<B> {
    pub fn new(state: SharedState, backend: Arc<B>) -> Self {
        Self { state, backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Links the account behind `payment_method`, vaulting it when `store_in_vault` is set.
    /// Rejected with `OperationInProgress` while another link or unlink is running.
    #[instrument(skip(self, payment_method), fields(attempt_id = %payment_method.attempt_id), level = "debug")]
    pub async fn link_account(&self, payment_method: &CoinbasePaymentMethod) -> Result<()> {
        let _guard = self.state.begin_account_operation()?;
        let store_in_vault = self.state.store_in_vault();
        match self.backend.link_account(payment_method, store_in_vault).await {
            Ok(()) => {
                self.state.set_account_linked(true);
                info!(store_in_vault, "Coinbase account linked");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Coinbase account link failed");
                Err(e)
            }
        }
    }

    /// Unlinks the account. The gateway is always called, even when nothing is linked.
    #[instrument(skip(self), level = "debug")]
    pub async fn unlink_account(&self) -> Result<()> {
        let _guard = self.state.begin_account_operation()?;
        match self.backend.unlink_account().await {
            Ok(()) => {
                self.state.set_account_linked(false);
                info!("Coinbase account unlinked");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Coinbase account unlink failed");
                Err(e)
            }
        }
    }

    /// Asks the gateway whether an account is linked and refreshes the cached flag.
    ///
    /// A link or unlink that completes while the query is in flight wins: the
    /// read is dropped and the flag that operation confirmed is returned.
    #[instrument(skip(self), level = "debug")]
    pub async fn verify_account_link_status(&self) -> Result<bool> {
        let generation = self.state.link_generation();
        let linked = self.backend.fetch_link_status().await.inspect_err(|e| {
            warn!(error = %e, "Coinbase link status check failed");
        })?;
        Ok(self.state.refresh_account_linked(generation, linked))
    }
}
