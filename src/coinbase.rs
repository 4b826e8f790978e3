//! The Coinbase coordinator: one instance wiring app switch and account linking over a shared state.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::account::backend::CoinbaseBackend;
use crate::account::coordinator::AccountLinkCoordinator;
use crate::app_switch::availability::{is_available, unavailability_reason};
use crate::app_switch::launcher::{LaunchedAttempt, LauncherOptions, SwitchLauncher};
use crate::app_switch::provider::AppSwitching;
use crate::app_switch::return_handler::ReturnHandler;
use crate::app_switch::state::SharedState;
use crate::app_switch::surface::{AppSwitchObserver, ExternalSurface};
use crate::app_switch::types::{AuthorizationRequest, CoinbasePaymentMethod, Configuration, HandledResult, PendingAttempt};
use crate::error::{CoinbaseError, Result};

/// Coordinates Coinbase authorization via app switch and account association.
///
/// ```no_run
/// use std::sync::Arc;
/// use braintree_coinbase::{Coinbase, Configuration, InMemoryCoinbaseBackend, RecordingSurface};
///
/// let config = Configuration::new("com.example.payments", true, false);
/// let coinbase = Coinbase::new(config, Arc::new(RecordingSurface::new()), Arc::new(InMemoryCoinbaseBackend::new()));
/// coinbase.set_store_in_vault(true);
/// assert!(coinbase.provider_app_switch_available());
/// ```
pub struct Coinbase<S: ExternalSurface, B: CoinbaseBackend> {
    state: SharedState,
    config: Configuration,
    launcher: SwitchLauncher<S>,
    returns: ReturnHandler,
    accounts: AccountLinkCoordinator<B>,
}

impl<S: ExternalSurface, B: CoinbaseBackend> Coinbase<S, B> {
    /// Creates a coordinator over the process-wide state.
    pub fn new(config: Configuration, surface: Arc<S>, backend: Arc<B>) -> Self {
        Self::with_state(SharedState::shared(), config, surface, backend)
    }

    /// Creates a coordinator over an explicit state.
    pub fn with_state(state: SharedState, config: Configuration, surface: Arc<S>, backend: Arc<B>) -> Self {
        Self {
            launcher: SwitchLauncher::new(state.clone(), surface),
            returns: ReturnHandler::new(state.clone()),
            accounts: AccountLinkCoordinator::new(state.clone(), backend),
            state,
            config,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AppSwitchObserver>) -> Self {
        self.launcher = self.launcher.with_observer(observer.clone());
        self.returns = self.returns.with_observer(observer);
        self
    }

    pub fn with_launcher_options(mut self, options: LauncherOptions) -> Self {
        self.launcher = self.launcher.with_options(options);
        self
    }

    /// Replaces the configuration snapshot, e.g. after a gateway refetch.
    pub fn set_configuration(&mut self, config: Configuration) {
        self.config = config;
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn accounts(&self) -> &AccountLinkCoordinator<B> {
        &self.accounts
    }

    /// Client-side kill switch, e.g. for certain customers, geographies or devices.
    pub fn disabled(&self) -> bool {
        self.state.disabled()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.state.set_disabled(disabled);
    }

    /// Whether linked accounts are also vaulted for reuse.
    pub fn store_in_vault(&self) -> bool {
        self.state.store_in_vault()
    }

    pub fn set_store_in_vault(&self, store_in_vault: bool) {
        self.state.set_store_in_vault(store_in_vault);
    }

    /// Cached result of the last confirmed link, unlink or verification.
    pub fn is_account_linked(&self) -> bool {
        self.state.is_account_linked()
    }

    pub fn pending_attempt(&self) -> Option<PendingAttempt> {
        self.state.pending_attempt()
    }

    /// Whether the Coinbase app is installed and this client is configured for app switch.
    pub fn provider_app_switch_available(&self) -> bool {
        !self.disabled() && is_available(&self.config, self.launcher.surface().is_app_installed())
    }

    /// Opens Coinbase for authorization.
    ///
    /// Unlike [`Coinbase::provider_app_switch_available`] this does not require the
    /// app: without it the browser is used when the request allows fallback.
    #[instrument(skip(self, request), level = "debug")]
    pub fn authorize(&self, request: &AuthorizationRequest) -> Result<LaunchedAttempt> {
        if self.disabled() {
            return Err(CoinbaseError::Unavailable("Coinbase is disabled on this client".into()));
        }
        if let Some(reason) = unavailability_reason(&self.config, true) {
            return Err(reason);
        }
        self.launcher.launch(&self.config, request)
    }

    pub fn can_handle_return_url(&self, url: &str) -> bool {
        self.returns.can_handle_return_url(url)
    }

    /// Feeds a deep link to the return handler.
    pub fn handle_return_url(&self, url: &str) -> HandledResult {
        self.returns.handle_return(url)
    }

    /// Handles a deep link and, on a successful authorization, links the account.
    ///
    /// `None` means the URL was not ours. Otherwise the authorization result,
    /// or the link failure, is returned.
    pub async fn complete_app_switch(&self, url: &str) -> Option<Result<CoinbasePaymentMethod>> {
        let payment_method = match self.returns.handle_return(url).into_result()? {
            Ok(payment_method) => payment_method,
            Err(e) => return Some(Err(e)),
        };
        debug!(attempt_id = %payment_method.attempt_id, "Linking authorized Coinbase account");
        Some(self.accounts.link_account(&payment_method).await.map(|_| payment_method))
    }

    /// Resolves the pending attempt with `Timeout` if it is still `attempt_id`.
    pub fn expire_attempt(&self, attempt_id: &str) -> HandledResult {
        self.returns.expire(attempt_id)
    }

    /// Forgets the pending attempt without delivering an outcome.
    pub fn cancel_pending_attempt(&self) -> Option<PendingAttempt> {
        self.state.cancel_pending_attempt()
    }

    pub async fn link_account(&self, payment_method: &CoinbasePaymentMethod) -> Result<()> {
        self.accounts.link_account(payment_method).await
    }

    pub async fn unlink_account(&self) -> Result<()> {
        self.accounts.unlink_account().await
    }

    pub async fn verify_account_link_status(&self) -> Result<bool> {
        self.accounts.verify_account_link_status().await
    }
}

impl<S: ExternalSurface, B: CoinbaseBackend> AppSwitching for Coinbase<S, B> {
    fn check_availability(&self) -> bool {
        self.provider_app_switch_available()
    }

    fn launch(&self, request: &AuthorizationRequest) -> Result<LaunchedAttempt> {
        self.authorize(request)
    }

    fn can_handle_return_url(&self, url: &str) -> bool {
        Coinbase::can_handle_return_url(self, url)
    }

    fn handle_return(&self, url: &str) -> HandledResult {
        self.handle_return_url(url)
    }
}
