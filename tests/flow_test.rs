use std::sync::{Arc, Mutex};

use braintree_coinbase::{
    AppSwitchObserver, AppSwitching, AuthorizationRequest, Coinbase, CoinbaseError, Configuration, HandledResult,
    InMemoryCoinbaseBackend, RecordingSurface, SharedState, SwitchTarget,
};

const SCHEME: &str = "com.example.payments";

fn config() -> Configuration {
    Configuration::new(SCHEME, true, false).with_client_id("cb-client")
}

fn coinbase(surface: RecordingSurface) -> Coinbase<RecordingSurface, InMemoryCoinbaseBackend> {
    Coinbase::with_state(SharedState::new(), config(), Arc::new(surface), Arc::new(InMemoryCoinbaseBackend::new()))
}

fn return_url(query: &str) -> String {
    format!("{}://x-callback-url/vzero/auth/coinbase/redirect?{}", SCHEME, query)
}

#[tokio::test]
async fn test_authorize_return_link_end_to_end() {
    let coinbase = coinbase(RecordingSurface::new());
    coinbase.set_store_in_vault(true);
    assert!(coinbase.provider_app_switch_available());

    let launched = coinbase.authorize(&AuthorizationRequest::default()).unwrap();
    let url = return_url(&format!("state={}&code=AUTHCODE", launched.attempt.attempt_id));
    assert!(coinbase.can_handle_return_url(&url));

    let method = match coinbase.handle_return_url(&url) {
        HandledResult::Resolved(Ok(method)) => method,
        other => panic!("unexpected {:?}", other),
    };
    assert!(!coinbase.is_account_linked());
    coinbase.link_account(&method).await.unwrap();
    assert!(coinbase.is_account_linked());
    assert_eq!(coinbase.accounts().backend().vaulted_tokens().len(), 1);
}

#[tokio::test]
async fn test_complete_app_switch_links_in_one_step() {
    let coinbase = coinbase(RecordingSurface::new());
    let launched = coinbase.authorize(&AuthorizationRequest::default()).unwrap();
    let url = return_url(&format!("state={}&code=AUTHCODE", launched.attempt.attempt_id));

    let method = coinbase.complete_app_switch(&url).await.unwrap().unwrap();
    assert_eq!(method.code, "AUTHCODE");
    assert!(coinbase.is_account_linked());

    // A redelivered URL is not ours anymore.
    assert!(coinbase.complete_app_switch(&url).await.is_none());
}

#[tokio::test]
async fn test_cancelled_switch_leaves_link_state() {
    let coinbase = coinbase(RecordingSurface::new());
    let launched = coinbase.authorize(&AuthorizationRequest::default()).unwrap();
    let url = return_url(&format!("state={}&error=user_cancelled", launched.attempt.attempt_id));

    let outcome = coinbase.complete_app_switch(&url).await.unwrap();
    assert_eq!(outcome, Err(CoinbaseError::UserCancelled));
    assert!(!coinbase.is_account_linked());
    assert_eq!(coinbase.accounts().backend().call_count("link"), 0);
    assert!(coinbase.pending_attempt().is_none());
}

#[test]
fn test_disabled_client_cannot_authorize() {
    let coinbase = coinbase(RecordingSurface::new());
    coinbase.set_disabled(true);
    assert!(coinbase.disabled());
    assert!(!coinbase.provider_app_switch_available());
    assert!(!coinbase.check_availability());
    assert!(matches!(coinbase.authorize(&AuthorizationRequest::default()), Err(CoinbaseError::Unavailable(_))));
    assert!(coinbase.pending_attempt().is_none());
}

#[test]
fn test_remote_configuration_gates_authorize() {
    let mut coinbase = coinbase(RecordingSurface::new());
    coinbase.set_configuration(Configuration::new(SCHEME, false, false));
    assert!(matches!(coinbase.authorize(&AuthorizationRequest::default()), Err(CoinbaseError::Unavailable(_))));
}

#[test]
fn test_browser_authorization_without_app() {
    let coinbase = coinbase(RecordingSurface::without_app());
    // Native app switch is unavailable, but the browser flow still works.
    assert!(!coinbase.provider_app_switch_available());
    let launched = coinbase.launch(&AuthorizationRequest::default()).unwrap();
    assert_eq!(launched.attempt.target, SwitchTarget::Browser);
}

#[test]
fn test_cancel_then_relaunch() {
    let coinbase = coinbase(RecordingSurface::new());
    let first = coinbase.authorize(&AuthorizationRequest::default()).unwrap();
    assert_eq!(
        coinbase.authorize(&AuthorizationRequest::default()).unwrap_err(),
        CoinbaseError::AttemptAlreadyInProgress
    );
    assert_eq!(coinbase.cancel_pending_attempt().unwrap().attempt_id, first.attempt.attempt_id);
    let second = coinbase.authorize(&AuthorizationRequest::default()).unwrap();
    assert_ne!(first.attempt.attempt_id, second.attempt.attempt_id);
    assert_eq!(
        coinbase.expire_attempt(&second.attempt.attempt_id),
        HandledResult::Resolved(Err(CoinbaseError::Timeout))
    );
}

#[derive(Default)]
struct ProcessLog {
    processed: Mutex<usize>,
}

impl AppSwitchObserver for ProcessLog {
    fn will_process_app_switch(&self) {
        *self.processed.lock().unwrap() += 1;
    }
}

#[test]
fn test_observer_notified_for_matching_return_only() {
    let log = Arc::new(ProcessLog::default());
    let coinbase = coinbase(RecordingSurface::new()).with_observer(log.clone());
    let launched = coinbase.authorize(&AuthorizationRequest::default()).unwrap();

    coinbase.handle_return(&return_url("state=nope&code=x"));
    assert_eq!(*log.processed.lock().unwrap(), 0);
    coinbase.handle_return(&return_url(&format!("state={}&code=x", launched.attempt.attempt_id)));
    assert_eq!(*log.processed.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_shared_state_is_process_wide_and_resettable() {
    let shared = SharedState::shared();
    let coinbase = Coinbase::new(config(), Arc::new(RecordingSurface::new()), Arc::new(InMemoryCoinbaseBackend::new()));
    coinbase.set_store_in_vault(true);
    assert!(SharedState::shared().store_in_vault());

    coinbase.authorize(&AuthorizationRequest::default()).unwrap();
    assert!(shared.pending_attempt().is_some());

    shared.reset();
    assert!(coinbase.pending_attempt().is_none());
    assert!(!coinbase.store_in_vault());
    assert!(!coinbase.is_account_linked());
}
