use std::sync::{Arc, Mutex};
use std::time::Duration;

use braintree_coinbase::url_encoding::decode_query;
use braintree_coinbase::{
    AppSwitchObserver, AuthorizationRequest, CoinbaseEnvironment, CoinbaseError, Configuration, LauncherOptions,
    RecordingSurface, SharedState, SwitchLauncher, SwitchTarget,
};

fn config() -> Configuration {
    Configuration::new("com.example.payments", true, false)
        .with_client_id("cb-client")
        .with_merchant_account("merchant@example.com")
}

fn query_of(url: &str) -> Vec<(String, String)> {
    decode_query(url.split_once('?').map(|(_, q)| q).unwrap_or_default())
}

#[test]
fn test_launch_records_single_pending_attempt() {
    let state = SharedState::new();
    let surface = Arc::new(RecordingSurface::new());
    let launcher = SwitchLauncher::new(state.clone(), surface.clone());

    let launched = launcher.launch(&config(), &AuthorizationRequest::default()).unwrap();
    let pending = state.pending_attempt().unwrap();
    assert_eq!(pending.attempt_id, launched.attempt.attempt_id);
    assert_eq!(launched.outcome.attempt_id(), pending.attempt_id);
    assert_eq!(pending.expected_return_scheme, "com.example.payments");
    assert_eq!(pending.target, SwitchTarget::NativeApp);
    assert!(!pending.outcome_delivered);

    let (target, url) = surface.last_opened().unwrap();
    assert_eq!(target, SwitchTarget::NativeApp);
    assert!(url.starts_with("com.coinbase.oauth-authorize:authorize?"));
    let query = query_of(&url);
    assert!(query.contains(&("state".to_string(), pending.attempt_id.clone())));
    assert!(query.contains(&("client_id".to_string(), "cb-client".to_string())));
    assert!(query.contains(&("response_type".to_string(), "code".to_string())));
    assert!(query.contains(&(
        "redirect_uri".to_string(),
        "com.example.payments://x-callback-url/vzero/auth/coinbase/redirect".to_string()
    )));
    assert!(query.contains(&(
        "meta[authorizations_merchant_account]".to_string(),
        "merchant@example.com".to_string()
    )));
}

#[test]
fn test_second_launch_within_timeout_is_rejected() {
    let state = SharedState::new();
    let surface = Arc::new(RecordingSurface::new());
    let launcher = SwitchLauncher::new(state.clone(), surface.clone());

    let first = launcher.launch(&config(), &AuthorizationRequest::default()).unwrap();
    let err = launcher.launch(&config(), &AuthorizationRequest::default()).unwrap_err();
    assert_eq!(err, CoinbaseError::AttemptAlreadyInProgress);
    assert_eq!(state.pending_attempt().unwrap().attempt_id, first.attempt.attempt_id);
    assert_eq!(surface.opened().len(), 1);
}

#[tokio::test]
async fn test_stale_attempt_is_superseded() {
    let state = SharedState::new();
    let launcher = SwitchLauncher::new(state.clone(), Arc::new(RecordingSurface::new()))
        .with_options(LauncherOptions::default().with_attempt_timeout(Duration::ZERO));

    let first = launcher.launch(&config(), &AuthorizationRequest::default()).unwrap();
    let second = launcher.launch(&config(), &AuthorizationRequest::default()).unwrap();
    assert_ne!(first.attempt.attempt_id, second.attempt.attempt_id);
    assert_eq!(state.pending_attempt().unwrap().attempt_id, second.attempt.attempt_id);

    // The superseded attempt never gets an outcome.
    assert!(first.outcome.wait(None).await.is_none());
}

#[test]
fn test_attempt_ids_are_unique() {
    let state = SharedState::new();
    let launcher = SwitchLauncher::new(state.clone(), Arc::new(RecordingSurface::new()));
    let mut seen = std::collections::HashSet::new();
    for _ in 0..20 {
        let launched = launcher.launch(&config(), &AuthorizationRequest::default()).unwrap();
        assert!(seen.insert(launched.attempt.attempt_id));
        state.cancel_pending_attempt();
    }
}

#[test]
fn test_browser_fallback_without_app() {
    let state = SharedState::new();
    let surface = Arc::new(RecordingSurface::without_app());
    let launcher = SwitchLauncher::new(state.clone(), surface.clone());
    let config = config().with_environment(CoinbaseEnvironment::Sandbox);

    let launched = launcher.launch(&config, &AuthorizationRequest::default()).unwrap();
    assert_eq!(launched.attempt.target, SwitchTarget::Browser);
    let (target, url) = surface.last_opened().unwrap();
    assert_eq!(target, SwitchTarget::Browser);
    assert!(url.starts_with("https://sandbox.coinbase.com/oauth/authorize?"));
}

#[test]
fn test_browser_fallback_when_app_refuses() {
    let state = SharedState::new();
    let surface = Arc::new(RecordingSurface::new().refusing_app());
    let launcher = SwitchLauncher::new(state.clone(), surface.clone());

    let launched = launcher.launch(&config(), &AuthorizationRequest::default()).unwrap();
    let targets: Vec<_> = surface.attempted().into_iter().map(|(target, _)| target).collect();
    assert_eq!(targets, vec![SwitchTarget::NativeApp, SwitchTarget::Browser]);
    let (target, url) = surface.last_opened().unwrap();
    assert_eq!(target, SwitchTarget::Browser);
    assert!(url.starts_with("https://www.coinbase.com/oauth/authorize?"));
    assert_eq!(launched.attempt.target, SwitchTarget::Browser);
    assert_eq!(state.pending_attempt().unwrap().target, SwitchTarget::Browser);
}

#[test]
fn test_refusing_app_without_fallback_fails() {
    let state = SharedState::new();
    let surface = Arc::new(RecordingSurface::new().refusing_app());
    let launcher = SwitchLauncher::new(state.clone(), surface.clone());
    let request = AuthorizationRequest { allow_browser_fallback: false };

    assert_eq!(launcher.launch(&config(), &request).unwrap_err(), CoinbaseError::SwitchFailed);
    assert_eq!(surface.attempted().len(), 1);
    assert!(state.pending_attempt().is_none());
}

#[test]
fn test_no_fallback_requires_app() {
    let state = SharedState::new();
    let launcher = SwitchLauncher::new(state.clone(), Arc::new(RecordingSurface::without_app()));
    let request = AuthorizationRequest { allow_browser_fallback: false };

    let err = launcher.launch(&config(), &request).unwrap_err();
    assert!(matches!(err, CoinbaseError::Unavailable(_)));
    assert!(state.pending_attempt().is_none());
}

#[test]
fn test_failed_handoff_leaves_no_attempt() {
    let state = SharedState::new();
    let surface = Arc::new(RecordingSurface::without_app().refusing_browser());
    let launcher = SwitchLauncher::new(state.clone(), surface.clone());

    let err = launcher.launch(&config(), &AuthorizationRequest::default()).unwrap_err();
    assert_eq!(err, CoinbaseError::SwitchFailed);
    assert!(state.pending_attempt().is_none());
    assert!(surface.opened().is_empty());
}

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl AppSwitchObserver for EventLog {
    fn will_perform_app_switch(&self) {
        self.events.lock().unwrap().push("will_perform".into());
    }

    fn did_perform_app_switch(&self, target: SwitchTarget) {
        self.events.lock().unwrap().push(format!("did_perform:{:?}", target));
    }
}

#[test]
fn test_observer_sees_switch_lifecycle() {
    let log = Arc::new(EventLog::default());
    let launcher = SwitchLauncher::new(SharedState::new(), Arc::new(RecordingSurface::new()))
        .with_observer(log.clone());

    launcher.launch(&config(), &AuthorizationRequest::default()).unwrap();
    assert_eq!(*log.events.lock().unwrap(), vec!["will_perform".to_string(), "did_perform:NativeApp".to_string()]);
}
