//! Collaborators on the host side of the app switch: the URL opener and lifecycle observer.

use std::sync::{Arc, Mutex, PoisonError};

use super::types::SwitchTarget;

/// Opens authorization URLs in the Coinbase app or the browser.
pub trait ExternalSurface: Send + Sync + 'static {
    /// Whether the Coinbase app is installed and accepts authorization URLs.
    fn is_app_installed(&self) -> bool;

    /// Hands `url` to `target`. Returns false when the target refused it.
    /// Must not block waiting for the user.
    fn open(&self, target: SwitchTarget, url: &str) -> bool;
}

/// Receives app switch lifecycle notifications. All methods default to no-ops.
pub trait AppSwitchObserver: Send + Sync + 'static {
    /// About to leave the host app.
    fn will_perform_app_switch(&self) {}

    /// Control was handed to `target`.
    fn did_perform_app_switch(&self, _target: SwitchTarget) {}

    /// A return URL resolved the pending attempt; its outcome is about to be handed back.
    fn will_process_app_switch(&self) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AppSwitchObserver for NoopObserver {}

/// In-memory surface for tests: records every URL it is handed.
#[derive(Clone)]
pub struct RecordingSurface {
    app_installed: bool,
    accepts_app: bool,
    accepts_browser: bool,
    attempted: Arc<Mutex<Vec<(SwitchTarget, String)>>>,
    opened: Arc<Mutex<Vec<(SwitchTarget, String)>>>,
}

impl RecordingSurface {
    /// A surface with the Coinbase app installed and accepting URLs.
    pub fn new() -> Self {
        Self {
            app_installed: true,
            accepts_app: true,
            accepts_browser: true,
            attempted: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A surface without the Coinbase app; only the browser opens URLs.
    pub fn without_app() -> Self {
        Self { app_installed: false, accepts_app: false, ..Self::new() }
    }

    /// Keeps the app installed but makes it refuse authorization URLs.
    pub fn refusing_app(mut self) -> Self {
        self.accepts_app = false;
        self
    }

    /// Makes the browser refuse URLs as well.
    pub fn refusing_browser(mut self) -> Self {
        self.accepts_browser = false;
        self
    }

    /// Every URL handed to a target that accepted it, in order.
    pub fn opened(&self) -> Vec<(SwitchTarget, String)> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Every URL handed to any target, refused ones included.
    pub fn attempted(&self) -> Vec<(SwitchTarget, String)> {
        self.attempted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last_opened(&self) -> Option<(SwitchTarget, String)> {
        self.opened().pop()
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalSurface for RecordingSurface {
    fn is_app_installed(&self) -> bool {
        self.app_installed
    }

    fn open(&self, target: SwitchTarget, url: &str) -> bool {
        self.attempted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((target, url.to_string()));
        let accepted = match target {
            SwitchTarget::NativeApp => self.accepts_app,
            SwitchTarget::Browser => self.accepts_browser,
        };
        if accepted {
            self.opened
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((target, url.to_string()));
        }
        accepted
    }
}
