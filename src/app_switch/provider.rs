//! Capability interface for app switch providers.

use super::launcher::LaunchedAttempt;
use super::types::{AuthorizationRequest, HandledResult};
use crate::error::Result;

/// An app switch provider: availability check, launch and return handling.
///
/// Hosts that route deep links to several providers offer each URL to every
/// registered provider until one of them reports it resolved.
pub trait AppSwitching: Send + Sync {
    /// Whether this provider can switch right now.
    fn check_availability(&self) -> bool;

    /// Starts an authorization.
    fn launch(&self, request: &AuthorizationRequest) -> Result<LaunchedAttempt>;

    /// Cheap pre-check before [`AppSwitching::handle_return`].
    fn can_handle_return_url(&self, url: &str) -> bool;

    /// Resolves the pending authorization from a deep link.
    fn handle_return(&self, url: &str) -> HandledResult;
}
