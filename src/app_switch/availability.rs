use super::types::Configuration;
use crate::error::CoinbaseError;

/// Whether native app switch to Coinbase can be attempted.
///
/// True iff the app is installed, a return scheme is registered, Coinbase is
/// enabled in the gateway and the configuration does not disable it locally.
pub fn is_available(config: &Configuration, external_app_installed: bool) -> bool {
    unavailability_reason(config, external_app_installed).is_none()
}

/// The first failing availability condition, if any.
pub fn unavailability_reason(config: &Configuration, external_app_installed: bool) -> Option<CoinbaseError> {
    let reason = if !external_app_installed {
        "Coinbase app is not installed"
    } else if config.return_url_scheme.is_empty() {
        "return URL scheme is not set"
    } else if !config.coinbase_enabled_remotely {
        "Coinbase is not enabled for this merchant"
    } else if config.disabled_locally {
        "Coinbase is disabled in the client configuration"
    } else {
        return None;
    };
    Some(CoinbaseError::Unavailable(reason.to_string()))
}
