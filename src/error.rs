use std::fmt;

/// Every failure a Coinbase app switch or account operation can surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoinbaseError {
    /// A launch was requested while a fresh attempt is still waiting for its return.
    AttemptAlreadyInProgress,
    /// The pending attempt expired before the external app returned.
    Timeout,
    /// The user backed out of the Coinbase authorization screen.
    UserCancelled,
    /// Coinbase refused the authorization, with its description when one was sent.
    AuthorizationDenied(Option<String>),
    /// Transport failure or unexpected gateway response.
    NetworkError(String),
    /// The gateway rejected the request payload.
    ValidationError(String),
    /// Another link or unlink call has not finished yet.
    OperationInProgress,
    /// App switch is not possible for the current configuration.
    Unavailable(String),
    /// Neither the Coinbase app nor the browser accepted the authorization URL.
    SwitchFailed,
}

impl fmt::Display for CoinbaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttemptAlreadyInProgress => write!(f, "An app switch attempt is already in progress"),
            Self::Timeout => write!(f, "App switch attempt timed out"),
            Self::UserCancelled => write!(f, "User cancelled Coinbase authorization"),
            Self::AuthorizationDenied(Some(reason)) => write!(f, "Coinbase authorization denied: {}", reason),
            Self::AuthorizationDenied(None) => write!(f, "Coinbase authorization denied"),
            Self::NetworkError(err) => write!(f, "Network error: {}", err),
            Self::ValidationError(err) => write!(f, "Validation error: {}", err),
            Self::OperationInProgress => write!(f, "An account operation is already in progress"),
            Self::Unavailable(reason) => write!(f, "Coinbase app switch unavailable: {}", reason),
            Self::SwitchFailed => write!(f, "Failed to open Coinbase for authorization"),
        }
    }
}

impl std::error::Error for CoinbaseError {}

impl From<serde_json::Error> for CoinbaseError {
    fn from(err: serde_json::Error) -> Self {
        Self::NetworkError(format!("malformed gateway response: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CoinbaseError>;
