pub mod account;
pub mod app_switch;
pub mod coinbase;
pub mod crypto;
pub mod error;
pub mod url_encoding;

pub use coinbase::Coinbase;
pub use error::{CoinbaseError, Result};
pub use app_switch::availability::is_available;
pub use app_switch::launcher::{LaunchedAttempt, LauncherOptions, SwitchLauncher};
pub use app_switch::provider::AppSwitching;
pub use app_switch::return_handler::ReturnHandler;
pub use app_switch::state::{PendingOutcome, SharedState};
pub use app_switch::surface::{AppSwitchObserver, ExternalSurface, NoopObserver, RecordingSurface};
pub use app_switch::types::{
    AuthorizationRequest, CoinbaseEnvironment, CoinbasePaymentMethod, Configuration, HandledResult, PendingAttempt, SwitchTarget,
};
pub use account::backend::{CoinbaseBackend, HttpCoinbaseBackend};
pub use account::coordinator::AccountLinkCoordinator;
pub use account::http_client::{GatewayHttpClient, HttpClientError, HttpMethod, HttpRequest, HttpResponse, InMemoryHttpClient};
pub use account::memory::InMemoryCoinbaseBackend;

#[cfg(feature = "reqwest")]
pub use account::http_client::ReqwestHttpClient;
