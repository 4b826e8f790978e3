//! Coinbase app switch: availability, launch, and deep-link return handling.

pub mod availability;
pub mod launcher;
pub mod provider;
pub mod return_handler;
pub mod return_url;
pub mod state;
pub mod surface;
pub mod types;
