//! Coinbase account association with the gateway.

pub mod backend;
pub mod coordinator;
pub mod http_client;
pub mod memory;
