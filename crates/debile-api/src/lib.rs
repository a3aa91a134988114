//! RPC server for the Debile build master.
//!
//! Provides the JSON-RPC endpoint, the event WebSocket and health checks.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod routes;
pub mod rpc;
pub mod state;
pub mod ws;

pub use state::AppState;

#[cfg(test)]
pub(crate) mod testing;
