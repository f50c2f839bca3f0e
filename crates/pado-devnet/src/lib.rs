//! pado-devnet: in-memory gateway for local development
//!
//! Implements the gateway HTTP surface the client's `GatewayClient` speaks,
//! backed by a single in-process ledger: a fixed worker node set, token
//! balances with a faucet, per-node task prices, a blob store, and a route
//! through which a harness posts node results for pending tasks.

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use config::DevnetConfig;
pub use error::DevnetError;
pub use routes::{create_router, AppState, BalanceResponse, FaucetRequest, HealthResponse};
pub use server::{DevnetServer, ServerBuilder};
pub use state::{create_shared_state, DevnetState, DevnetStats, SharedState, TaskReport, WorkerNode};
