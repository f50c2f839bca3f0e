//! pado-client: threshold data-sharing client
//!
//! Registers encrypted data on the ledger and commissions paid retrieval
//! tasks that reconstruct it from `t` of `n` compute-node shares.
//!
//! ```ignore
//! let client = ClientBuilder::new(ClientConfig::devnet("http://127.0.0.1:3000")).build()?;
//! let ticket = client.submit_task(&data_id, &wallet, DATA_SHARING_TASK).await?;
//! let plaintext = client.get_result(&ticket, None).await?;
//! ```

pub mod cipher;
pub mod client;
pub mod gateway;
pub mod metrics;
pub mod orchestrator;
pub mod registration;
pub mod remote;
pub mod signer;
pub mod watcher;
pub mod wire;

#[cfg(test)]
mod mock;

pub use cipher::SidecarCipher;
pub use client::{ClientBuilder, PadoClient};
pub use gateway::GatewayClient;
pub use orchestrator::{RetrievalTicket, TaskOrchestrator};
pub use registration::RegistrationPipeline;
pub use remote::{
    DataRegistry, EncryptedPayload, FundsTransfer, PreparedRegistry, PriceOracle, RegisterData,
    RemoteServices, Signer, Storage, SubmitTask, TaskRegistry, ThresholdCipher, TransferOutcome,
};
pub use signer::DevSigner;
pub use watcher::{CancelToken, CompletionWatcher};
