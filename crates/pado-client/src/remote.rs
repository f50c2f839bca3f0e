//! Remote collaborators the client drives
//!
//! Every ledger contract, the storage backend, the cipher and the wallet are
//! reached through these traits. Implementations report failures as
//! [`Error::Upstream`](pado_core::Error::Upstream) and never retry; the
//! client propagates whatever they return.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pado_core::{
    AccessPolicy, DataRecord, DataStatus, EncryptedRecord, EncryptionSchema, PaymentSymbol,
    PriceInfo, Result, SelectedShareSet, SessionKeyPair, StorageType, TaskInput,
};

/// Opaque signing capability of a wallet
pub trait Signer: Send + Sync {
    /// Address the ledger knows this wallet by
    fn address(&self) -> &str;

    /// Sign an arbitrary message
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Policy and node keys handed out by the ledger for a new registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedRegistry {
    pub policy: AccessPolicy,
    /// Public keys of `policy.names`, in the same order
    pub public_keys: Vec<String>,
}

/// Registration payload for a new data record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterData {
    pub data_tag: serde_json::Map<String, serde_json::Value>,
    pub price: PriceInfo,
    pub data: EncryptedRecord,
    pub compute_nodes: Vec<String>,
}

/// Task submission payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitTask {
    pub task_type: String,
    pub data_id: String,
    pub input_data: TaskInput,
    pub compute_limit: String,
    pub memory_limit: String,
    pub compute_nodes: Vec<String>,
}

/// Result of a fee transfer the ledger accepted for processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed,
    InsufficientBalance,
}

/// Output of the encryption primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    #[serde(with = "pado_core::record::hex_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "pado_core::record::hex_bytes")]
    pub nonce: Vec<u8>,
    pub encrypted_shares: serde_json::Value,
}

/// Data registry contract
///
/// Records returned from `get_by_id` and `list_by_status` have already been
/// validated with [`DataRecord::validate`].
#[async_trait]
pub trait DataRegistry: Send + Sync {
    async fn prepare_registry(&self, schema: EncryptionSchema) -> Result<PreparedRegistry>;

    async fn register(&self, request: RegisterData, signer: &dyn Signer) -> Result<String>;

    async fn get_by_id(&self, data_id: &str) -> Result<DataRecord>;

    async fn list_by_status(&self, status: DataStatus) -> Result<Vec<DataRecord>>;
}

/// Task registry contract
#[async_trait]
pub trait TaskRegistry: Send + Sync {
    async fn submit(&self, request: SubmitTask, signer: &dyn Signer) -> Result<String>;

    /// The completed task, or `None` while it is still pending
    async fn get_completed_by_id(&self, task_id: &str) -> Result<Option<pado_core::Task>>;
}

/// Per-node computation price source
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn fetch_computation_price(&self, symbol: PaymentSymbol) -> Result<u64>;
}

/// Token transfer between processes
#[async_trait]
pub trait FundsTransfer: Send + Sync {
    async fn transfer(
        &self,
        token_process: &str,
        recipient: &str,
        amount: u128,
        signer: &dyn Signer,
    ) -> Result<TransferOutcome>;
}

/// Blob storage for ciphertexts
#[async_trait]
pub trait Storage: Send + Sync {
    fn storage_type(&self) -> StorageType;

    async fn put(&self, data: &[u8], signer: &dyn Signer) -> Result<String>;

    async fn get(&self, transaction_id: &str) -> Result<Vec<u8>>;
}

/// Threshold encryption and reconstruction primitives
#[async_trait]
pub trait ThresholdCipher: Send + Sync {
    async fn generate_key(&self) -> Result<SessionKeyPair>;

    async fn encrypt(
        &self,
        data: &[u8],
        policy: &AccessPolicy,
        public_keys: &[String],
    ) -> Result<EncryptedPayload>;

    /// Reconstruct the plaintext from exactly `t` re-encrypted shares
    async fn decrypt(
        &self,
        shares: &SelectedShareSet,
        private_key: &str,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;
}

/// The full set of collaborators, shared by the orchestrator and pipeline
#[derive(Clone)]
pub struct RemoteServices {
    pub data: Arc<dyn DataRegistry>,
    pub tasks: Arc<dyn TaskRegistry>,
    pub prices: Arc<dyn PriceOracle>,
    pub funds: Arc<dyn FundsTransfer>,
    pub storage: Arc<dyn Storage>,
    pub cipher: Arc<dyn ThresholdCipher>,
}

impl RemoteServices {
    /// Use one gateway for every ledger contract and for storage
    pub fn from_gateway<G>(gateway: Arc<G>, cipher: Arc<dyn ThresholdCipher>) -> Self
    where
        G: DataRegistry + TaskRegistry + PriceOracle + FundsTransfer + Storage + 'static,
    {
        Self {
            data: gateway.clone(),
            tasks: gateway.clone(),
            prices: gateway.clone(),
            funds: gateway.clone(),
            storage: gateway,
            cipher,
        }
    }
}
