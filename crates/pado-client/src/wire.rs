//! JSON bodies exchanged with the gateway and the cipher sidecar
//!
//! Shared by [`GatewayClient`](crate::GatewayClient) and the devnet server so
//! both sides agree on field names.

use serde::{Deserialize, Serialize};

use pado_core::record::{amount, hex_bytes};
use pado_core::{AccessPolicy, DataStatus, SelectedShareSet, Task};

use crate::remote::Signer;

/// Body text the gateway sends with a 402 on an underfunded transfer
pub const INSUFFICIENT_BALANCE: &str = "Insufficient Balance!";

/// A request body signed by a wallet
///
/// `signature` is the hex signature over the JSON encoding of `payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signed<T> {
    #[serde(flatten)]
    pub payload: T,
    pub owner: String,
    pub signature: String,
}

impl<T: Serialize> Signed<T> {
    pub fn new(payload: T, signer: &dyn Signer) -> pado_core::Result<Self> {
        let message = serde_json::to_vec(&payload)?;
        let signature = hex::encode(signer.sign(&message)?);
        Ok(Self {
            payload,
            owner: signer.address().to_string(),
            signature,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataIdResponse {
    pub data_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: DataStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResponse {
    pub symbol: String,
    #[serde(with = "amount")]
    pub price: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Token process the amount is drawn from
    pub from: String,
    pub to: String,
    #[serde(with = "amount128")]
    pub amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdResponse {
    pub task_id: String,
}

/// `task` stays `None` until the registry marks the task complete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTaskResponse {
    pub task: Option<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blob {
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptRequest {
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    pub policy: AccessPolicy,
    pub public_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecryptRequest<'a> {
    pub shares: &'a SelectedShareSet,
    pub private_key: &'a str,
    #[serde(with = "hex_bytes")]
    pub ciphertext: &'a [u8],
}

/// u128 amounts as decimal strings
pub mod amount128 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.trim().parse().map_err(de::Error::custom)
    }
}
