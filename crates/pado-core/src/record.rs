//! Registered data records as stored on the ledger

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{AccessPolicy, Error, PaymentSymbol, Result, SCHEMA_VERSION};

/// Price attached to a data record at registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceInfo {
    /// Wire symbol; checked against the supported set only when paying
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Price in the token's smallest unit
    #[serde(with = "amount")]
    pub price: u64,
}

fn default_symbol() -> String {
    PaymentSymbol::default().to_string()
}

impl PriceInfo {
    pub fn new(symbol: PaymentSymbol, price: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
        }
    }

    /// Resolve the symbol, failing for tokens tasks cannot be paid in
    pub fn payment_symbol(&self) -> Result<PaymentSymbol> {
        self.symbol.parse()
    }
}

/// Where a ciphertext blob was uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageType {
    Arweave,
    Arseeding,
    Devnet,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Arweave => write!(f, "ARWEAVE"),
            StorageType::Arseeding => write!(f, "ARSEEDING"),
            StorageType::Devnet => write!(f, "DEVNET"),
        }
    }
}

/// Encrypted payload metadata registered for a data item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub policy: AccessPolicy,
    #[serde(with = "hex_bytes")]
    pub nonce: Vec<u8>,
    /// Storage transaction id of the ciphertext blob
    pub storage_ref: String,
    /// Per-node encrypted key material, opaque to the client
    pub encrypted_shares: serde_json::Value,
}

/// Ledger lifecycle of a data record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataStatus {
    #[default]
    Valid,
    Invalid,
}

impl fmt::Display for DataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataStatus::Valid => write!(f, "Valid"),
            DataStatus::Invalid => write!(f, "Invalid"),
        }
    }
}

impl FromStr for DataStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Valid" => Ok(DataStatus::Valid),
            "Invalid" => Ok(DataStatus::Invalid),
            other => Err(Error::Config(format!("unknown data status: {}", other))),
        }
    }
}

/// A data item as returned by the ledger registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    pub id: String,
    /// Free-form owner metadata; registration adds `storageType`
    #[serde(default)]
    pub data_tag: serde_json::Map<String, serde_json::Value>,
    pub price: PriceInfo,
    pub data: EncryptedRecord,
    #[serde(default)]
    pub status: DataStatus,
    #[serde(default)]
    pub owner: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

impl DataRecord {
    /// Validate a record received from the ledger
    ///
    /// Called once where records enter the client; everything downstream
    /// relies on the policy invariants holding.
    pub fn validate(&self) -> Result<()> {
        if self.version != SCHEMA_VERSION {
            return Err(Error::SchemaVersion {
                expected: SCHEMA_VERSION,
                actual: self.version,
            });
        }
        if self.id.is_empty() {
            return Err(Error::InvalidRecord {
                id: self.id.clone(),
                reason: "empty data id".into(),
            });
        }
        if self.data.storage_ref.is_empty() {
            return Err(Error::InvalidRecord {
                id: self.id.clone(),
                reason: "missing storage reference".into(),
            });
        }
        self.data.policy.validate().map_err(|e| Error::InvalidRecord {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.data.policy
    }

    /// Storage backend recorded in the data tag, if any
    pub fn storage_type(&self) -> Option<StorageType> {
        self.data_tag
            .get("storageType")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }
}

/// Token amounts travel as decimal strings but older records use numbers
pub mod amount {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
        }
    }
}

/// Hex encoding for opaque byte fields
pub mod hex_bytes {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
