//! Data registration and lookup

use serde_json::{Map, Value};
use tracing::info;

use pado_core::{DataRecord, DataStatus, EncryptedRecord, EncryptionSchema, PriceInfo, Result};

use crate::metrics;
use crate::remote::{RegisterData, RemoteServices, Signer};

/// Tag key recording where the ciphertext lives
pub const STORAGE_TYPE_TAG: &str = "storageType";

/// Encrypts, uploads and registers data
pub struct RegistrationPipeline {
    remote: RemoteServices,
}

impl RegistrationPipeline {
    pub fn new(remote: RemoteServices) -> Self {
        Self { remote }
    }

    /// Encrypt `data` for a fresh node set and register it
    ///
    /// Returns the id the ledger assigned to the record.
    pub async fn submit_data(
        &self,
        data: &[u8],
        mut data_tag: Map<String, Value>,
        price: PriceInfo,
        signer: &dyn Signer,
        schema: EncryptionSchema,
    ) -> Result<String> {
        schema.validate()?;

        let prepared = self.remote.data.prepare_registry(schema).await?;
        let policy = prepared.policy;

        let encrypted = self
            .remote
            .cipher
            .encrypt(data, &policy, &prepared.public_keys)
            .await?;

        let storage_type = self.remote.storage.storage_type();
        let storage_ref = self.remote.storage.put(&encrypted.ciphertext, signer).await?;
        info!(
            storage = %storage_type,
            storage_ref = %storage_ref,
            bytes = encrypted.ciphertext.len(),
            "Uploaded ciphertext"
        );

        data_tag.insert(
            STORAGE_TYPE_TAG.to_string(),
            Value::String(storage_type.to_string()),
        );

        let compute_nodes = policy.names.clone();
        let request = RegisterData {
            data_tag,
            price,
            data: EncryptedRecord {
                policy,
                nonce: encrypted.nonce,
                storage_ref,
                encrypted_shares: encrypted.encrypted_shares,
            },
            compute_nodes,
        };

        let data_id = self.remote.data.register(request, signer).await?;
        metrics::record_data_registered(&storage_type.to_string());
        info!(data_id = %data_id, owner = signer.address(), "Data registered");
        Ok(data_id)
    }

    pub async fn list_data(&self, status: DataStatus) -> Result<Vec<DataRecord>> {
        self.remote.data.list_by_status(status).await
    }

    pub async fn get_data(&self, data_id: &str) -> Result<DataRecord> {
        self.remote.data.get_by_id(data_id).await
    }
}
