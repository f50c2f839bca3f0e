//! HTTP binding for the ledger contracts and storage
//!
//! One [`GatewayClient`] speaks to a gateway that fronts the data registry,
//! task registry, price oracle, token processes and blob storage. Records
//! are validated here, where they enter the client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use pado_core::{
    DataRecord, DataStatus, EncryptionSchema, Error, PaymentSymbol, Result, StorageType, Task,
};

use crate::remote::{
    DataRegistry, FundsTransfer, PreparedRegistry, PriceOracle, RegisterData, Signer, Storage,
    SubmitTask, TaskRegistry, TransferOutcome,
};
use crate::wire::{
    Blob, CompletedTaskResponse, DataIdResponse, ListQuery, PriceResponse, Signed, TaskIdResponse,
    TransactionResponse, TransferRequest, INSUFFICIENT_BALANCE,
};

/// Gateway client implementing every ledger-side collaborator
pub struct GatewayClient {
    http: Client,
    base_url: String,
    storage_type: StorageType,
}

impl GatewayClient {
    pub fn new(base_url: &str, storage_type: StorageType, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(Error::upstream)?;
        Ok(Self::with_http(http, base_url, storage_type))
    }

    /// Use an existing reqwest client
    pub fn with_http(http: Client, base_url: &str, storage_type: StorageType) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            storage_type,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the gateway is reachable
    pub async fn health(&self) -> Result<()> {
        let resp = self
            .http
            .get(self.endpoint(&["health"])?)
            .send()
            .await
            .map_err(Error::upstream)?;
        check(resp).await.map(|_| ())
    }

    /// Gateway URL for `segments`, each percent-encoded as one path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("gateway url {}: {}", self.base_url, e)))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::Config(format!("gateway url {} cannot be a base", self.base_url)))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let resp = self
            .http
            .get(self.endpoint(segments)?)
            .send()
            .await
            .map_err(Error::upstream)?;
        decode(resp).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let resp = self
            .http
            .post(self.endpoint(segments)?)
            .json(body)
            .send()
            .await
            .map_err(Error::upstream)?;
        decode(resp).await
    }
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(Error::Upstream(format!("gateway returned {}: {}", status.as_u16(), message)))
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let resp = check(resp).await?;
    resp.json().await.map_err(Error::upstream)
}

/// Records from a listing that parse and validate; the rest are skipped
fn valid_records(entries: Vec<Value>) -> Vec<DataRecord> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let data_id = entry
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("<missing>")
                .to_string();
            let record = serde_json::from_value::<DataRecord>(entry)
                .map_err(Error::from)
                .and_then(|record| record.validate().map(|_| record));
            match record {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(data_id = %data_id, reason = %e, "Skipping unreadable data record");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl DataRegistry for GatewayClient {
    async fn prepare_registry(&self, schema: EncryptionSchema) -> Result<PreparedRegistry> {
        let prepared: PreparedRegistry = self.post_json(&["data", "prepare"], &schema).await?;
        prepared.policy.validate()?;
        if prepared.policy.n != schema.n || prepared.public_keys.len() != prepared.policy.n {
            return Err(Error::InvalidPolicy(format!(
                "gateway prepared {} nodes with {} keys for a {}-of-{} schema",
                prepared.policy.n,
                prepared.public_keys.len(),
                schema.t,
                schema.n
            )));
        }
        Ok(prepared)
    }

    async fn register(&self, request: RegisterData, signer: &dyn Signer) -> Result<String> {
        let body = Signed::new(request, signer)?;
        let resp: DataIdResponse = self.post_json(&["data"], &body).await?;
        Ok(resp.data_id)
    }

    async fn get_by_id(&self, data_id: &str) -> Result<DataRecord> {
        let record: DataRecord = self.get_json(&["data", data_id]).await?;
        record.validate()?;
        Ok(record)
    }

    async fn list_by_status(&self, status: DataStatus) -> Result<Vec<DataRecord>> {
        let resp = self
            .http
            .get(self.endpoint(&["data"])?)
            .query(&ListQuery { status })
            .send()
            .await
            .map_err(Error::upstream)?;
        let entries: Vec<Value> = decode(resp).await?;
        Ok(valid_records(entries))
    }
}

#[async_trait]
impl TaskRegistry for GatewayClient {
    async fn submit(&self, request: SubmitTask, signer: &dyn Signer) -> Result<String> {
        let body = Signed::new(request, signer)?;
        let resp: TaskIdResponse = self.post_json(&["tasks"], &body).await?;
        Ok(resp.task_id)
    }

    async fn get_completed_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        let resp: CompletedTaskResponse = self
            .get_json(&["tasks", task_id, "completed"])
            .await?;
        Ok(resp.task)
    }
}

#[async_trait]
impl PriceOracle for GatewayClient {
    async fn fetch_computation_price(&self, symbol: PaymentSymbol) -> Result<u64> {
        let resp: PriceResponse = self.get_json(&["price", symbol.as_str()]).await?;
        Ok(resp.price)
    }
}

#[async_trait]
impl FundsTransfer for GatewayClient {
    async fn transfer(
        &self,
        token_process: &str,
        recipient: &str,
        amount: u128,
        signer: &dyn Signer,
    ) -> Result<TransferOutcome> {
        let body = Signed::new(
            TransferRequest {
                from: token_process.to_string(),
                to: recipient.to_string(),
                amount,
            },
            signer,
        )?;
        let resp = self
            .http
            .post(self.endpoint(&["transfer"])?)
            .json(&body)
            .send()
            .await
            .map_err(Error::upstream)?;

        if resp.status() == StatusCode::PAYMENT_REQUIRED {
            let message = resp.text().await.unwrap_or_default();
            if message.contains(INSUFFICIENT_BALANCE) {
                return Ok(TransferOutcome::InsufficientBalance);
            }
            return Err(Error::Upstream(format!("gateway returned 402: {}", message)));
        }
        check(resp).await?;
        Ok(TransferOutcome::Completed)
    }
}

#[async_trait]
impl Storage for GatewayClient {
    fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    async fn put(&self, data: &[u8], signer: &dyn Signer) -> Result<String> {
        let body = Signed::new(Blob { data: data.to_vec() }, signer)?;
        let resp: TransactionResponse = self.post_json(&["storage"], &body).await?;
        Ok(resp.transaction_id)
    }

    async fn get(&self, transaction_id: &str) -> Result<Vec<u8>> {
        let blob: Blob = self.get_json(&["storage", transaction_id]).await?;
        Ok(blob.data)
    }
}
