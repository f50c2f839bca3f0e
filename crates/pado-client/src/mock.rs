//! In-memory collaborators for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use pado_core::{
    AccessPolicy, DataRecord, DataStatus, EncryptedRecord, EncryptionSchema, Error,
    PaymentSymbol, PriceInfo, Result, SelectedShareSet, SessionKeyPair, StorageType, Task,
    TaskInput, SCHEMA_VERSION,
};

use crate::remote::{
    DataRegistry, EncryptedPayload, FundsTransfer, PreparedRegistry, PriceOracle, RegisterData,
    Signer, Storage, SubmitTask, TaskRegistry, ThresholdCipher, TransferOutcome,
};

pub struct TestSigner;

impl Signer for TestSigner {
    fn address(&self) -> &str {
        "test-wallet"
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(message.to_vec())
    }
}

/// A completed task carrying `shares` as `(node, share)` results
pub fn completed_task(task_id: &str, data_id: &str, shares: &[(&str, &str)]) -> Task {
    Task {
        id: task_id.to_string(),
        task_type: pado_core::constants::DATA_SHARING_TASK.to_string(),
        input_data: TaskInput {
            data_id: data_id.to_string(),
            consumer_pk: "pk-1".into(),
        },
        result: shares
            .iter()
            .map(|(node, share)| (node.to_string(), json!({ "reenc_sk": share })))
            .collect(),
        verification_error: None,
        version: SCHEMA_VERSION,
    }
}

/// A valid 2-of-3 record over nodes `n0`, `n1`, `n2`
pub fn sample_record(data_id: &str, symbol: &str, price: u64) -> DataRecord {
    DataRecord {
        id: data_id.to_string(),
        data_tag: serde_json::Map::new(),
        price: PriceInfo {
            symbol: symbol.to_string(),
            price,
        },
        data: EncryptedRecord {
            policy: AccessPolicy::new(
                2,
                vec!["n0".into(), "n1".into(), "n2".into()],
                vec![1, 2, 3],
            )
            .expect("valid policy"),
            nonce: vec![0x0e, 0xce],
            storage_ref: format!("tx-{}", data_id),
            encrypted_shares: json!(["e0", "e1", "e2"]),
        },
        status: DataStatus::Valid,
        owner: "owner".into(),
        version: SCHEMA_VERSION,
    }
}

/// Ledger, task registry, oracle, token and storage in one place
pub struct MockLedger {
    records: Mutex<HashMap<String, DataRecord>>,
    completed: Mutex<HashMap<String, Task>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub submissions: Mutex<Vec<SubmitTask>>,
    pub transfers: Mutex<Vec<(String, String, u128)>>,
    pub registrations: Mutex<Vec<RegisterData>>,
    /// Order in which side-effecting calls happened
    pub events: Mutex<Vec<&'static str>>,
    node_price: u64,
    balance: Mutex<u128>,
    polls: AtomicUsize,
    price_lookups: AtomicUsize,
    poll_delay: Duration,
    fail_polls: bool,
    fail_submit: bool,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            completed: Mutex::new(HashMap::new()),
            blobs: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            transfers: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            node_price: 5,
            balance: Mutex::new(1_000_000),
            polls: AtomicUsize::new(0),
            price_lookups: AtomicUsize::new(0),
            poll_delay: Duration::ZERO,
            fail_polls: false,
            fail_submit: false,
        }
    }

    pub fn with_node_price(mut self, price: u64) -> Self {
        self.node_price = price;
        self
    }

    pub fn with_balance(self, balance: u128) -> Self {
        *self.balance.lock().unwrap() = balance;
        self
    }

    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn failing_polls(mut self) -> Self {
        self.fail_polls = true;
        self
    }

    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn insert_record(&self, record: DataRecord) {
        self.records.lock().unwrap().insert(record.id.clone(), record);
    }

    pub fn insert_blob(&self, transaction_id: &str, data: &[u8]) {
        self.blobs
            .lock()
            .unwrap()
            .insert(transaction_id.to_string(), data.to_vec());
    }

    pub fn complete(&self, task: Task) {
        self.completed.lock().unwrap().insert(task.id.clone(), task);
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn price_lookup_count(&self) -> usize {
        self.price_lookups.load(Ordering::SeqCst)
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.lock().unwrap().len()
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataRegistry for MockLedger {
    async fn prepare_registry(&self, schema: EncryptionSchema) -> Result<PreparedRegistry> {
        let names: Vec<String> = (0..schema.n).map(|i| format!("n{}", i)).collect();
        let public_keys = names.iter().map(|n| format!("pk-{}", n)).collect();
        let indices = (1..=schema.n as u64).collect();
        Ok(PreparedRegistry {
            policy: AccessPolicy::new(schema.t, names, indices)?,
            public_keys,
        })
    }

    async fn register(&self, request: RegisterData, signer: &dyn Signer) -> Result<String> {
        let id = format!("data-{}", self.registrations.lock().unwrap().len() + 1);
        self.insert_record(DataRecord {
            id: id.clone(),
            data_tag: request.data_tag.clone(),
            price: request.price.clone(),
            data: request.data.clone(),
            status: DataStatus::Valid,
            owner: signer.address().to_string(),
            version: SCHEMA_VERSION,
        });
        self.registrations.lock().unwrap().push(request);
        self.events.lock().unwrap().push("register");
        Ok(id)
    }

    async fn get_by_id(&self, data_id: &str) -> Result<DataRecord> {
        self.records
            .lock()
            .unwrap()
            .get(data_id)
            .cloned()
            .ok_or_else(|| Error::Upstream(format!("data {} not found", data_id)))
    }

    async fn list_by_status(&self, status: DataStatus) -> Result<Vec<DataRecord>> {
        let mut records: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}

#[async_trait]
impl TaskRegistry for MockLedger {
    async fn submit(&self, request: SubmitTask, _signer: &dyn Signer) -> Result<String> {
        self.events.lock().unwrap().push("submit");
        if self.fail_submit {
            return Err(Error::Upstream("task process unavailable".into()));
        }
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(request);
        Ok(format!("task-{}", submissions.len()))
    }

    async fn get_completed_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push("poll");
        if !self.poll_delay.is_zero() {
            tokio::time::sleep(self.poll_delay).await;
        }
        if self.fail_polls {
            return Err(Error::Upstream("task process unavailable".into()));
        }
        Ok(self.completed.lock().unwrap().get(task_id).cloned())
    }
}

#[async_trait]
impl PriceOracle for MockLedger {
    async fn fetch_computation_price(&self, _symbol: PaymentSymbol) -> Result<u64> {
        self.price_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.node_price)
    }
}

#[async_trait]
impl FundsTransfer for MockLedger {
    async fn transfer(
        &self,
        token_process: &str,
        recipient: &str,
        amount: u128,
        _signer: &dyn Signer,
    ) -> Result<TransferOutcome> {
        self.events.lock().unwrap().push("transfer");
        self.transfers
            .lock()
            .unwrap()
            .push((token_process.to_string(), recipient.to_string(), amount));

        let mut balance = self.balance.lock().unwrap();
        if *balance < amount {
            return Ok(TransferOutcome::InsufficientBalance);
        }
        *balance -= amount;
        Ok(TransferOutcome::Completed)
    }
}

#[async_trait]
impl Storage for MockLedger {
    fn storage_type(&self) -> StorageType {
        StorageType::Devnet
    }

    async fn put(&self, data: &[u8], _signer: &dyn Signer) -> Result<String> {
        let id = format!("tx-upload-{}", self.blobs.lock().unwrap().len() + 1);
        self.insert_blob(&id, data);
        self.events.lock().unwrap().push("put");
        Ok(id)
    }

    async fn get(&self, transaction_id: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| Error::Upstream(format!("blob {} not found", transaction_id)))
    }
}

/// Records decrypt calls and returns a fixed plaintext
pub struct MockCipher {
    pub plaintext: Vec<u8>,
    pub decrypt_calls: Mutex<Vec<(SelectedShareSet, String, Vec<u8>)>>,
    keys: AtomicUsize,
    fail_keygen: bool,
}

impl MockCipher {
    pub fn new(plaintext: &[u8]) -> Self {
        Self {
            plaintext: plaintext.to_vec(),
            decrypt_calls: Mutex::new(Vec::new()),
            keys: AtomicUsize::new(0),
            fail_keygen: false,
        }
    }

    pub fn failing_keygen(mut self) -> Self {
        self.fail_keygen = true;
        self
    }
}

#[async_trait]
impl ThresholdCipher for MockCipher {
    async fn generate_key(&self) -> Result<SessionKeyPair> {
        if self.fail_keygen {
            return Err(Error::Upstream("cipher sidecar unavailable".into()));
        }
        let n = self.keys.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionKeyPair {
            public_key: format!("pk-{}", n),
            private_key: format!("sk-{}", n),
        })
    }

    async fn encrypt(
        &self,
        data: &[u8],
        policy: &AccessPolicy,
        public_keys: &[String],
    ) -> Result<EncryptedPayload> {
        Ok(EncryptedPayload {
            ciphertext: data.iter().rev().copied().collect(),
            nonce: vec![0x01, 0x02],
            encrypted_shares: json!(policy
                .names
                .iter()
                .zip(public_keys)
                .map(|(n, pk)| format!("{}:{}", n, pk))
                .collect::<Vec<_>>()),
        })
    }

    async fn decrypt(
        &self,
        shares: &SelectedShareSet,
        private_key: &str,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        self.decrypt_calls.lock().unwrap().push((
            shares.clone(),
            private_key.to_string(),
            ciphertext.to_vec(),
        ));
        Ok(self.plaintext.clone())
    }
}
