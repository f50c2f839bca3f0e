//! Devnet ledger state: records, tasks, balances and blobs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

use pado_client::{PreparedRegistry, RegisterData, SubmitTask};
use pado_core::{
    total_price, AccessPolicy, DataRecord, DataStatus, EncryptionSchema, PaymentSymbol, Task,
    SCHEMA_VERSION,
};

use crate::config::DevnetConfig;
use crate::error::{DevnetError, Result};
use crate::metrics;

/// A worker node with its public key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerNode {
    pub name: String,
    /// Share index the node holds in every policy it joins
    pub index: u64,
    pub public_key: String,
}

/// Node results posted for a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskReport {
    #[serde(default)]
    pub result: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub verification_error: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
struct TaskEntry {
    task: Task,
    owner: String,
    fee: u128,
    compute_nodes: Vec<String>,
    completed: bool,
}

/// Counts reported on `/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevnetStats {
    pub nodes: usize,
    pub records: usize,
    pub tasks: usize,
    pub pending_tasks: usize,
    pub blobs: usize,
}

pub struct DevnetState {
    config: DevnetConfig,
    nodes: Vec<WorkerNode>,
    records: BTreeMap<String, DataRecord>,
    tasks: HashMap<String, TaskEntry>,
    /// (token process, address) -> balance
    balances: HashMap<(String, String), u128>,
    /// Fees paid into the tasks process and not yet spent, per (symbol, payer)
    task_credit: HashMap<(PaymentSymbol, String), u128>,
    blobs: HashMap<String, Vec<u8>>,
    nonce: u64,
}

fn keccak(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

impl DevnetState {
    pub fn new(config: DevnetConfig) -> Self {
        let mut rng = rand::thread_rng();
        let nodes = (0..config.node_count)
            .map(|i| {
                let mut key = [0u8; 32];
                rng.fill_bytes(&mut key);
                WorkerNode {
                    name: format!("node-{}", i + 1),
                    index: i as u64 + 1,
                    public_key: hex::encode(key),
                }
            })
            .collect();

        Self {
            config,
            nodes,
            records: BTreeMap::new(),
            tasks: HashMap::new(),
            balances: HashMap::new(),
            task_credit: HashMap::new(),
            blobs: HashMap::new(),
            nonce: 0,
        }
    }

    pub fn config(&self) -> &DevnetConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[WorkerNode] {
        &self.nodes
    }

    fn next_id(&mut self, kind: &str, payload: &[u8]) -> String {
        self.nonce += 1;
        let mut preimage = Vec::with_capacity(kind.len() + 8 + payload.len());
        preimage.extend_from_slice(kind.as_bytes());
        preimage.extend_from_slice(&self.nonce.to_be_bytes());
        preimage.extend_from_slice(payload);
        hex::encode(&keccak(&preimage)[..16])
    }

    /// Pick `schema.n` nodes for a new registration
    pub fn prepare(&self, schema: EncryptionSchema) -> Result<PreparedRegistry> {
        schema.validate()?;
        if schema.n > self.nodes.len() {
            return Err(DevnetError::InvalidRequest(format!(
                "{} nodes requested, devnet has {}",
                schema.n,
                self.nodes.len()
            )));
        }

        let mut chosen: Vec<&WorkerNode> = self
            .nodes
            .choose_multiple(&mut rand::thread_rng(), schema.n)
            .collect();
        chosen.sort_by_key(|node| node.index);

        let policy = AccessPolicy::new(
            schema.t,
            chosen.iter().map(|n| n.name.clone()).collect(),
            chosen.iter().map(|n| n.index).collect(),
        )?;
        Ok(PreparedRegistry {
            policy,
            public_keys: chosen.iter().map(|n| n.public_key.clone()).collect(),
        })
    }

    pub fn register(&mut self, request: RegisterData, owner: &str) -> Result<String> {
        let policy = &request.data.policy;
        policy.validate()?;
        if request.compute_nodes != policy.names {
            return Err(DevnetError::InvalidRequest(
                "compute_nodes must match the policy node names".into(),
            ));
        }
        if let Some(unknown) = policy
            .names
            .iter()
            .find(|name| !self.nodes.iter().any(|n| &n.name == *name))
        {
            return Err(DevnetError::InvalidRequest(format!("unknown node {}", unknown)));
        }
        if !self.blobs.contains_key(&request.data.storage_ref) {
            return Err(DevnetError::InvalidRequest(format!(
                "storage_ref {} was never uploaded",
                request.data.storage_ref
            )));
        }

        let payload = serde_json::to_vec(&request)?;
        let id = self.next_id("data", &payload);
        self.records.insert(
            id.clone(),
            DataRecord {
                id: id.clone(),
                data_tag: request.data_tag,
                price: request.price,
                data: request.data,
                status: DataStatus::Valid,
                owner: owner.to_string(),
                version: SCHEMA_VERSION,
            },
        );
        metrics::record_registration();
        tracing::info!(data_id = %id, owner, "Data registered");
        Ok(id)
    }

    pub fn get_record(&self, data_id: &str) -> Result<DataRecord> {
        self.records
            .get(data_id)
            .cloned()
            .ok_or_else(|| DevnetError::NotFound(format!("data {}", data_id)))
    }

    pub fn list_records(&self, status: DataStatus) -> Vec<DataRecord> {
        self.records
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    /// Mark a record invalid; it stays retrievable by id
    pub fn invalidate(&mut self, data_id: &str) -> Result<()> {
        let record = self
            .records
            .get_mut(data_id)
            .ok_or_else(|| DevnetError::NotFound(format!("data {}", data_id)))?;
        record.status = DataStatus::Invalid;
        Ok(())
    }

    pub fn price(&self, symbol: &str) -> Result<(PaymentSymbol, u64)> {
        let symbol: PaymentSymbol = symbol.parse()?;
        Ok((symbol, self.config.node_price(symbol)))
    }

    pub fn balance(&self, token: &str, address: &str) -> u128 {
        self.balances
            .get(&(token.to_string(), address.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn mint(&mut self, token: &str, address: &str, amount: u128) -> Result<u128> {
        if self.config.token_symbol(token).is_none() {
            return Err(DevnetError::InvalidRequest(format!("unknown token process {}", token)));
        }
        let balance = self
            .balances
            .entry((token.to_string(), address.to_string()))
            .or_insert(0);
        *balance = balance.saturating_add(amount);
        Ok(*balance)
    }

    pub fn transfer(&mut self, token: &str, from: &str, to: &str, amount: u128) -> Result<()> {
        let symbol = self
            .config
            .token_symbol(token)
            .ok_or_else(|| DevnetError::InvalidRequest(format!("unknown token process {}", token)))?;

        let balance = self.balance(token, from);
        if balance < amount {
            metrics::record_transfer(false);
            return Err(DevnetError::InsufficientBalance {
                token: token.to_string(),
                address: from.to_string(),
                balance,
                amount,
            });
        }

        self.balances
            .insert((token.to_string(), from.to_string()), balance - amount);
        let credited = self
            .balances
            .entry((token.to_string(), to.to_string()))
            .or_insert(0);
        *credited = credited.saturating_add(amount);

        if to == self.config.tasks_process_id {
            let credit = self
                .task_credit
                .entry((symbol, from.to_string()))
                .or_insert(0);
            *credit = credit.saturating_add(amount);
        }
        metrics::record_transfer(true);
        tracing::info!(token, from, to, amount = %amount, "Transfer");
        Ok(())
    }

    /// Create a pending task, charging the fee against the payer's credit
    pub fn submit_task(&mut self, request: SubmitTask, owner: &str) -> Result<String> {
        let record = self.get_record(&request.data_id)?;
        if request.input_data.data_id != request.data_id {
            return Err(DevnetError::InvalidRequest(
                "input_data.data_id does not match data_id".into(),
            ));
        }
        if let Some(node) = request
            .compute_nodes
            .iter()
            .find(|node| !record.policy().names.contains(*node))
        {
            return Err(DevnetError::InvalidRequest(format!(
                "node {} is not in the data policy",
                node
            )));
        }

        let symbol = record.price.payment_symbol()?;
        let fee = total_price(
            record.price.price,
            self.config.node_price(symbol),
            record.policy().n,
        );
        let key = (symbol, owner.to_string());
        let paid = self.task_credit.get(&key).copied().unwrap_or(0);
        if paid < fee {
            return Err(DevnetError::FeeNotPaid {
                owner: owner.to_string(),
                paid,
                fee,
            });
        }
        self.task_credit.insert(key, paid - fee);

        let payload = serde_json::to_vec(&request)?;
        let task_id = self.next_id("task", &payload);
        self.tasks.insert(
            task_id.clone(),
            TaskEntry {
                task: Task {
                    id: String::new(),
                    task_type: request.task_type,
                    input_data: request.input_data,
                    result: BTreeMap::new(),
                    verification_error: None,
                    version: SCHEMA_VERSION,
                },
                owner: owner.to_string(),
                fee,
                compute_nodes: request.compute_nodes,
                completed: false,
            },
        );
        metrics::record_task("submitted");
        tracing::info!(task_id = %task_id, data_id = %record.id, owner, fee = %fee, "Task submitted");
        Ok(task_id)
    }

    /// The completed task, `None` while pending
    pub fn completed_task(&self, task_id: &str) -> Result<Option<Task>> {
        let entry = self
            .tasks
            .get(task_id)
            .ok_or_else(|| DevnetError::NotFound(format!("task {}", task_id)))?;
        Ok(entry.completed.then(|| entry.task.clone()))
    }

    /// Record node results for a pending task and mark it complete
    pub fn complete_task(&mut self, task_id: &str, report: TaskReport) -> Result<()> {
        let entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| DevnetError::NotFound(format!("task {}", task_id)))?;
        if entry.completed {
            return Err(DevnetError::AlreadyComplete(task_id.to_string()));
        }
        if let Some(node) = report
            .result
            .keys()
            .find(|node| !entry.compute_nodes.contains(*node))
        {
            return Err(DevnetError::InvalidRequest(format!(
                "node {} was not assigned task {}",
                node, task_id
            )));
        }

        entry.task.id = task_id.to_string();
        entry.task.result = report.result;
        entry.task.verification_error = report.verification_error;
        entry.completed = true;
        metrics::record_task("completed");
        tracing::info!(
            task_id,
            owner = %entry.owner,
            fee = %entry.fee,
            reports = entry.task.result.len(),
            "Task completed"
        );
        Ok(())
    }

    pub fn put_blob(&mut self, data: Vec<u8>) -> String {
        let id = self.next_id("blob", &data);
        self.blobs.insert(id.clone(), data);
        id
    }

    pub fn get_blob(&self, transaction_id: &str) -> Result<Vec<u8>> {
        self.blobs
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| DevnetError::NotFound(format!("blob {}", transaction_id)))
    }

    pub fn stats(&self) -> DevnetStats {
        DevnetStats {
            nodes: self.nodes.len(),
            records: self.records.len(),
            tasks: self.tasks.len(),
            pending_tasks: self.tasks.values().filter(|t| !t.completed).count(),
            blobs: self.blobs.len(),
        }
    }
}

/// Shared devnet state type
pub type SharedState = Arc<tokio::sync::RwLock<DevnetState>>;

pub fn create_shared_state(config: DevnetConfig) -> SharedState {
    Arc::new(tokio::sync::RwLock::new(DevnetState::new(config)))
}
