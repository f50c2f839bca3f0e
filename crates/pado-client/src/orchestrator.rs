//! Retrieval task orchestration
//!
//! Commissioning a retrieval pays the task fee, then submits the task with a
//! fresh session key. The fee transfer always happens before submission and
//! is never rolled back: if submission fails after a successful transfer the
//! error is returned and the transfer is logged for reconciliation.
//!
//! The session key is returned inside a [`RetrievalTicket`] and handed back
//! to [`TaskOrchestrator::await_and_decrypt`]; the orchestrator itself keeps
//! no per-retrieval state, so concurrent retrievals never share keys.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use pado_core::{
    total_price, ClientConfig, DataRecord, Error, PaymentSymbol, Result, SelectedShareSet,
    SessionKeyPair, TaskInput,
};

use crate::metrics;
use crate::remote::{RemoteServices, Signer, SubmitTask, TransferOutcome};
use crate::watcher::{CancelToken, CompletionWatcher};

/// Everything needed to finish a retrieval that was submitted earlier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalTicket {
    pub task_id: String,
    pub data_id: String,
    /// Fee transferred for the task, in the smallest unit of `symbol`
    pub fee: u128,
    pub symbol: PaymentSymbol,
    pub session_key: SessionKeyPair,
}

/// Pays for, submits and completes retrieval tasks
pub struct TaskOrchestrator {
    remote: RemoteServices,
    config: ClientConfig,
    watcher: CompletionWatcher,
}

impl TaskOrchestrator {
    pub fn new(remote: RemoteServices, config: ClientConfig) -> Self {
        let watcher = CompletionWatcher::new(remote.tasks.clone(), config.poll_interval());
        Self {
            remote,
            config,
            watcher,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Pay for and submit a retrieval task for `data_id`
    pub async fn submit_retrieval_task(
        &self,
        data_id: &str,
        signer: &dyn Signer,
        task_type: &str,
    ) -> Result<RetrievalTicket> {
        let record = self.remote.data.get_by_id(data_id).await?;
        let symbol = record.price.payment_symbol()?;
        let policy = record.policy();

        // Session key before the transfer: a keygen failure must not cost the fee
        let session_key = self.remote.cipher.generate_key().await?;

        let node_price = self.remote.prices.fetch_computation_price(symbol).await?;
        let fee = total_price(record.price.price, node_price, policy.n);

        info!(
            data_id,
            symbol = %symbol,
            data_price = record.price.price,
            node_price,
            nodes = policy.n,
            fee = %fee,
            "Paying task fee"
        );

        let outcome = self
            .remote
            .funds
            .transfer(
                self.config.token_process(symbol),
                &self.config.tasks_process_id,
                fee,
                signer,
            )
            .await?;

        if outcome == TransferOutcome::InsufficientBalance {
            return Err(Error::InsufficientBalance {
                required: fee,
                symbol: symbol.to_string(),
            });
        }

        let request = SubmitTask {
            task_type: task_type.to_string(),
            data_id: data_id.to_string(),
            input_data: TaskInput {
                data_id: data_id.to_string(),
                consumer_pk: session_key.public_key.clone(),
            },
            compute_limit: self.config.compute_limit.clone(),
            memory_limit: self.config.memory_limit.clone(),
            compute_nodes: policy.names.clone(),
        };

        let task_id = match self.remote.tasks.submit(request, signer).await {
            Ok(task_id) => task_id,
            Err(e) => {
                warn!(
                    data_id,
                    fee = %fee,
                    symbol = %symbol,
                    payer = signer.address(),
                    error = %e,
                    "Task submission failed after fee transfer"
                );
                metrics::record_unmatched_transfer(symbol);
                return Err(e);
            }
        };

        metrics::record_task_submitted(symbol, fee);
        info!(task_id = %task_id, data_id, "Retrieval task submitted");

        Ok(RetrievalTicket {
            task_id,
            data_id: data_id.to_string(),
            fee,
            symbol,
            session_key,
        })
    }

    /// Wait for the ticket's task and reconstruct the plaintext
    pub async fn await_and_decrypt(&self, ticket: &RetrievalTicket, timeout: Duration) -> Result<Vec<u8>> {
        self.await_and_decrypt_with_cancel(ticket, timeout, &CancelToken::new())
            .await
    }

    /// Like [`await_and_decrypt`](Self::await_and_decrypt), abandoning the
    /// wait when `cancel` fires
    pub async fn await_and_decrypt_with_cancel(
        &self,
        ticket: &RetrievalTicket,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>> {
        let start = Instant::now();
        let result = self.retrieve(ticket, timeout, cancel).await;
        metrics::record_retrieval(&result, start.elapsed());
        result
    }

    async fn retrieve(
        &self,
        ticket: &RetrievalTicket,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>> {
        let task = self.watcher.wait(&ticket.task_id, timeout, cancel).await?;

        if let Some(reason) = task.verification_error() {
            warn!(task_id = %ticket.task_id, reason = %reason, "Task rejected by compute nodes");
            return Err(Error::RemoteVerificationFailure(reason));
        }

        if task.input_data.consumer_pk != ticket.session_key.public_key {
            warn!(
                task_id = %ticket.task_id,
                "Task was re-encrypted to a different session key than the ticket holds"
            );
            return Err(Error::InvalidRecord {
                id: ticket.task_id.clone(),
                reason: "task consumer key does not match the ticket session key".to_string(),
            });
        }

        let record: DataRecord = self.remote.data.get_by_id(&task.input_data.data_id).await?;
        let shares = SelectedShareSet::from_task(&record.data, &task)?;

        info!(
            task_id = %ticket.task_id,
            data_id = %record.id,
            threshold = record.policy().t,
            indices = ?shares.indices(),
            "Selected shares for reconstruction"
        );

        let ciphertext = self.remote.storage.get(&shares.storage_ref).await?;
        self.remote
            .cipher
            .decrypt(&shares, &ticket.session_key.private_key, &ciphertext)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{completed_task, sample_record, MockCipher, MockLedger, TestSigner};
    use pado_core::constants::DATA_SHARING_TASK;
    use serde_json::json;
    use std::sync::Arc;

    struct Harness {
        ledger: Arc<MockLedger>,
        cipher: Arc<MockCipher>,
        orchestrator: TaskOrchestrator,
    }

    fn harness(ledger: MockLedger) -> Harness {
        harness_with_cipher(ledger, MockCipher::new(b"hello threshold"))
    }

    fn harness_with_cipher(ledger: MockLedger, cipher: MockCipher) -> Harness {
        let ledger = Arc::new(ledger);
        let cipher = Arc::new(cipher);
        let remote = RemoteServices::from_gateway(ledger.clone(), cipher.clone());
        let orchestrator = TaskOrchestrator::new(remote, ClientConfig::default());
        Harness {
            ledger,
            cipher,
            orchestrator,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_retrieval() {
        let h = harness(MockLedger::new().with_node_price(5));
        h.ledger.insert_record(sample_record("data-1", "wAR", 100));
        h.ledger.insert_blob("tx-data-1", b"ciphertext");

        let ticket = h
            .orchestrator
            .submit_retrieval_task("data-1", &TestSigner, DATA_SHARING_TASK)
            .await
            .unwrap();

        assert_eq!(ticket.fee, 115);
        assert_eq!(ticket.task_id, "task-1");
        let config = ClientConfig::default();
        assert_eq!(
            h.ledger.transfers.lock().unwrap().clone(),
            vec![(config.war_process_id.clone(), config.tasks_process_id.clone(), 115)]
        );

        let submitted = h.ledger.submissions.lock().unwrap()[0].clone();
        assert_eq!(submitted.compute_nodes, vec!["n0", "n1", "n2"]);
        assert_eq!(submitted.input_data.consumer_pk, ticket.session_key.public_key);
        assert_eq!(submitted.compute_limit, config.compute_limit);

        // Node n1 has not answered; n0 and n2 have
        h.ledger
            .complete(completed_task("task-1", "data-1", &[("n0", "share-0"), ("n2", "share-2")]));

        let plaintext = h
            .orchestrator
            .await_and_decrypt(&ticket, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(plaintext, b"hello threshold");

        let calls = h.cipher.decrypt_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (shares, private_key, ciphertext) = &calls[0];
        assert_eq!(shares.indices(), vec![1, 3]);
        assert_eq!(
            shares.shares.iter().map(|s| s.share.clone()).collect::<Vec<_>>(),
            vec![json!("share-0"), json!("share-2")]
        );
        assert_eq!(shares.nonce, vec![0x0e, 0xce]);
        assert_eq!(private_key, &ticket.session_key.private_key);
        assert_eq!(ciphertext, b"ciphertext");
    }

    #[tokio::test]
    async fn test_transfer_happens_before_submit() {
        let h = harness(MockLedger::new());
        h.ledger.insert_record(sample_record("data-1", "AOCRED", 1));

        h.orchestrator
            .submit_retrieval_task("data-1", &TestSigner, DATA_SHARING_TASK)
            .await
            .unwrap();

        assert_eq!(h.ledger.events(), vec!["transfer", "submit"]);
        let (from, _, _) = h.ledger.transfers.lock().unwrap()[0].clone();
        assert_eq!(from, ClientConfig::default().aocred_process_id);
    }

    #[tokio::test]
    async fn test_unsupported_symbol_fails_before_any_payment() {
        let h = harness(MockLedger::new());
        h.ledger.insert_record(sample_record("data-1", "USD", 100));

        let err = h
            .orchestrator
            .submit_retrieval_task("data-1", &TestSigner, DATA_SHARING_TASK)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedPaymentSymbol(ref s) if s == "USD"));
        assert_eq!(h.ledger.transfer_count(), 0);
        assert_eq!(h.ledger.price_lookup_count(), 0);
        assert!(h.ledger.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_balance_names_amount_and_symbol() {
        let h = harness(MockLedger::new().with_node_price(5).with_balance(114));
        h.ledger.insert_record(sample_record("data-1", "wAR", 100));

        let err = h
            .orchestrator
            .submit_retrieval_task("data-1", &TestSigner, DATA_SHARING_TASK)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::InsufficientBalance { required: 115, ref symbol } if symbol == "wAR"
        ));
        assert!(err.to_string().contains("115 wAR"));
        assert!(h.ledger.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_transfer() {
        let h = harness(MockLedger::new().failing_submit());
        h.ledger.insert_record(sample_record("data-1", "wAR", 100));

        let err = h
            .orchestrator
            .submit_retrieval_task("data-1", &TestSigner, DATA_SHARING_TASK)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream(_)));
        assert_eq!(h.ledger.transfer_count(), 1);
        assert_eq!(h.ledger.events(), vec!["transfer", "submit"]);
    }

    #[tokio::test]
    async fn test_keygen_failure_moves_no_funds() {
        let h = harness_with_cipher(
            MockLedger::new(),
            MockCipher::new(b"unused").failing_keygen(),
        );
        h.ledger.insert_record(sample_record("data-1", "wAR", 100));

        let err = h
            .orchestrator
            .submit_retrieval_task("data-1", &TestSigner, DATA_SHARING_TASK)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream(_)));
        assert_eq!(h.ledger.transfer_count(), 0);
        assert_eq!(h.ledger.price_lookup_count(), 0);
        assert!(h.ledger.events().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_data_propagates_upstream_error() {
        let h = harness(MockLedger::new());
        let err = h
            .orchestrator
            .submit_retrieval_task("missing", &TestSigner, DATA_SHARING_TASK)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert_eq!(h.ledger.transfer_count(), 0);
    }

    #[tokio::test]
    async fn test_each_ticket_gets_its_own_session_key() {
        let h = harness(MockLedger::new());
        h.ledger.insert_record(sample_record("data-1", "wAR", 1));

        let first = h
            .orchestrator
            .submit_retrieval_task("data-1", &TestSigner, DATA_SHARING_TASK)
            .await
            .unwrap();
        let second = h
            .orchestrator
            .submit_retrieval_task("data-1", &TestSigner, DATA_SHARING_TASK)
            .await
            .unwrap();

        assert_ne!(first.task_id, second.task_id);
        assert_ne!(first.session_key, second.session_key);
    }

    async fn submitted(h: &Harness) -> RetrievalTicket {
        h.ledger.insert_record(sample_record("data-1", "wAR", 100));
        h.ledger.insert_blob("tx-data-1", b"ciphertext");
        h.orchestrator
            .submit_retrieval_task("data-1", &TestSigner, DATA_SHARING_TASK)
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_error_is_surfaced_verbatim() {
        let h = harness(MockLedger::new());
        let ticket = submitted(&h).await;

        let mut task = completed_task("task-1", "data-1", &[("n0", "a"), ("n1", "b")]);
        task.verification_error = Some(json!("proof rejected by n1"));
        h.ledger.complete(task);

        let err = h
            .orchestrator
            .await_and_decrypt(&ticket, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RemoteVerificationFailure(ref r) if r == "proof rejected by n1"));
        assert!(h.cipher.decrypt_calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_shares_blocks_reconstruction() {
        let h = harness(MockLedger::new());
        let ticket = submitted(&h).await;
        h.ledger.complete(completed_task("task-1", "data-1", &[("n1", "only")]));

        let err = h
            .orchestrator
            .await_and_decrypt(&ticket, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientShares { required: 2, actual: 1 }));
        assert!(h.cipher.decrypt_calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_can_be_retried_with_same_ticket() {
        let h = harness(MockLedger::new());
        let ticket = submitted(&h).await;

        let err = h
            .orchestrator
            .await_and_decrypt(&ticket, Duration::from_millis(1000))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        h.ledger
            .complete(completed_task("task-1", "data-1", &[("n0", "a"), ("n1", "b"), ("n2", "c")]));
        let plaintext = h
            .orchestrator
            .await_and_decrypt(&ticket, Duration::from_millis(1000))
            .await
            .unwrap();
        assert_eq!(plaintext, b"hello threshold");

        let calls = h.cipher.decrypt_calls.lock().unwrap();
        assert_eq!(calls[0].0.indices(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_for_another_session_key_is_rejected() {
        let h = harness(MockLedger::new());
        let ticket = submitted(&h).await;

        let mut task = completed_task("task-1", "data-1", &[("n0", "a"), ("n2", "c")]);
        task.input_data.consumer_pk = "pk-someone-else".into();
        h.ledger.complete(task);

        let err = h
            .orchestrator
            .await_and_decrypt(&ticket, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidRecord { ref id, .. } if id == "task-1"));
        assert!(h.cipher.decrypt_calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_after_submission() {
        let h = harness(MockLedger::new());
        let ticket = submitted(&h).await;
        h.ledger.complete(completed_task("task-1", "data-1", &[("n0", "a"), ("n2", "c")]));

        h.orchestrator
            .await_and_decrypt(&ticket, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(h.ledger.events(), vec!["transfer", "submit", "poll"]);
    }
}
