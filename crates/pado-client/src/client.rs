//! High-level client combining registration and retrieval

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use pado_core::{ClientConfig, DataRecord, DataStatus, PriceInfo, Result};

use crate::cipher::SidecarCipher;
use crate::gateway::GatewayClient;
use crate::orchestrator::{RetrievalTicket, TaskOrchestrator};
use crate::registration::RegistrationPipeline;
use crate::remote::{RemoteServices, Signer, ThresholdCipher};
use crate::watcher::CancelToken;

/// Data-sharing client bound to one gateway and one cipher
pub struct PadoClient {
    config: ClientConfig,
    registration: RegistrationPipeline,
    orchestrator: TaskOrchestrator,
}

impl PadoClient {
    /// Build a client from explicit collaborators
    pub fn new(remote: RemoteServices, config: ClientConfig) -> Self {
        Self {
            registration: RegistrationPipeline::new(remote.clone()),
            orchestrator: TaskOrchestrator::new(remote, config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Encrypt and register `data` under the configured threshold schema
    pub async fn submit_data(
        &self,
        data: &[u8],
        data_tag: Map<String, Value>,
        price: PriceInfo,
        signer: &dyn Signer,
    ) -> Result<String> {
        self.registration
            .submit_data(data, data_tag, price, signer, self.config.encryption_schema)
            .await
    }

    pub async fn list_data(&self, status: DataStatus) -> Result<Vec<DataRecord>> {
        self.registration.list_data(status).await
    }

    pub async fn get_data(&self, data_id: &str) -> Result<DataRecord> {
        self.registration.get_data(data_id).await
    }

    /// Pay for and submit a retrieval task
    pub async fn submit_task(
        &self,
        data_id: &str,
        signer: &dyn Signer,
        task_type: &str,
    ) -> Result<RetrievalTicket> {
        self.orchestrator
            .submit_retrieval_task(data_id, signer, task_type)
            .await
    }

    /// Wait for a submitted task and decrypt its result
    ///
    /// `timeout` falls back to the configured default.
    pub async fn get_result(&self, ticket: &RetrievalTicket, timeout: Option<Duration>) -> Result<Vec<u8>> {
        let timeout = timeout.unwrap_or_else(|| self.config.timeout());
        self.orchestrator.await_and_decrypt(ticket, timeout).await
    }

    pub async fn get_result_with_cancel(
        &self,
        ticket: &RetrievalTicket,
        timeout: Option<Duration>,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>> {
        let timeout = timeout.unwrap_or_else(|| self.config.timeout());
        self.orchestrator
            .await_and_decrypt_with_cancel(ticket, timeout, cancel)
            .await
    }

    /// Submit a task and wait for its plaintext in one call
    pub async fn retrieve(
        &self,
        data_id: &str,
        signer: &dyn Signer,
        task_type: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        let ticket = self.submit_task(data_id, signer, task_type).await?;
        self.get_result(&ticket, timeout).await
    }
}

/// Builder for [`PadoClient`] over the HTTP bindings
pub struct ClientBuilder {
    config: ClientConfig,
    config_path: Option<PathBuf>,
    cipher: Option<Arc<dyn ThresholdCipher>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            config_path: None,
            cipher: None,
        }
    }

    /// Load the config from a JSON file at build time instead
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Use a cipher other than the configured sidecar
    pub fn cipher(mut self, cipher: Arc<dyn ThresholdCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn build(self) -> Result<PadoClient> {
        let config = match self.config_path {
            Some(path) => ClientConfig::load(path)?,
            None => {
                self.config.validate()?;
                self.config
            }
        };

        let gateway = Arc::new(GatewayClient::new(
            &config.gateway_url,
            config.storage_type,
            config.request_timeout(),
        )?);
        let cipher = match self.cipher {
            Some(cipher) => cipher,
            None => Arc::new(SidecarCipher::new(&config.cipher_url, config.request_timeout())?),
        };

        tracing::debug!(
            gateway = %config.gateway_url,
            storage = %config.storage_type,
            "Building client"
        );
        Ok(PadoClient::new(RemoteServices::from_gateway(gateway, cipher), config))
    }
}
