//! Threshold cipher reached through a local HTTP sidecar

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use pado_core::{AccessPolicy, Error, Result, SelectedShareSet, SessionKeyPair};

use crate::remote::{EncryptedPayload, ThresholdCipher};
use crate::wire::{Blob, DecryptRequest, EncryptRequest};

/// Client for a sidecar exposing `/keygen`, `/encrypt` and `/decrypt`
pub struct SidecarCipher {
    http: Client,
    base_url: String,
}

impl SidecarCipher {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(Error::upstream)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(Error::upstream)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("cipher returned {}: {}", status, message)));
        }
        resp.json().await.map_err(Error::upstream)
    }
}

#[async_trait]
impl ThresholdCipher for SidecarCipher {
    async fn generate_key(&self) -> Result<SessionKeyPair> {
        self.call("/keygen", &serde_json::json!({})).await
    }

    async fn encrypt(
        &self,
        data: &[u8],
        policy: &AccessPolicy,
        public_keys: &[String],
    ) -> Result<EncryptedPayload> {
        let request = EncryptRequest {
            data: data.to_vec(),
            policy: policy.clone(),
            public_keys: public_keys.to_vec(),
        };
        let payload: EncryptedPayload = self.call("/encrypt", &request).await?;
        debug!(bytes = payload.ciphertext.len(), nodes = policy.n, "Encrypted payload");
        Ok(payload)
    }

    async fn decrypt(
        &self,
        shares: &SelectedShareSet,
        private_key: &str,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let request = DecryptRequest {
            shares,
            private_key,
            ciphertext,
        };
        let blob: Blob = self.call("/decrypt", &request).await?;
        Ok(blob.data)
    }
}
