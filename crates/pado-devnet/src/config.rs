//! Devnet configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use pado_core::constants::{DEVNET_AOCRED_PROCESS, DEVNET_TASKS_PROCESS, DEVNET_WAR_PROCESS};
use pado_core::PaymentSymbol;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevnetConfig {
    /// Worker nodes available to data policies
    #[serde(default = "default_node_count")]
    pub node_count: usize,
    /// Per-node computation price, per symbol
    #[serde(default = "default_aocred_price")]
    pub aocred_node_price: u64,
    #[serde(default = "default_war_price")]
    pub war_node_price: u64,
    #[serde(default = "default_tasks_process")]
    pub tasks_process_id: String,
    #[serde(default = "default_aocred_process")]
    pub aocred_process_id: String,
    #[serde(default = "default_war_process")]
    pub war_process_id: String,
}

fn default_node_count() -> usize {
    5
}

fn default_aocred_price() -> u64 {
    1
}

fn default_war_price() -> u64 {
    5
}

fn default_tasks_process() -> String {
    DEVNET_TASKS_PROCESS.to_string()
}

fn default_aocred_process() -> String {
    DEVNET_AOCRED_PROCESS.to_string()
}

fn default_war_process() -> String {
    DEVNET_WAR_PROCESS.to_string()
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            node_count: default_node_count(),
            aocred_node_price: default_aocred_price(),
            war_node_price: default_war_price(),
            tasks_process_id: default_tasks_process(),
            aocred_process_id: default_aocred_process(),
            war_process_id: default_war_process(),
        }
    }
}

impl DevnetConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn node_price(&self, symbol: PaymentSymbol) -> u64 {
        match symbol {
            PaymentSymbol::Aocred => self.aocred_node_price,
            PaymentSymbol::War => self.war_node_price,
        }
    }

    /// Symbol whose token process is `process_id`
    pub fn token_symbol(&self, process_id: &str) -> Option<PaymentSymbol> {
        if process_id == self.aocred_process_id {
            Some(PaymentSymbol::Aocred)
        } else if process_id == self.war_process_id {
            Some(PaymentSymbol::War)
        } else {
            None
        }
    }
}
