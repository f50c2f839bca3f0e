//! Threshold access policies

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{Error, Result};

/// Threshold parameters a data owner asks for when registering data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionSchema {
    pub t: usize,
    pub n: usize,
}

impl EncryptionSchema {
    pub fn new(t: usize, n: usize) -> Result<Self> {
        let schema = Self { t, n };
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<()> {
        if self.t == 0 {
            return Err(Error::InvalidPolicy("threshold t must be at least 1".into()));
        }
        if self.n < self.t {
            return Err(Error::InvalidPolicy(format!(
                "n ({}) must be at least t ({})",
                self.n, self.t
            )));
        }
        Ok(())
    }
}

impl Default for EncryptionSchema {
    fn default() -> Self {
        Self {
            t: crate::constants::DEFAULT_THRESHOLD,
            n: crate::constants::DEFAULT_NODE_COUNT,
        }
    }
}

/// t-of-n policy binding share indices to compute nodes
///
/// `names[i]` holds the share with index `indices[i]`. Order matters: share
/// selection walks the policy front to back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub t: usize,
    pub n: usize,
    pub names: Vec<String>,
    pub indices: Vec<u64>,
}

impl AccessPolicy {
    /// Build a policy and check its invariants
    pub fn new(t: usize, names: Vec<String>, indices: Vec<u64>) -> Result<Self> {
        let policy = Self {
            t,
            n: names.len(),
            names,
            indices,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check `1 <= t <= n`, aligned name/index lists and distinct indices
    pub fn validate(&self) -> Result<()> {
        EncryptionSchema { t: self.t, n: self.n }.validate()?;

        if self.names.len() != self.n || self.indices.len() != self.n {
            return Err(Error::InvalidPolicy(format!(
                "expected {} names and indices, got {} names and {} indices",
                self.n,
                self.names.len(),
                self.indices.len()
            )));
        }

        let mut seen = HashSet::with_capacity(self.n);
        for index in &self.indices {
            if !seen.insert(*index) {
                return Err(Error::InvalidPolicy(format!("duplicate share index {}", index)));
            }
        }

        Ok(())
    }

    /// Iterate `(name, index)` pairs in policy order
    pub fn nodes(&self) -> impl Iterator<Item = (&str, u64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.indices.iter().copied())
    }

    pub fn schema(&self) -> EncryptionSchema {
        EncryptionSchema { t: self.t, n: self.n }
    }
}
