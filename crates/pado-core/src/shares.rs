//! Threshold share selection
//!
//! Shares are chosen by policy position, never by arrival order: the first
//! `t` nodes in the policy that reported a usable share win, and nodes after
//! them are not looked at. Below `t` usable shares there is nothing to
//! reconstruct and selection fails outright.

use serde::Serialize;

use crate::{AccessPolicy, EncryptedRecord, Error, NodeShare, Result, Task};

/// One chosen share with the policy index it was issued under
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedShare {
    pub index: u64,
    pub node: String,
    pub share: serde_json::Value,
}

/// Exactly `t` shares plus what reconstruction needs to find the ciphertext
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedShareSet {
    pub shares: Vec<SelectedShare>,
    #[serde(with = "crate::record::hex_bytes")]
    pub nonce: Vec<u8>,
    pub storage_ref: String,
}

impl SelectedShareSet {
    /// Select shares from a completed task for the record it was run against
    pub fn from_task(record: &EncryptedRecord, task: &Task) -> Result<Self> {
        let shares = select_shares(&record.policy, |node| task.share_from(node))?;
        Ok(Self {
            shares,
            nonce: record.nonce.clone(),
            storage_ref: record.storage_ref.clone(),
        })
    }

    pub fn indices(&self) -> Vec<u64> {
        self.shares.iter().map(|s| s.index).collect()
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

/// Walk `policy` in order, asking `lookup` for each node's share until `t`
/// have been collected.
pub fn select_shares<F>(policy: &AccessPolicy, mut lookup: F) -> Result<Vec<SelectedShare>>
where
    F: FnMut(&str) -> Option<NodeShare>,
{
    let mut chosen = Vec::with_capacity(policy.t);

    for (node, index) in policy.nodes() {
        if chosen.len() >= policy.t {
            break;
        }
        if let Some(share) = lookup(node) {
            chosen.push(SelectedShare {
                index,
                node: node.to_string(),
                share: share.reenc_sk,
            });
        }
    }

    if chosen.len() < policy.t {
        return Err(Error::InsufficientShares {
            required: policy.t,
            actual: chosen.len(),
        });
    }

    Ok(chosen)
}
