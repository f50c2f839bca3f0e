//! pado-core: Core types for threshold data sharing
//!
//! A data owner encrypts a payload under a t-of-n access policy and registers
//! it on the ledger. A requester pays for a task that asks the policy's
//! compute nodes for partial re-encryption shares, then reconstructs the
//! plaintext from any `t` of them.
//!
//! This crate holds the parts of that protocol that need no network:
//!
//! - [`AccessPolicy`] and the ledger [`DataRecord`] schema, validated once
//!   where records enter the client
//! - [`total_price`], the task fee over a variable-size node set
//! - [`select_shares`], the t-of-n gate choosing shares by policy position
//! - [`ClientConfig`] and the protocol [`constants`]
//!
//! The cryptographic scheme itself is out of scope; shares and keys are
//! opaque values here.

mod config;
mod error;
mod fee;
mod policy;
pub mod record;
mod shares;
mod symbol;
mod task;

pub use config::{ClientConfig, SCHEMA_VERSION};
pub use error::Error;
pub use fee::total_price;
pub use policy::{AccessPolicy, EncryptionSchema};
pub use record::{DataRecord, DataStatus, EncryptedRecord, PriceInfo, StorageType};
pub use shares::{select_shares, SelectedShare, SelectedShareSet};
pub use symbol::PaymentSymbol;
pub use task::{NodeShare, SessionKeyPair, Task, TaskInput};

pub type Result<T> = std::result::Result<T, Error>;

/// Protocol constants
pub mod constants {
    /// Fixed wait between completion polls
    pub const POLL_INTERVAL_MS: u64 = 500;

    /// Completion timeout when the caller does not pass one
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

    /// Default threshold for newly registered data
    pub const DEFAULT_THRESHOLD: usize = 2;

    /// Default number of compute nodes for newly registered data
    pub const DEFAULT_NODE_COUNT: usize = 3;

    /// Compute limit attached to retrieval tasks
    pub const COMPUTE_LIMIT: &str = "9000000000000";

    /// Memory limit attached to retrieval tasks
    pub const MEMORY_LIMIT: &str = "512M";

    /// Task type for threshold data-sharing retrievals
    pub const DATA_SHARING_TASK: &str = "ZKLHEDataSharing";

    /// Process ids used by the devnet gateway
    pub const DEVNET_TASKS_PROCESS: &str = "devnet-tasks";
    pub const DEVNET_AOCRED_PROCESS: &str = "devnet-aocred";
    pub const DEVNET_WAR_PROCESS: &str = "devnet-war";
}
