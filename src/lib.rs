//! pado: threshold data sharing
//!
//! Umbrella crate over the workspace members:
//!
//! - [`pado_core`]: records, policies, fees and share selection
//! - [`pado_client`]: the data-sharing client and its HTTP bindings
//! - [`pado_devnet`]: the in-memory gateway used for local development

pub use pado_client;
pub use pado_core;
pub use pado_devnet;
