//! AI provider configuration and activation core for JobCraft
//!
//! Manages the catalog of supported AI backends, their per-provider
//! configuration (with encrypted credentials), connection testing, model
//! discovery, and the single active-provider selection. This crate holds
//! the domain logic only; transport layers sit on top of
//! [`manager::ProviderManager`].

pub mod activation;
pub mod catalog;
pub mod error;
pub mod fallback;
pub mod manager;
pub mod model_catalog;
pub mod probe;
pub mod store;

#[cfg(test)]
mod testing;

pub use activation::{ActivationManager, ActivationState};
pub use catalog::{FieldName, FieldSpec, ProviderCatalog, ProviderDescriptor, ProviderKind};
pub use error::ProviderError;
pub use manager::{ProviderManager, ProviderOverview, ProviderStatus, ProviderStatusSummary};
pub use model_catalog::ModelCatalogCache;
pub use probe::{ConnectionProber, ConnectionTestResult};
pub use store::{ConfigStore, ProviderConfig};
