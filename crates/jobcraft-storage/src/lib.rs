//! JobCraft Storage
//!
//! Durable local persistence for JobCraft's configuration state: a typed
//! JSON document store and data-directory resolution. Documents live under
//! the user data directory (`~/.local/share/jobcraft` or the platform
//! equivalent); callers override the path for tests.

pub mod error;
pub mod json_store;
pub mod paths;

pub use error::{IoOperation, StorageError, StorageResult};
pub use json_store::JsonStore;
pub use paths::PathResolver;
