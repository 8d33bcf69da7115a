//! # JobCraft Security
//!
//! Secret-at-rest protection for JobCraft.
//!
//! This crate provides:
//! - The [`SecretCipher`] port injected into configuration storage
//! - An AES-256-GCM implementation keyed from a master password

pub mod encryption;
pub mod error;

pub use encryption::{EncryptedSecret, KeyManager, SecretCipher};
pub use error::SecurityError;

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, SecurityError>;
