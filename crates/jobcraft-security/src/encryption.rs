//! Credential encryption and the cipher port

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use argon2::{Argon2, Params};
use base64::{engine::general_purpose, Engine as _};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Result, SecurityError};

/// A secret value encrypted for storage at rest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    /// Base64-encoded salt
    pub salt: String,
    /// Base64-encoded nonce
    pub nonce: String,
    /// Base64-encoded encrypted data
    pub ciphertext: String,
}

/// Encryption port for secret configuration fields
///
/// The configuration store takes this as an injected capability so its
/// contract stays testable with an in-memory cipher.
pub trait SecretCipher: Send + Sync {
    /// Encrypt a secret value for storage
    fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret>;

    /// Decrypt a stored secret value
    fn decrypt(&self, secret: &EncryptedSecret) -> Result<String>;
}

/// AES-256-GCM cipher keyed from a master password
pub struct KeyManager {
    master_key: [u8; 32],
}

impl KeyManager {
    /// Create a new key manager with a master password
    pub fn new(master_password: &str) -> Result<Self> {
        let master_key = Self::derive_key(master_password, b"jobcraft-master-key")?;
        Ok(Self { master_key })
    }

    /// Derive key from password using Argon2
    fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; 32]> {
        let mut key = [0u8; 32];
        let argon2 = Argon2::default();

        argon2
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|e| SecurityError::KeyDerivation {
                message: e.to_string(),
            })?;

        Ok(key)
    }

    /// Derive key from existing key bytes and salt
    fn derive_key_from_bytes(key: &[u8; 32], salt: &[u8]) -> Result<[u8; 32]> {
        let mut derived_key = [0u8; 32];
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            Params::new(65536, 3, 4, None).unwrap(),
        );

        argon2
            .hash_password_into(key, salt, &mut derived_key)
            .map_err(|e| SecurityError::KeyDerivation {
                message: e.to_string(),
            })?;

        Ok(derived_key)
    }

    /// Generate random salt
    fn generate_salt() -> [u8; 32] {
        rand::thread_rng().gen()
    }

    /// Generate random nonce
    fn generate_nonce() -> [u8; 12] {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill(&mut bytes);
        bytes
    }
}

impl SecretCipher for KeyManager {
    fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret> {
        let salt = Self::generate_salt();
        let nonce = Self::generate_nonce();

        // Derive encryption key from master key and per-secret salt
        let encryption_key = Self::derive_key_from_bytes(&self.master_key, &salt)?;

        let cipher = Aes256Gcm::new(&encryption_key.into());
        let nonce_gcm = aes_gcm::Nonce::from_slice(&nonce);
        let ciphertext = cipher
            .encrypt(nonce_gcm, plaintext.as_bytes())
            .map_err(|e| SecurityError::Encryption {
                message: e.to_string(),
            })?;

        Ok(EncryptedSecret {
            salt: general_purpose::STANDARD.encode(salt),
            nonce: general_purpose::STANDARD.encode(nonce),
            ciphertext: general_purpose::STANDARD.encode(ciphertext),
        })
    }

    fn decrypt(&self, secret: &EncryptedSecret) -> Result<String> {
        let salt = general_purpose::STANDARD.decode(&secret.salt)?;
        let nonce_bytes = general_purpose::STANDARD.decode(&secret.nonce)?;
        let ciphertext = general_purpose::STANDARD.decode(&secret.ciphertext)?;

        let nonce = aes_gcm::Nonce::from_slice(&nonce_bytes);

        let encryption_key = Self::derive_key_from_bytes(&self.master_key, &salt)?;

        let cipher = Aes256Gcm::new(&encryption_key.into());
        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|e| SecurityError::Decryption {
                message: e.to_string(),
            })?;

        String::from_utf8(plaintext).map_err(Into::into)
    }
}
