//! Shared helpers for unit tests

use std::path::Path;
use std::sync::Arc;

use jobcraft_security::{EncryptedSecret, Result as SecurityResult, SecretCipher};

use crate::catalog::ProviderCatalog;
use crate::store::ConfigStore;

/// Identity cipher: stores plaintext in the ciphertext slot
///
/// Keeps unit tests independent of key derivation cost; the real cipher is
/// covered by its own crate's tests.
struct PlainCipher;

impl SecretCipher for PlainCipher {
    fn encrypt(&self, plaintext: &str) -> SecurityResult<EncryptedSecret> {
        Ok(EncryptedSecret {
            salt: String::new(),
            nonce: String::new(),
            ciphertext: plaintext.to_string(),
        })
    }

    fn decrypt(&self, secret: &EncryptedSecret) -> SecurityResult<String> {
        Ok(secret.ciphertext.clone())
    }
}

pub(crate) fn plain_cipher() -> Arc<dyn SecretCipher> {
    Arc::new(PlainCipher)
}

pub(crate) fn new_config_store(dir: &Path) -> ConfigStore {
    ConfigStore::new(
        Arc::new(ProviderCatalog::default()),
        plain_cipher(),
        dir.join("providers.json"),
    )
    .expect("config store")
}
