//! Durable per-provider configuration with secret-at-rest protection
//!
//! The store is the sole writer of provider configuration rows. Rows are
//! created lazily on first write, merged on update, and never deleted.
//! Secret fields go through the injected [`SecretCipher`] before they touch
//! disk; reads resolve them back to plaintext for internal use or to a
//! masked placeholder for anything UI-facing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jobcraft_security::{EncryptedSecret, SecretCipher};
use jobcraft_storage::JsonStore;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::catalog::{FieldName, ProviderCatalog};
use crate::error::ProviderError;
use crate::probe::ConnectionTestResult;

/// Resolved view of one provider's configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub provider_id: String,
    pub fields: HashMap<FieldName, String>,
    /// True iff every required descriptor field is present and non-empty
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_validated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_validation_result: Option<ConnectionTestResult>,
}

impl ProviderConfig {
    /// Get a field value
    pub fn get(&self, name: FieldName) -> Option<&str> {
        self.fields.get(&name).map(String::as_str)
    }
}

/// Persisted provider-configuration table, keyed by provider id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ProviderSettingsDoc {
    #[serde(default)]
    providers: HashMap<String, StoredProviderConfig>,
}

/// One stored row; secrets are kept apart from plain fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProviderConfig {
    #[serde(default)]
    fields: HashMap<FieldName, String>,
    #[serde(default)]
    secrets: HashMap<FieldName, EncryptedSecret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_validated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_validation_result: Option<ConnectionTestResult>,
}

/// Durable per-provider configuration store
pub struct ConfigStore {
    catalog: Arc<ProviderCatalog>,
    cipher: Arc<dyn SecretCipher>,
    store: JsonStore<ProviderSettingsDoc>,
    doc: RwLock<ProviderSettingsDoc>,
    /// Per-provider update serialization; different providers proceed independently
    locks: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConfigStore {
    /// Create a store over the provider-configuration document at `path`
    pub fn new(
        catalog: Arc<ProviderCatalog>,
        cipher: Arc<dyn SecretCipher>,
        path: PathBuf,
    ) -> Result<Self, ProviderError> {
        let store = JsonStore::new(path);
        let doc = store.load_or_default()?;
        Ok(Self {
            catalog,
            cipher,
            store,
            doc: RwLock::new(doc),
            locks: parking_lot::Mutex::new(HashMap::new()),
        })
    }

    fn update_lock(&self, provider_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(provider_id.to_string())
            .or_default()
            .clone()
    }

    /// Resolved (plaintext) configuration for a provider
    ///
    /// A known provider with no stored row yields the empty default. When no
    /// API key is stored, the descriptor's conventional environment variable
    /// is consulted as a fallback.
    pub async fn get_config(&self, provider_id: &str) -> Result<ProviderConfig, ProviderError> {
        let descriptor = self.catalog.get(provider_id)?;

        let doc = self.doc.read().await;
        let stored = doc.providers.get(provider_id);

        let mut fields = stored.map(|s| s.fields.clone()).unwrap_or_default();
        if let Some(stored) = stored {
            for (name, secret) in &stored.secrets {
                fields.insert(*name, self.cipher.decrypt(secret)?);
            }
        }

        if descriptor.has_field(FieldName::ApiKey) && !fields.contains_key(&FieldName::ApiKey) {
            if let Some(env_var) = &descriptor.api_key_env {
                if let Ok(key) = std::env::var(env_var) {
                    if !key.is_empty() {
                        fields.insert(FieldName::ApiKey, key);
                    }
                }
            }
        }

        let configured = descriptor
            .required_fields()
            .all(|name| fields.get(&name).is_some_and(|v| !v.is_empty()));

        let (last_validated_at, last_validation_result) = stored
            .map(|s| (s.last_validated_at, s.last_validation_result.clone()))
            .unwrap_or((None, None));

        Ok(ProviderConfig {
            provider_id: provider_id.to_string(),
            fields,
            configured,
            last_validated_at,
            last_validation_result,
        })
    }

    /// Configuration with secret fields replaced by masked placeholders
    ///
    /// This is the only shape handed to UI-facing surfaces; a stored secret
    /// is never returned verbatim after it has been saved.
    pub async fn get_config_masked(
        &self,
        provider_id: &str,
    ) -> Result<ProviderConfig, ProviderError> {
        let mut config = self.get_config(provider_id).await?;
        for (name, value) in config.fields.iter_mut() {
            if name.is_secret() {
                *value = mask_secret(value);
            }
        }
        Ok(config)
    }

    /// Merge a partial field map into a provider's stored configuration
    ///
    /// Fields absent from the partial map are preserved; an empty string
    /// clears the field. Returns the masked configuration after the merge.
    pub async fn update_config(
        &self,
        provider_id: &str,
        partial: HashMap<String, String>,
    ) -> Result<ProviderConfig, ProviderError> {
        let descriptor = self.catalog.get(provider_id)?;

        // Validate every field name before mutating anything
        let mut updates = Vec::with_capacity(partial.len());
        for (raw_name, value) in partial {
            let name = FieldName::parse(&raw_name).ok_or_else(|| ProviderError::InvalidField {
                provider: provider_id.to_string(),
                field: raw_name.clone(),
            })?;
            if !descriptor.has_field(name) {
                return Err(ProviderError::InvalidField {
                    provider: provider_id.to_string(),
                    field: raw_name,
                });
            }
            updates.push((name, value));
        }

        let lock = self.update_lock(provider_id);
        let _guard = lock.lock().await;

        {
            let mut doc = self.doc.write().await;
            let stored = doc.providers.entry(provider_id.to_string()).or_default();
            for (name, value) in updates {
                if value.is_empty() {
                    stored.fields.remove(&name);
                    stored.secrets.remove(&name);
                } else if name.is_secret() {
                    stored.secrets.insert(name, self.cipher.encrypt(&value)?);
                } else {
                    stored.fields.insert(name, value);
                }
            }
            self.store.save(&doc)?;
        }

        debug!(provider = provider_id, "provider configuration updated");
        self.get_config_masked(provider_id).await
    }

    /// True iff every required field per the descriptor is non-empty
    pub async fn is_configured(&self, provider_id: &str) -> Result<bool, ProviderError> {
        Ok(self.get_config(provider_id).await?.configured)
    }

    /// Persist the outcome of a completed connection test
    ///
    /// Observability only: does not change `configured` or the active provider.
    pub async fn record_validation(
        &self,
        provider_id: &str,
        result: &ConnectionTestResult,
    ) -> Result<(), ProviderError> {
        self.catalog.get(provider_id)?;

        let mut doc = self.doc.write().await;
        let stored = doc.providers.entry(provider_id.to_string()).or_default();
        stored.last_validated_at = Some(Utc::now());
        stored.last_validation_result = Some(result.clone());
        self.store.save(&doc)?;
        Ok(())
    }
}

/// Mask a secret for display: last four characters when long enough
fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("...{tail}")
    } else {
        "***".to_string()
    }
}
