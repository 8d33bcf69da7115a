//! Active-provider selection
//!
//! Exactly one provider is active at any time. Activation validates first,
//! persists second, and only then swaps the in-memory state, so a crash
//! between steps never leaves memory ahead of disk.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jobcraft_storage::JsonStore;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::catalog::{ProviderCatalog, ProviderDescriptor};
use crate::error::ProviderError;
use crate::store::{ConfigStore, ProviderConfig};

/// The currently selected provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationState {
    pub active_provider_id: String,
    pub switched_at: DateTime<Utc>,
}

/// Persisted activation document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ActivationRecord {
    #[serde(default)]
    state: Option<ActivationState>,
}

/// Owns the single active-provider slot
pub struct ActivationManager {
    catalog: Arc<ProviderCatalog>,
    config: Arc<ConfigStore>,
    store: JsonStore<ActivationRecord>,
    state: Mutex<ActivationState>,
}

impl ActivationManager {
    /// Load activation state from the record at `path`, falling back to a
    /// default selection
    ///
    /// A persisted selection pointing at a provider that is no longer in the
    /// catalog or no longer enabled is discarded.
    pub async fn new(
        catalog: Arc<ProviderCatalog>,
        config: Arc<ConfigStore>,
        path: PathBuf,
    ) -> Result<Self, ProviderError> {
        let store: JsonStore<ActivationRecord> = JsonStore::new(path);
        let record = store.load_or_default()?;
        let state = match record.state {
            Some(state)
                if catalog
                    .get(&state.active_provider_id)
                    .map(|d| d.enabled)
                    .unwrap_or(false) =>
            {
                state
            }
            _ => {
                let provider_id = default_provider_id(&catalog, &config).await?;
                debug!(provider = %provider_id, "no valid persisted activation, using default");
                ActivationState {
                    active_provider_id: provider_id,
                    switched_at: Utc::now(),
                }
            }
        };
        Ok(Self {
            catalog,
            config,
            store,
            state: Mutex::new(state),
        })
    }

    /// Current activation state
    pub async fn state(&self) -> ActivationState {
        self.state.lock().await.clone()
    }

    /// Active provider's descriptor and resolved (plaintext) configuration
    pub async fn get_active(
        &self,
    ) -> Result<(ProviderDescriptor, ProviderConfig), ProviderError> {
        let id = self.state.lock().await.active_provider_id.clone();
        let descriptor = self.catalog.get(&id)?.clone();
        let config = self.config.get_config(&id).await?;
        Ok((descriptor, config))
    }

    /// Make a provider the active one
    ///
    /// The provider must exist and be enabled; it does not have to be
    /// configured. Activating the already-active provider is a no-op and
    /// leaves `switched_at` untouched.
    pub async fn activate(&self, provider_id: &str) -> Result<ActivationState, ProviderError> {
        let descriptor = self.catalog.get(provider_id)?;
        if !descriptor.enabled {
            return Err(ProviderError::Disabled(provider_id.to_string()));
        }

        let mut state = self.state.lock().await;
        if state.active_provider_id == provider_id {
            debug!(provider = provider_id, "provider already active");
            return Ok(state.clone());
        }

        let next = ActivationState {
            active_provider_id: provider_id.to_string(),
            switched_at: Utc::now(),
        };
        // Persist before the in-memory swap
        self.store.save(&ActivationRecord {
            state: Some(next.clone()),
        })?;
        let previous = std::mem::replace(&mut *state, next.clone());
        info!(
            from = %previous.active_provider_id,
            to = provider_id,
            "active provider switched"
        );
        Ok(next)
    }
}

/// First enabled provider that is configured, else the first enabled one
async fn default_provider_id(
    catalog: &ProviderCatalog,
    config: &ConfigStore,
) -> Result<String, ProviderError> {
    for descriptor in catalog.list().iter().filter(|d| d.enabled) {
        if config.is_configured(&descriptor.id).await? {
            return Ok(descriptor.id.clone());
        }
    }
    catalog
        .first_enabled()
        .map(|d| d.id.clone())
        .ok_or_else(|| ProviderError::Internal("catalog has no enabled providers".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::new_config_store;
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::tempdir;

    async fn manager(dir: &Path) -> ActivationManager {
        let catalog = Arc::new(ProviderCatalog::default());
        let config = Arc::new(new_config_store(dir));
        ActivationManager::new(catalog, config, dir.join("activation.json"))
            .await
            .unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_default_activation_is_first_enabled() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path()).await;
        assert_eq!(manager.state().await.active_provider_id, "ollabridge");
    }

    #[tokio::test]
    async fn test_default_prefers_configured_provider() {
        let dir = tempdir().unwrap();
        let catalog = Arc::new(ProviderCatalog::default());
        let config = Arc::new(new_config_store(dir.path()));
        config
            .update_config("openai", fields(&[("apiKey", "sk-abcdef123456")]))
            .await
            .unwrap();

        let manager = ActivationManager::new(catalog, config, dir.path().join("activation.json"))
            .await
            .unwrap();
        assert_eq!(manager.state().await.active_provider_id, "openai");
    }

    #[tokio::test]
    async fn test_activate_unknown_provider() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path()).await;
        let result = manager.activate("nonexistent").await;
        assert!(matches!(result, Err(ProviderError::UnknownProvider(_))));
        // Failed activation leaves the active slot unchanged
        assert_eq!(manager.state().await.active_provider_id, "ollabridge");
    }

    #[tokio::test]
    async fn test_activate_disabled_provider() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path()).await;
        let result = manager.activate("azure-openai").await;
        assert!(matches!(result, Err(ProviderError::Disabled(_))));
        // Failed activation leaves the active slot unchanged
        assert_eq!(manager.state().await.active_provider_id, "ollabridge");
        let (descriptor, _) = manager.get_active().await.unwrap();
        assert_eq!(descriptor.id, "ollabridge");
    }

    #[tokio::test]
    async fn test_activation_does_not_require_configuration() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path()).await;
        let state = manager.activate("openai").await.unwrap();
        assert_eq!(state.active_provider_id, "openai");
    }

    #[tokio::test]
    async fn test_repeat_activation_keeps_switched_at() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path()).await;
        let first = manager.activate("openai").await.unwrap();
        let second = manager.activate("openai").await.unwrap();
        assert_eq!(first.switched_at, second.switched_at);
    }

    #[tokio::test]
    async fn test_activation_survives_restart() {
        let dir = tempdir().unwrap();
        {
            let manager = manager(dir.path()).await;
            manager.activate("claude").await.unwrap();
        }
        let reloaded = manager(dir.path()).await;
        assert_eq!(reloaded.state().await.active_provider_id, "claude");
    }

    #[tokio::test]
    async fn test_stale_persisted_selection_discarded() {
        let dir = tempdir().unwrap();
        let store: JsonStore<ActivationRecord> =
            JsonStore::new(dir.path().join("activation.json"));
        store
            .save(&ActivationRecord {
                state: Some(ActivationState {
                    active_provider_id: "azure-openai".to_string(),
                    switched_at: Utc::now(),
                }),
            })
            .unwrap();

        let manager = manager(dir.path()).await;
        assert_eq!(manager.state().await.active_provider_id, "ollabridge");
    }
}
