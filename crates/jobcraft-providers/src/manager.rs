//! Facade tying the catalog, config store, prober, model cache, and
//! activation manager together behind one API

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use jobcraft_security::SecretCipher;
use jobcraft_storage::PathResolver;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::activation::{ActivationManager, ActivationState};
use crate::catalog::{ProviderCatalog, ProviderDescriptor};
use crate::error::ProviderError;
use crate::fallback;
use crate::model_catalog::ModelCatalogCache;
use crate::probe::{ConnectionProber, ConnectionTestResult};
use crate::store::{ConfigStore, ProviderConfig};

/// One row of the provider listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOverview {
    #[serde(flatten)]
    pub descriptor: ProviderDescriptor,
    pub configured: bool,
    pub is_active: bool,
}

/// Configuration health of one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_validation_result: Option<ConnectionTestResult>,
}

/// Snapshot of the whole provider subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatusSummary {
    pub active_provider_id: String,
    pub providers: HashMap<String, ProviderStatus>,
}

/// Entry point for provider configuration and activation
pub struct ProviderManager {
    catalog: Arc<ProviderCatalog>,
    config: Arc<ConfigStore>,
    prober: ConnectionProber,
    models: ModelCatalogCache,
    activation: ActivationManager,
}

impl ProviderManager {
    /// Create a manager over the default catalog, persisting under `data_dir`
    pub async fn new(
        data_dir: &Path,
        cipher: Arc<dyn SecretCipher>,
    ) -> Result<Self, ProviderError> {
        Self::with_catalog(Arc::new(ProviderCatalog::default()), data_dir, cipher).await
    }

    /// Create a manager persisting under the platform data directory
    pub async fn with_default_data_dir(
        cipher: Arc<dyn SecretCipher>,
    ) -> Result<Self, ProviderError> {
        let data_dir = PathResolver::resolve_data_dir()?;
        Self::new(&data_dir, cipher).await
    }

    /// Create a manager over a custom catalog
    pub async fn with_catalog(
        catalog: Arc<ProviderCatalog>,
        data_dir: &Path,
        cipher: Arc<dyn SecretCipher>,
    ) -> Result<Self, ProviderError> {
        let config = Arc::new(ConfigStore::new(
            catalog.clone(),
            cipher,
            data_dir.join("providers.json"),
        )?);
        let activation = ActivationManager::new(
            catalog.clone(),
            config.clone(),
            data_dir.join("activation.json"),
        )
        .await?;
        Ok(Self {
            prober: ConnectionProber::new(catalog.clone(), config.clone()),
            models: ModelCatalogCache::new(catalog.clone(), config.clone()),
            catalog,
            config,
            activation,
        })
    }

    /// All catalog providers with their configured/active flags
    pub async fn list_providers(&self) -> Result<Vec<ProviderOverview>, ProviderError> {
        let active_id = self.activation.state().await.active_provider_id;
        let mut overviews = Vec::with_capacity(self.catalog.list().len());
        for descriptor in self.catalog.list() {
            overviews.push(ProviderOverview {
                descriptor: descriptor.clone(),
                configured: self.config.is_configured(&descriptor.id).await?,
                is_active: descriptor.id == active_id,
            });
        }
        Ok(overviews)
    }

    /// Snapshot of the active selection and every provider's health
    pub async fn status(&self) -> Result<ProviderStatusSummary, ProviderError> {
        let active_provider_id = self.activation.state().await.active_provider_id;
        let mut providers = HashMap::new();
        for descriptor in self.catalog.list() {
            let config = self.config.get_config(&descriptor.id).await?;
            providers.insert(
                descriptor.id.clone(),
                ProviderStatus {
                    configured: config.configured,
                    last_validation_result: config.last_validation_result,
                },
            );
        }
        Ok(ProviderStatusSummary {
            active_provider_id,
            providers,
        })
    }

    /// Masked configuration for a provider
    pub async fn get_config(&self, provider_id: &str) -> Result<ProviderConfig, ProviderError> {
        self.config.get_config_masked(provider_id).await
    }

    /// Merge a partial field map; returns the masked result
    pub async fn update_config(
        &self,
        provider_id: &str,
        partial: HashMap<String, String>,
    ) -> Result<ProviderConfig, ProviderError> {
        self.config.update_config(provider_id, partial).await
    }

    /// Probe a provider's endpoint with its stored credentials
    pub async fn test_connection(
        &self,
        provider_id: &str,
    ) -> Result<ConnectionTestResult, ProviderError> {
        self.prober.test(provider_id).await
    }

    /// Live model list, served from the cache when fresh
    pub async fn list_models(
        &self,
        provider_id: &str,
        force_refresh: bool,
    ) -> Result<Vec<String>, ProviderError> {
        self.models.list_models(provider_id, force_refresh).await
    }

    /// Model list with a static fallback when discovery is unsupported
    /// or the live fetch fails
    pub async fn list_models_or_default(
        &self,
        provider_id: &str,
        force_refresh: bool,
    ) -> Result<Vec<String>, ProviderError> {
        match self.models.list_models(provider_id, force_refresh).await {
            Ok(models) => Ok(models),
            Err(ProviderError::Unsupported(_)) => {
                self.catalog.get(provider_id)?;
                Ok(default_model_list(provider_id))
            }
            Err(ProviderError::ProbeFailed(message)) => {
                warn!(
                    provider = provider_id,
                    error = %message,
                    "model discovery failed, serving default list"
                );
                Ok(default_model_list(provider_id))
            }
            Err(e) => Err(e),
        }
    }

    /// Current activation state
    pub async fn activation_state(&self) -> ActivationState {
        self.activation.state().await
    }

    /// Switch the active provider
    pub async fn activate(&self, provider_id: &str) -> Result<ActivationState, ProviderError> {
        self.activation.activate(provider_id).await
    }

    /// Active provider's descriptor and resolved (plaintext) configuration
    pub async fn active(
        &self,
    ) -> Result<(ProviderDescriptor, ProviderConfig), ProviderError> {
        self.activation.get_active().await
    }
}

fn default_model_list(provider_id: &str) -> Vec<String> {
    fallback::default_models(provider_id)
        .iter()
        .map(|m| m.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::plain_cipher;
    use tempfile::tempdir;

    async fn manager(dir: &Path) -> ProviderManager {
        ProviderManager::new(dir, plain_cipher()).await.unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_listing_marks_configured_and_active() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path()).await;
        manager
            .update_config("openai", fields(&[("apiKey", "sk-abcdef123456")]))
            .await
            .unwrap();
        manager.activate("openai").await.unwrap();

        let listing = manager.list_providers().await.unwrap();
        assert_eq!(listing.len(), 7);
        let openai = listing.iter().find(|o| o.descriptor.id == "openai").unwrap();
        assert!(openai.configured);
        assert!(openai.is_active);
        let ollama = listing.iter().find(|o| o.descriptor.id == "ollama").unwrap();
        assert!(!ollama.configured);
        assert!(!ollama.is_active);
    }

    #[tokio::test]
    async fn test_status_summary_covers_all_providers() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path()).await;
        let summary = manager.status().await.unwrap();
        assert_eq!(summary.active_provider_id, "ollabridge");
        assert_eq!(summary.providers.len(), 7);
        assert!(!summary.providers["openai"].configured);
    }

    #[tokio::test]
    async fn test_models_fall_back_when_discovery_unsupported() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path()).await;
        let models = manager
            .list_models_or_default("gemini", false)
            .await
            .unwrap();
        assert!(models.contains(&"gemini-1.5-pro".to_string()));
    }

    #[tokio::test]
    async fn test_models_fall_back_when_fetch_fails() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path()).await;
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(503)
            .create_async()
            .await;
        manager
            .update_config("ollama", fields(&[("baseUrl", &server.url())]))
            .await
            .unwrap();

        let models = manager
            .list_models_or_default("ollama", false)
            .await
            .unwrap();
        assert!(models.contains(&"llama3.1:8b".to_string()));
    }

    #[tokio::test]
    async fn test_fallback_still_rejects_unknown_provider() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path()).await;
        let result = manager.list_models_or_default("nonexistent", false).await;
        assert!(matches!(result, Err(ProviderError::UnknownProvider(_))));
    }
}
