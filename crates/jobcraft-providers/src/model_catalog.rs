//! Model discovery with a TTL cache
//!
//! Fetched model lists are cached in memory per provider for a day; a stale
//! or missing entry triggers a live fetch. Discovery failures surface as
//! [`ProviderError::ProbeFailed`] so the caller can decide whether to fall
//! back to the static default lists.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::catalog::{FieldName, ProviderCatalog};
use crate::error::ProviderError;
use crate::probe::resolve_base_url;
use crate::store::{ConfigStore, ProviderConfig};

/// How long a fetched model list stays fresh
const CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// watsonx serves different model sets per region; the catalog is the union
const WATSONX_BASE_URLS: [&str; 4] = [
    "https://us-south.ml.cloud.ibm.com",
    "https://eu-de.ml.cloud.ibm.com",
    "https://jp-tok.ml.cloud.ibm.com",
    "https://au-syd.ml.cloud.ibm.com",
];

/// Cached model list for one provider
#[derive(Debug, Clone)]
struct ModelCatalogEntry {
    models: Vec<String>,
    fetched_at: DateTime<Utc>,
}

impl ModelCatalogEntry {
    fn is_stale(&self) -> bool {
        Utc::now()
            .signed_duration_since(self.fetched_at)
            .to_std()
            .map(|age| age >= CACHE_TTL)
            .unwrap_or(true)
    }
}

/// Per-provider model lists with a 24-hour in-memory cache
pub struct ModelCatalogCache {
    catalog: Arc<ProviderCatalog>,
    store: Arc<ConfigStore>,
    client: reqwest::Client,
    entries: RwLock<HashMap<String, ModelCatalogEntry>>,
}

impl ModelCatalogCache {
    pub fn new(catalog: Arc<ProviderCatalog>, store: Arc<ConfigStore>) -> Self {
        Self {
            catalog,
            store,
            client: reqwest::Client::new(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// List the models a provider currently serves
    ///
    /// Served from cache when fresh; `force_refresh` bypasses the cache and
    /// replaces the entry on success.
    pub async fn list_models(
        &self,
        provider_id: &str,
        force_refresh: bool,
    ) -> Result<Vec<String>, ProviderError> {
        let descriptor = self.catalog.get(provider_id)?.clone();
        if !descriptor.supports_model_discovery {
            return Err(ProviderError::Unsupported(provider_id.to_string()));
        }

        if !force_refresh {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(provider_id) {
                if !entry.is_stale() {
                    debug!(provider = provider_id, "serving model list from cache");
                    return Ok(entry.models.clone());
                }
            }
        }

        let config = self.store.get_config(provider_id).await?;
        let models = self
            .fetch_models(provider_id, &config)
            .await
            .map_err(ProviderError::ProbeFailed)?;

        let mut entries = self.entries.write().await;
        entries.insert(
            provider_id.to_string(),
            ModelCatalogEntry {
                models: models.clone(),
                fetched_at: Utc::now(),
            },
        );
        Ok(models)
    }

    async fn fetch_models(
        &self,
        provider_id: &str,
        config: &ProviderConfig,
    ) -> Result<Vec<String>, String> {
        let descriptor = self.catalog.get(provider_id).map_err(|e| e.to_string())?;
        match provider_id {
            "ollabridge" | "ollama" => {
                let base = resolve_base_url(descriptor, config)?;
                let mut request = self.client.get(format!("{base}/api/tags"));
                if let Some(key) = config.get(FieldName::ApiKey).filter(|k| !k.is_empty()) {
                    request = request.header("X-API-Key", key).bearer_auth(key);
                }
                let body = fetch_json(request).await?;
                let mut models = collect_strings(&body, "models", "name");
                models.sort();
                models.dedup();
                if models.is_empty() {
                    return Err("endpoint returned no models".to_string());
                }
                Ok(models)
            }
            "openai" | "claude" => {
                let base = resolve_base_url(descriptor, config)?;
                let api_key = config.get(FieldName::ApiKey).unwrap_or_default();
                let request = match provider_id {
                    "openai" => self
                        .client
                        .get(format!("{base}/v1/models"))
                        .bearer_auth(api_key),
                    _ => self
                        .client
                        .get(format!("{base}/v1/models"))
                        .header("x-api-key", api_key)
                        .header("anthropic-version", "2023-06-01"),
                };
                let body = fetch_json(request).await?;
                let mut models = collect_strings(&body, "data", "id");
                models.sort();
                if models.is_empty() {
                    return Err("endpoint returned no models".to_string());
                }
                Ok(models)
            }
            "watsonx" => self.fetch_watsonx_models(config).await,
            other => Err(format!("no model discovery defined for provider '{other}'")),
        }
    }

    /// Foundation-model catalog, filtered to models still available today
    ///
    /// With a configured base URL only that region is queried; otherwise
    /// the catalogs of the known public regions are unioned, skipping
    /// regions that fail.
    async fn fetch_watsonx_models(&self, config: &ProviderConfig) -> Result<Vec<String>, String> {
        let api_key = config.get(FieldName::ApiKey).unwrap_or_default();
        let bases: Vec<String> = match config.get(FieldName::BaseUrl).filter(|v| !v.is_empty()) {
            Some(base) => vec![base.trim_end_matches('/').to_string()],
            None => WATSONX_BASE_URLS.iter().map(|b| b.to_string()).collect(),
        };
        let mut models: Vec<String> = Vec::new();
        let mut last_error = String::new();

        for base in bases {
            let request = self
                .client
                .get(format!("{base}/ml/v1/foundation_model_specs?version=2024-09-16"))
                .bearer_auth(api_key);
            let body = match fetch_json(request).await {
                Ok(body) => body,
                Err(e) => {
                    last_error = e;
                    continue;
                }
            };
            let Some(resources) = body.get("resources").and_then(Value::as_array) else {
                continue;
            };
            for spec in resources {
                if is_deprecated_or_withdrawn(spec) {
                    continue;
                }
                if let Some(id) = spec.get("model_id").and_then(Value::as_str) {
                    models.push(id.to_string());
                }
            }
        }

        models.sort();
        models.dedup();
        if models.is_empty() {
            if last_error.is_empty() {
                return Err("no available models in any region".to_string());
            }
            return Err(last_error);
        }
        Ok(models)
    }
}

async fn fetch_json(request: reqwest::RequestBuilder) -> Result<Value, String> {
    let response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {status}"));
    }
    response.json::<Value>().await.map_err(|e| e.to_string())
}

/// Collect `body[array][*][field]` string values
fn collect_strings(body: &Value, array: &str, field: &str) -> Vec<String> {
    body.get(array)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(field).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// A lifecycle phase counts once its start date has passed
fn is_deprecated_or_withdrawn(spec: &Value) -> bool {
    let today = Utc::now().format("%Y-%m-%d").to_string();
    spec.get("lifecycle")
        .and_then(Value::as_array)
        .map(|phases| {
            phases.iter().any(|phase| {
                let id = phase.get("id").and_then(Value::as_str).unwrap_or_default();
                if id != "deprecated" && id != "withdrawn" {
                    return false;
                }
                phase
                    .get("start_date")
                    .and_then(Value::as_str)
                    // ISO dates compare correctly as strings
                    .map(|start| start <= today.as_str())
                    .unwrap_or(true)
            })
        })
        .unwrap_or(false)
}
