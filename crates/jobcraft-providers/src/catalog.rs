//! Provider catalog: fixed descriptors for the supported AI backends
//!
//! The catalog is configuration data, not user-editable state. Descriptors
//! are the single source of truth for a provider's field schema; transport
//! layers translate into and out of these shapes.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Configuration field names a provider may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    ApiKey,
    BaseUrl,
    Model,
    ProjectId,
}

impl FieldName {
    /// Parse a wire-format field name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "apiKey" => Some(Self::ApiKey),
            "baseUrl" => Some(Self::BaseUrl),
            "model" => Some(Self::Model),
            "projectId" => Some(Self::ProjectId),
            _ => None,
        }
    }

    /// Wire-format name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "apiKey",
            Self::BaseUrl => "baseUrl",
            Self::Model => "model",
            Self::ProjectId => "projectId",
        }
    }

    /// Secret fields are encrypted at rest and masked on read
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::ApiKey)
    }
}

/// One field in a provider's configuration schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: FieldName,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: FieldName) -> Self {
        Self {
            name,
            required: true,
        }
    }

    pub fn optional(name: FieldName) -> Self {
        Self {
            name,
            required: false,
        }
    }
}

/// Whether a provider runs on the user's machine or in the cloud
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Local,
    Cloud,
}

/// Immutable catalog entry describing a provider kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub id: String,
    pub label: String,
    pub description: String,
    pub kind: ProviderKind,
    /// Ordered field schema; the config store rejects anything else
    pub fields: Vec<FieldSpec>,
    pub supports_model_discovery: bool,
    /// A descriptor with `enabled = false` is listed but never selectable
    pub enabled: bool,
    pub recommended: bool,
    /// Endpoint used when no base URL is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_base_url: Option<String>,
    /// Conventional environment variable that can supply the API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl ProviderDescriptor {
    /// Names of the fields this provider requires
    pub fn required_fields(&self) -> impl Iterator<Item = FieldName> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    /// Whether the field appears anywhere in this provider's schema
    pub fn has_field(&self, name: FieldName) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Read-only catalog of supported providers
pub struct ProviderCatalog {
    descriptors: Vec<ProviderDescriptor>,
}

impl ProviderCatalog {
    /// Create a catalog from a fixed descriptor list
    pub fn new(descriptors: Vec<ProviderDescriptor>) -> Self {
        Self { descriptors }
    }

    /// All descriptors, in catalog order
    pub fn list(&self) -> &[ProviderDescriptor] {
        &self.descriptors
    }

    /// Get a descriptor by id
    pub fn get(&self, id: &str) -> Result<&ProviderDescriptor, ProviderError> {
        self.descriptors
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| ProviderError::UnknownProvider(id.to_string()))
    }

    /// First descriptor that is currently offerable
    pub fn first_enabled(&self) -> Option<&ProviderDescriptor> {
        self.descriptors.iter().find(|d| d.enabled)
    }
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        Self::new(vec![
            ProviderDescriptor {
                id: "ollabridge".to_string(),
                label: "Your Computer (OllaBridge)".to_string(),
                description:
                    "Private, free, local AI via secure tunnel. Recommended for maximum privacy."
                        .to_string(),
                kind: ProviderKind::Local,
                fields: vec![
                    FieldSpec::required(FieldName::BaseUrl),
                    FieldSpec::required(FieldName::ApiKey),
                    FieldSpec::optional(FieldName::Model),
                ],
                supports_model_discovery: true,
                enabled: true,
                recommended: true,
                default_base_url: None,
                api_key_env: Some("OLLABRIDGE_API_KEY".to_string()),
            },
            ProviderDescriptor {
                id: "ollama".to_string(),
                label: "Ollama (Local)".to_string(),
                description: "Direct local Ollama server. Fast and private.".to_string(),
                kind: ProviderKind::Local,
                fields: vec![
                    FieldSpec::required(FieldName::BaseUrl),
                    FieldSpec::optional(FieldName::Model),
                ],
                supports_model_discovery: true,
                enabled: true,
                recommended: false,
                default_base_url: None,
                api_key_env: None,
            },
            ProviderDescriptor {
                id: "openai".to_string(),
                label: "OpenAI GPT-4".to_string(),
                description: "High reasoning capabilities. API Key required.".to_string(),
                kind: ProviderKind::Cloud,
                fields: vec![
                    FieldSpec::required(FieldName::ApiKey),
                    FieldSpec::optional(FieldName::Model),
                    FieldSpec::optional(FieldName::BaseUrl),
                ],
                supports_model_discovery: true,
                enabled: true,
                recommended: false,
                default_base_url: Some("https://api.openai.com".to_string()),
                api_key_env: Some("OPENAI_API_KEY".to_string()),
            },
            ProviderDescriptor {
                id: "claude".to_string(),
                label: "Anthropic Claude".to_string(),
                description: "Excellent for creative writing. API Key required.".to_string(),
                kind: ProviderKind::Cloud,
                fields: vec![
                    FieldSpec::required(FieldName::ApiKey),
                    FieldSpec::optional(FieldName::Model),
                    FieldSpec::optional(FieldName::BaseUrl),
                ],
                supports_model_discovery: true,
                enabled: true,
                recommended: false,
                default_base_url: Some("https://api.anthropic.com".to_string()),
                api_key_env: Some("ANTHROPIC_API_KEY".to_string()),
            },
            ProviderDescriptor {
                id: "gemini".to_string(),
                label: "Google Gemini".to_string(),
                description: "Fast and multimodal. API Key required.".to_string(),
                kind: ProviderKind::Cloud,
                fields: vec![
                    FieldSpec::required(FieldName::ApiKey),
                    FieldSpec::optional(FieldName::Model),
                ],
                // No public model-listing API; the static fallback list is used
                supports_model_discovery: false,
                enabled: true,
                recommended: false,
                default_base_url: Some("https://generativelanguage.googleapis.com".to_string()),
                api_key_env: Some("GEMINI_API_KEY".to_string()),
            },
            ProviderDescriptor {
                id: "watsonx".to_string(),
                label: "IBM watsonx".to_string(),
                description: "Enterprise grade security. API Key and Project ID required."
                    .to_string(),
                kind: ProviderKind::Cloud,
                fields: vec![
                    FieldSpec::required(FieldName::ApiKey),
                    FieldSpec::required(FieldName::ProjectId),
                    FieldSpec::optional(FieldName::Model),
                    FieldSpec::optional(FieldName::BaseUrl),
                ],
                supports_model_discovery: true,
                enabled: true,
                recommended: false,
                default_base_url: Some("https://us-south.ml.cloud.ibm.com".to_string()),
                api_key_env: Some("WATSONX_API_KEY".to_string()),
            },
            ProviderDescriptor {
                id: "azure-openai".to_string(),
                label: "Azure OpenAI".to_string(),
                description: "Coming soon. OpenAI models on Azure infrastructure.".to_string(),
                kind: ProviderKind::Cloud,
                fields: vec![
                    FieldSpec::required(FieldName::ApiKey),
                    FieldSpec::required(FieldName::BaseUrl),
                    FieldSpec::optional(FieldName::Model),
                ],
                supports_model_discovery: false,
                enabled: false,
                recommended: false,
                default_base_url: None,
                api_key_env: None,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_contents() {
        let catalog = ProviderCatalog::default();
        let ids: Vec<&str> = catalog.list().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "ollabridge",
                "ollama",
                "openai",
                "claude",
                "gemini",
                "watsonx",
                "azure-openai"
            ]
        );
    }

    #[test]
    fn test_get_unknown_provider() {
        let catalog = ProviderCatalog::default();
        let result = catalog.get("nonexistent");
        assert!(matches!(result, Err(ProviderError::UnknownProvider(_))));
    }

    #[test]
    fn test_coming_soon_entry_is_listed_but_disabled() {
        let catalog = ProviderCatalog::default();
        let azure = catalog.get("azure-openai").unwrap();
        assert!(!azure.enabled);
    }

    #[test]
    fn test_first_enabled() {
        let catalog = ProviderCatalog::default();
        assert_eq!(catalog.first_enabled().unwrap().id, "ollabridge");
    }

    #[test]
    fn test_required_fields() {
        let catalog = ProviderCatalog::default();
        let watsonx = catalog.get("watsonx").unwrap();
        let required: Vec<FieldName> = watsonx.required_fields().collect();
        assert_eq!(required, vec![FieldName::ApiKey, FieldName::ProjectId]);
    }

    #[test]
    fn test_field_name_wire_format() {
        assert_eq!(FieldName::parse("apiKey"), Some(FieldName::ApiKey));
        assert_eq!(FieldName::parse("projectId"), Some(FieldName::ProjectId));
        assert_eq!(FieldName::parse("api_key"), None);
        assert_eq!(FieldName::ApiKey.as_str(), "apiKey");
    }

    #[test]
    fn test_only_api_key_is_secret() {
        assert!(FieldName::ApiKey.is_secret());
        assert!(!FieldName::BaseUrl.is_secret());
        assert!(!FieldName::Model.is_secret());
        assert!(!FieldName::ProjectId.is_secret());
    }
}
