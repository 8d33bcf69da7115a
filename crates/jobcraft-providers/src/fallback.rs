//! Static model lists used when live discovery is unavailable

/// Known-good models for a provider, used when discovery is unsupported
/// or a live fetch fails
pub fn default_models(provider_id: &str) -> &'static [&'static str] {
    match provider_id {
        "ollabridge" | "ollama" => &["llama3.1:8b", "llama3.2:3b", "mistral:7b", "qwen2.5:7b"],
        "openai" => &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"],
        "claude" => &[
            "claude-3-5-sonnet-20241022",
            "claude-3-5-haiku-20241022",
            "claude-3-opus-20240229",
        ],
        "gemini" => &["gemini-1.5-pro", "gemini-1.5-flash", "gemini-1.0-pro"],
        "watsonx" => &[
            "ibm/granite-3-8b-instruct",
            "meta-llama/llama-3-1-8b-instruct",
            "mistralai/mistral-large",
        ],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProviderCatalog;

    #[test]
    fn test_every_enabled_provider_has_defaults() {
        let catalog = ProviderCatalog::default();
        for descriptor in catalog.list().iter().filter(|d| d.enabled) {
            assert!(
                !default_models(&descriptor.id).is_empty(),
                "no default models for {}",
                descriptor.id
            );
        }
    }

    #[test]
    fn test_unknown_provider_has_no_defaults() {
        assert!(default_models("nonexistent").is_empty());
    }
}
