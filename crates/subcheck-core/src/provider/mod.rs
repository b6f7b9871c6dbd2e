//! Suggestion Providers
//!
//! Defines the collaborator boundary to external grammar/spelling
//! services and the configuration/factory types for constructing them.
//! Providers normalize their wire formats into the internal [`Edit`]
//! model at this boundary; the reconciler and the correction session
//! never branch on provider identity.

mod anthropic;
mod languagetool;

pub use anthropic::AnthropicProvider;
pub use languagetool::LanguageToolProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::Edit;
use crate::error::{CoreError, CoreResult};

// =============================================================================
// Suggestion Provider Trait
// =============================================================================

/// One item of a batched check request
#[derive(Clone, Debug)]
pub struct BatchItem {
    /// Caller-chosen id, echoed back in the result (document position)
    pub id: usize,
    /// Text to check
    pub text: String,
}

/// Normalized result for one batch item
#[derive(Clone, Debug)]
pub struct BatchResult {
    /// Id of the originating item
    pub id: usize,
    /// Suggested edits; empty when the text has no errors
    pub edits: Vec<Edit>,
}

/// Trait for external correction services (LanguageTool, Claude, etc.)
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Returns the provider name
    fn name(&self) -> &str;

    /// Checks one text and returns normalized edits
    async fn check(&self, text: &str) -> CoreResult<Vec<Edit>>;

    /// Checks a group of texts.
    ///
    /// The default implementation calls [`check`](Self::check)
    /// sequentially; batch-capable providers override this.
    async fn check_batch(&self, items: &[BatchItem]) -> CoreResult<Vec<BatchResult>> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let edits = self.check(&item.text).await?;
            results.push(BatchResult { id: item.id, edits });
        }
        Ok(results)
    }

    /// Preferred group size for a pass; 1 selects the paced per-cue path
    fn batch_size(&self) -> usize {
        1
    }

    /// Checks if the provider is configured and usable
    fn is_available(&self) -> bool;
}

// =============================================================================
// Provider Configuration
// =============================================================================

/// Supported provider types
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// LanguageTool rule-based grammar service
    #[default]
    LanguageTool,
    /// Anthropic Claude rewrite-style correction
    Anthropic,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::LanguageTool => write!(f, "languagetool"),
            ProviderType::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "languagetool" => Ok(ProviderType::LanguageTool),
            "anthropic" | "claude" => Ok(ProviderType::Anthropic),
            _ => Err(format!("Unknown provider type: {}", s)),
        }
    }
}

/// Configuration for creating a provider
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// Provider type
    pub provider_type: ProviderType,
    /// API key (for the Anthropic provider)
    pub api_key: Option<String>,
    /// Base URL override (custom or self-hosted endpoints)
    pub base_url: Option<String>,
    /// Model to use (Anthropic only)
    pub model: Option<String>,
    /// Language to check against (LanguageTool only)
    pub language: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// Creates a LanguageTool provider config
    pub fn languagetool() -> Self {
        Self {
            provider_type: ProviderType::LanguageTool,
            api_key: None,
            base_url: None,
            model: None,
            language: Some("de-DE".to_string()),
            timeout_secs: Some(30),
        }
    }

    /// Creates an Anthropic provider config
    pub fn anthropic(api_key: &str) -> Self {
        Self {
            provider_type: ProviderType::Anthropic,
            api_key: Some(api_key.to_string()),
            base_url: None,
            model: Some("claude-sonnet-4-5-20251015".to_string()),
            language: None,
            timeout_secs: Some(60),
        }
    }

    /// Sets the model
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    /// Sets the language
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    /// Sets the base URL
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }
}

// =============================================================================
// Provider Factory
// =============================================================================

/// Creates a suggestion provider from configuration
pub fn create_provider(config: ProviderConfig) -> CoreResult<Box<dyn SuggestionProvider>> {
    match config.provider_type {
        ProviderType::LanguageTool => {
            let provider = LanguageToolProvider::new(config)?;
            Ok(Box::new(provider))
        }
        ProviderType::Anthropic => {
            let provider = AnthropicProvider::new(config)?;
            Ok(Box::new(provider))
        }
    }
}

// =============================================================================
// Mock Provider (for testing)
// =============================================================================

/// Scripted provider for session and pass tests.
#[derive(Default)]
pub struct MockProvider {
    available: bool,
    batch_size: usize,
    edits: std::collections::HashMap<String, Vec<Edit>>,
    failures: std::collections::HashSet<String>,
    unparseable: std::collections::HashSet<String>,
    rate_limit_once: std::sync::Mutex<std::collections::HashSet<String>>,
}

impl MockProvider {
    /// Creates an available mock with no scripted responses
    pub fn new() -> Self {
        Self {
            available: true,
            batch_size: 1,
            ..Default::default()
        }
    }

    /// Scripts edits returned for an exact input text
    pub fn with_edits(mut self, text: &str, edits: Vec<Edit>) -> Self {
        self.edits.insert(text.to_string(), edits);
        self
    }

    /// Scripts a permanent failure for an exact input text
    pub fn with_failure(mut self, text: &str) -> Self {
        self.failures.insert(text.to_string());
        self
    }

    /// Scripts an unparseable response for an exact input text
    pub fn with_unparseable(mut self, text: &str) -> Self {
        self.unparseable.insert(text.to_string());
        self
    }

    /// Scripts a single rate-limit failure; subsequent calls succeed
    pub fn with_rate_limit_once(self, text: &str) -> Self {
        self.rate_limit_once
            .lock()
            .expect("mock lock")
            .insert(text.to_string());
        self
    }

    /// Sets availability
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Sets the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

#[async_trait]
impl SuggestionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check(&self, text: &str) -> CoreResult<Vec<Edit>> {
        if !self.available {
            return Err(CoreError::ProviderUnavailable("mock".to_string()));
        }
        if self.rate_limit_once.lock().expect("mock lock").remove(text) {
            return Err(CoreError::ProviderRateLimited("mock".to_string()));
        }
        if self.failures.contains(text) {
            return Err(CoreError::ProviderUnavailable("scripted failure".to_string()));
        }
        if self.unparseable.contains(text) {
            return Err(CoreError::ProviderResponseUnparseable(
                "scripted garbage".to_string(),
            ));
        }
        Ok(self.edits.get(text).cloned().unwrap_or_default())
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Span;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(
            "languagetool".parse::<ProviderType>().unwrap(),
            ProviderType::LanguageTool
        );
        assert_eq!(
            "anthropic".parse::<ProviderType>().unwrap(),
            ProviderType::Anthropic
        );
        assert_eq!(
            "claude".parse::<ProviderType>().unwrap(),
            ProviderType::Anthropic
        );
        assert!("unknown".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_provider_type_display() {
        assert_eq!(ProviderType::LanguageTool.to_string(), "languagetool");
        assert_eq!(ProviderType::Anthropic.to_string(), "anthropic");
    }

    #[test]
    fn test_config_builders() {
        let lt = ProviderConfig::languagetool().with_language("en-US");
        assert_eq!(lt.provider_type, ProviderType::LanguageTool);
        assert_eq!(lt.language, Some("en-US".to_string()));

        let claude = ProviderConfig::anthropic("key").with_model("claude-haiku-4-5-20251015");
        assert_eq!(claude.provider_type, ProviderType::Anthropic);
        assert_eq!(claude.api_key, Some("key".to_string()));
        assert_eq!(claude.model, Some("claude-haiku-4-5-20251015".to_string()));
    }

    #[test]
    fn test_factory_creates_both_providers() {
        assert!(create_provider(ProviderConfig::languagetool()).is_ok());
        assert!(create_provider(ProviderConfig::anthropic("key")).is_ok());
    }

    #[test]
    fn test_factory_rejects_anthropic_without_key() {
        let config = ProviderConfig {
            provider_type: ProviderType::Anthropic,
            api_key: None,
            base_url: None,
            model: None,
            language: None,
            timeout_secs: None,
        };
        assert!(create_provider(config).is_err());
    }

    #[tokio::test]
    async fn test_mock_scripted_edits() {
        let edit = Edit::new(Span::new(0, 3), "foo", vec!["bar".to_string()], "Test");
        let provider = MockProvider::new().with_edits("foo!", vec![edit.clone()]);

        assert_eq!(provider.check("foo!").await.unwrap(), vec![edit]);
        assert!(provider.check("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_rate_limit_once() {
        let provider = MockProvider::new().with_rate_limit_once("text");

        assert!(matches!(
            provider.check("text").await,
            Err(CoreError::ProviderRateLimited(_))
        ));
        assert!(provider.check("text").await.is_ok());
    }

    #[tokio::test]
    async fn test_default_check_batch_maps_ids() {
        let edit = Edit::new(Span::new(0, 1), "a", vec!["b".to_string()], "Test");
        let provider = MockProvider::new().with_edits("a", vec![edit]);

        let items = vec![
            BatchItem {
                id: 4,
                text: "a".to_string(),
            },
            BatchItem {
                id: 9,
                text: "z".to_string(),
            },
        ];
        let results = provider.check_batch(&items).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 4);
        assert_eq!(results[0].edits.len(), 1);
        assert_eq!(results[1].id, 9);
        assert!(results[1].edits.is_empty());
    }
}
