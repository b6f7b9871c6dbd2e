//! Anthropic Provider Implementation
//!
//! Rewrite-style correction via the Anthropic Messages API. The model is
//! prompted to return a JSON correction report for a batch of cue texts;
//! the report is normalized into span edits at this boundary. When the
//! model reports a change without a locatable source span, the whole cue
//! text becomes a single edit span with the rewrite as the sole candidate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BatchItem, BatchResult, ProviderConfig, SuggestionProvider};
use crate::document::Edit;
use crate::error::{CoreError, CoreResult};
use crate::types::Span;

// =============================================================================
// Anthropic Provider
// =============================================================================

/// Anthropic API provider for Claude models
pub struct AnthropicProvider {
    /// API key
    api_key: String,
    /// Base URL for API requests
    base_url: String,
    /// Model to use
    model: String,
    /// HTTP client
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Default Anthropic API base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";

    /// API version header
    pub const API_VERSION: &'static str = "2023-06-01";

    /// Number of cue texts sent per request
    pub const BATCH_SIZE: usize = 10;

    /// Creates a new Anthropic provider
    pub fn new(config: ProviderConfig) -> CoreResult<Self> {
        let api_key = config.api_key.ok_or_else(|| {
            CoreError::ValidationError("Anthropic API key is required".to_string())
        })?;

        if api_key.is_empty() {
            return Err(CoreError::ValidationError(
                "Anthropic API key cannot be empty".to_string(),
            ));
        }

        let base_url = config
            .base_url
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());
        let model = config
            .model
            .unwrap_or_else(|| "claude-sonnet-4-5-20251015".to_string());
        let timeout_secs = config.timeout_secs.unwrap_or(60);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url,
            model,
            client,
        })
    }
}

// =============================================================================
// Prompt
// =============================================================================

const LECTOR_PROMPT: &str = r#"Du bist ein professioneller deutscher Lektor. Prüfe die folgenden Untertiteltexte auf:
1. Rechtschreibfehler
2. Grammatikfehler
3. Kommasetzung
4. Punktsetzung
5. Groß-/Kleinschreibung

Behalte den ursprünglichen Stil und Zeilenumbrüche bei.

Antworte NUR mit einem JSON-Objekt in diesem Format:
{
  "corrections": [
    {
      "id": 1,
      "hasErrors": true,
      "corrected": "Der korrigierte Text",
      "changes": [
        {"from": "fehler", "to": "richtig", "reason": "Rechtschreibung"}
      ]
    }
  ]
}

Wenn ein Text keine Fehler hat, setze "hasErrors" auf false.

Texte:
"#;

fn build_prompt(items: &[BatchItem]) -> String {
    #[derive(Serialize)]
    struct PromptItem<'a> {
        id: usize,
        text: &'a str,
    }

    let texts: Vec<PromptItem> = items
        .iter()
        .map(|item| PromptItem {
            id: item.id,
            text: &item.text,
        })
        .collect();

    // A serialization failure here is impossible for plain strings.
    let json = serde_json::to_string_pretty(&texts).unwrap_or_default();
    format!("{}{}", LECTOR_PROMPT, json)
}

// =============================================================================
// Anthropic API Types
// =============================================================================

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// =============================================================================
// Correction Report Types
// =============================================================================

#[derive(Deserialize)]
struct CorrectionReport {
    #[serde(default)]
    corrections: Vec<CorrectionEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorrectionEntry {
    id: usize,
    #[serde(default)]
    has_errors: bool,
    #[serde(default)]
    corrected: String,
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Deserialize)]
struct Change {
    from: String,
    to: String,
    #[serde(default)]
    reason: String,
}

// =============================================================================
// Normalization
// =============================================================================

/// Extracts the JSON object from a model response that may wrap it in
/// markdown code fences or surrounding prose.
fn extract_json(text: &str) -> &str {
    if text.contains("```json") {
        text.split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(text)
    } else if text.contains("```") {
        text.split("```")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(text)
    } else {
        // Fall back to the outermost brace pair.
        match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if end > start => &text[start..=end],
            _ => text,
        }
    }
}

/// Converts one correction entry into edits against the original text.
fn normalize_entry(text: &str, entry: &CorrectionEntry) -> Vec<Edit> {
    if !entry.has_errors {
        return vec![];
    }

    let mut edits: Vec<Edit> = entry
        .changes
        .iter()
        .filter_map(|change| locate_change(text, change))
        .collect();

    // No locatable spans: treat the rewrite as one whole-text edit.
    if edits.is_empty() && !entry.corrected.is_empty() && entry.corrected != text {
        let char_len = text.chars().count();
        edits.push(Edit::new(
            Span::new(0, char_len),
            text,
            vec![entry.corrected.clone()],
            "Korrektur",
        ));
    }

    edits
}

/// Finds the change's source text in the cue and builds a span edit.
fn locate_change(text: &str, change: &Change) -> Option<Edit> {
    if change.from.is_empty() {
        return None;
    }
    let byte_offset = text.find(&change.from)?;
    let char_offset = text[..byte_offset].chars().count();
    let char_length = change.from.chars().count();

    let reason = if change.reason.is_empty() {
        "Korrektur"
    } else {
        &change.reason
    };

    Some(Edit::new(
        Span::new(char_offset, char_length),
        &change.from,
        vec![change.to.clone()],
        reason,
    ))
}

// =============================================================================
// SuggestionProvider Implementation
// =============================================================================

#[async_trait]
impl SuggestionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn check(&self, text: &str) -> CoreResult<Vec<Edit>> {
        let items = vec![BatchItem {
            id: 0,
            text: text.to_string(),
        }];
        let mut results = self.check_batch(&items).await?;
        Ok(results.pop().map(|r| r.edits).unwrap_or_default())
    }

    async fn check_batch(&self, items: &[BatchItem]) -> CoreResult<Vec<BatchResult>> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            messages: vec![Message {
                role: "user".to_string(),
                content: build_prompt(items),
            }],
        };

        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::ProviderUnavailable(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            CoreError::ProviderUnavailable(format!("Failed to read response: {}", e))
        })?;

        if status.as_u16() == 429 {
            return Err(CoreError::ProviderRateLimited(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(CoreError::ProviderUnavailable(format!(
                "Anthropic API error ({}): {}",
                status, message
            )));
        }

        let api_response: MessagesResponse = serde_json::from_str(&body).map_err(|e| {
            CoreError::ProviderResponseUnparseable(format!("Invalid messages response: {}", e))
        })?;

        let content = api_response
            .content
            .iter()
            .filter_map(|block| {
                if block.content_type == "text" {
                    block.text.clone()
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        let report: CorrectionReport =
            serde_json::from_str(extract_json(&content).trim()).map_err(|e| {
                CoreError::ProviderResponseUnparseable(format!("Invalid correction report: {}", e))
            })?;

        debug!(entries = report.corrections.len(), "Anthropic batch finished");

        // Every requested item gets a result; entries the model skipped or
        // marked error-free come back empty.
        let results = items
            .iter()
            .map(|item| {
                let edits = report
                    .corrections
                    .iter()
                    .find(|entry| entry.id == item.id)
                    .map(|entry| normalize_entry(&item.text, entry))
                    .unwrap_or_default();
                BatchResult { id: item.id, edits }
            })
            .collect();

        Ok(results)
    }

    fn batch_size(&self) -> usize {
        Self::BATCH_SIZE
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = AnthropicProvider::new(ProviderConfig::anthropic("test-key")).unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.batch_size(), AnthropicProvider::BATCH_SIZE);
        assert!(provider.is_available());
    }

    #[test]
    fn test_provider_requires_key() {
        let mut config = ProviderConfig::anthropic("");
        assert!(AnthropicProvider::new(config.clone()).is_err());

        config.api_key = None;
        assert!(AnthropicProvider::new(config).is_err());
    }

    #[test]
    fn test_provider_custom_model() {
        let config = ProviderConfig::anthropic("key").with_model("claude-haiku-4-5-20251015");
        let provider = AnthropicProvider::new(config).unwrap();
        assert_eq!(provider.model, "claude-haiku-4-5-20251015");
    }

    #[test]
    fn test_build_prompt_includes_texts() {
        let items = vec![BatchItem {
            id: 2,
            text: "Der Hund laueft".to_string(),
        }];
        let prompt = build_prompt(&items);
        assert!(prompt.contains("Lektor"));
        assert!(prompt.contains("Der Hund laueft"));
        assert!(prompt.contains("\"id\": 2"));
    }

    // -------------------------------------------------------------------------
    // JSON Extraction Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_json_plain() {
        assert_eq!(extract_json(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_json_code_fence() {
        let fenced = "Hier ist das Ergebnis:\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(fenced).trim(), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_json_surrounding_prose() {
        let prose = "Das Ergebnis: {\"a\": 1} und fertig.";
        assert_eq!(extract_json(prose), r#"{"a": 1}"#);
    }

    // -------------------------------------------------------------------------
    // Normalization Tests
    // -------------------------------------------------------------------------

    fn entry(has_errors: bool, corrected: &str, changes: Vec<Change>) -> CorrectionEntry {
        CorrectionEntry {
            id: 0,
            has_errors,
            corrected: corrected.to_string(),
            changes,
        }
    }

    fn change(from: &str, to: &str) -> Change {
        Change {
            from: from.to_string(),
            to: to.to_string(),
            reason: "Rechtschreibung".to_string(),
        }
    }

    #[test]
    fn test_normalize_no_errors_is_empty() {
        let edits = normalize_entry("Alles gut", &entry(false, "Alles gut", vec![]));
        assert!(edits.is_empty());
    }

    #[test]
    fn test_normalize_locates_change_span() {
        let text = "Der Hund laueft";
        let edits = normalize_entry(
            text,
            &entry(true, "Der Hund läuft", vec![change("laueft", "läuft")]),
        );

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].span, Span::new(9, 6));
        assert_eq!(edits[0].matched_text, "laueft");
        assert_eq!(edits[0].candidates, vec!["läuft"]);
        assert_eq!(edits[0].reason, "Rechtschreibung");
    }

    #[test]
    fn test_normalize_char_offsets_with_multibyte_prefix() {
        let text = "Schön wärs gewesen";
        let edits = normalize_entry(
            text,
            &entry(true, "Schön wär's gewesen", vec![change("wärs", "wär's")]),
        );
        assert_eq!(edits[0].span, Span::new(6, 4));
    }

    #[test]
    fn test_normalize_unlocatable_change_falls_back_to_rewrite() {
        let text = "Der Hund laueft";
        let edits = normalize_entry(
            text,
            &entry(true, "Der Hund läuft", vec![change("nicht da", "x")]),
        );

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].span, Span::new(0, text.chars().count()));
        assert_eq!(edits[0].candidates, vec!["Der Hund läuft"]);
    }

    #[test]
    fn test_normalize_rewrite_without_changes() {
        let text = "alles klein";
        let edits = normalize_entry(text, &entry(true, "Alles klein", vec![]));

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].span, Span::new(0, 11));
        assert_eq!(edits[0].matched_text, "alles klein");
    }

    #[test]
    fn test_report_parsing_tolerates_missing_fields() {
        let report: CorrectionReport = serde_json::from_str(r#"{"corrections":[{"id":3}]}"#).unwrap();
        assert_eq!(report.corrections.len(), 1);
        assert!(!report.corrections[0].has_errors);
    }
}
