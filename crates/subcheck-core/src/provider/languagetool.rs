//! LanguageTool Provider Implementation
//!
//! Rule-based grammar service. Returns explicit offset/length matches with
//! ranked replacement candidates, which map directly onto the internal
//! edit model.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ProviderConfig, SuggestionProvider};
use crate::document::Edit;
use crate::error::{CoreError, CoreResult};
use crate::types::Span;

// =============================================================================
// LanguageTool Provider
// =============================================================================

/// LanguageTool HTTP API provider
pub struct LanguageToolProvider {
    /// Check endpoint URL
    check_url: String,
    /// Language code sent with every request (e.g. "de-DE")
    language: String,
    /// HTTP client
    client: reqwest::Client,
}

impl LanguageToolProvider {
    /// Default public API endpoint
    pub const DEFAULT_BASE_URL: &'static str = "https://api.languagetool.org";

    /// Rule categories enabled for subtitle checking
    pub const ENABLED_CATEGORIES: &'static str =
        "PUNCTUATION,TYPOGRAPHY,CASING,GRAMMAR,TYPOS,STYLE";

    /// Maximum number of replacement candidates kept per match
    pub const MAX_CANDIDATES: usize = 5;

    /// Creates a new LanguageTool provider
    pub fn new(config: ProviderConfig) -> CoreResult<Self> {
        let base_url = config
            .base_url
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());
        let language = config.language.unwrap_or_else(|| "de-DE".to_string());
        let timeout_secs = config.timeout_secs.unwrap_or(30);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            check_url: format!("{}/v2/check", base_url.trim_end_matches('/')),
            language,
            client,
        })
    }
}

// =============================================================================
// LanguageTool API Types
// =============================================================================

#[derive(Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Deserialize)]
struct Match {
    offset: usize,
    length: usize,
    #[serde(default)]
    message: String,
    #[serde(default)]
    replacements: Vec<Replacement>,
    rule: Option<Rule>,
}

#[derive(Deserialize)]
struct Replacement {
    value: String,
}

#[derive(Deserialize)]
struct Rule {
    #[serde(default)]
    description: String,
}

// =============================================================================
// Normalization
// =============================================================================

/// Maps a UTF-16 code unit offset onto an index into `chars`.
fn utf16_to_char_index(chars: &[char], utf16_offset: usize) -> usize {
    let mut units = 0;
    for (index, c) in chars.iter().enumerate() {
        if units >= utf16_offset {
            return index;
        }
        units += c.len_utf16();
    }
    chars.len()
}

/// Converts API matches into internal edits against `text`.
///
/// The API reports offsets and lengths in UTF-16 code units; they are
/// converted to character positions here so downstream splicing stays
/// correct for text with astral characters. Matches without replacements
/// are dropped (nothing to offer the user). Candidate lists are capped at
/// [`LanguageToolProvider::MAX_CANDIDATES`].
fn normalize_matches(text: &str, matches: Vec<Match>) -> Vec<Edit> {
    let chars: Vec<char> = text.chars().collect();

    matches
        .into_iter()
        .filter(|m| !m.replacements.is_empty())
        .map(|m| {
            let start = utf16_to_char_index(&chars, m.offset);
            let end = utf16_to_char_index(&chars, m.offset + m.length).max(start);
            let span = Span::new(start, end - start);
            let matched_text: String = chars[start..end].iter().collect();
            let candidates: Vec<String> = m
                .replacements
                .into_iter()
                .take(LanguageToolProvider::MAX_CANDIDATES)
                .map(|r| r.value)
                .collect();
            let reason = if m.message.is_empty() {
                m.rule.map(|r| r.description).unwrap_or_default()
            } else {
                m.message
            };
            Edit::new(span, &matched_text, candidates, &reason)
        })
        .collect()
}

// =============================================================================
// SuggestionProvider Implementation
// =============================================================================

#[async_trait]
impl SuggestionProvider for LanguageToolProvider {
    fn name(&self) -> &str {
        "languagetool"
    }

    async fn check(&self, text: &str) -> CoreResult<Vec<Edit>> {
        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        let params = [
            ("text", text),
            ("language", self.language.as_str()),
            ("enabledOnly", "false"),
            ("enabledCategories", Self::ENABLED_CATEGORIES),
        ];

        let response = self
            .client
            .post(&self.check_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| CoreError::ProviderUnavailable(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CoreError::ProviderRateLimited(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(CoreError::ProviderUnavailable(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CoreError::ProviderUnavailable(format!("Failed to read response: {}", e)))?;

        let parsed: CheckResponse = serde_json::from_str(&body).map_err(|e| {
            CoreError::ProviderResponseUnparseable(format!("Invalid check response: {}", e))
        })?;

        let edits = normalize_matches(text, parsed.matches);
        debug!(matches = edits.len(), "LanguageTool check finished");
        Ok(edits)
    }

    fn is_available(&self) -> bool {
        // The public endpoint needs no credentials.
        true
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_match(offset: usize, length: usize, replacements: &[&str]) -> Match {
        Match {
            offset,
            length,
            message: "Möglicher Tippfehler".to_string(),
            replacements: replacements
                .iter()
                .map(|r| Replacement {
                    value: r.to_string(),
                })
                .collect(),
            rule: Some(Rule {
                description: "Rechtschreibprüfung".to_string(),
            }),
        }
    }

    #[test]
    fn test_provider_creation_defaults() {
        let provider = LanguageToolProvider::new(ProviderConfig::languagetool()).unwrap();
        assert_eq!(provider.name(), "languagetool");
        assert_eq!(provider.language, "de-DE");
        assert!(provider.check_url.ends_with("/v2/check"));
        assert!(provider.is_available());
    }

    #[test]
    fn test_provider_custom_base_url() {
        let config = ProviderConfig::languagetool().with_base_url("http://localhost:8010/");
        let provider = LanguageToolProvider::new(config).unwrap();
        assert_eq!(provider.check_url, "http://localhost:8010/v2/check");
    }

    #[test]
    fn test_normalize_basic_match() {
        let text = "Der Hund laueft";
        let edits = normalize_matches(text, vec![sample_match(9, 6, &["läuft", "lief"])]);

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].span, Span::new(9, 6));
        assert_eq!(edits[0].matched_text, "laueft");
        assert_eq!(edits[0].candidates, vec!["läuft", "lief"]);
        assert_eq!(edits[0].chosen_index, 0);
        assert_eq!(edits[0].reason, "Möglicher Tippfehler");
    }

    #[test]
    fn test_normalize_converts_utf16_offsets() {
        // "😀" is one char but two UTF-16 code units; the API counts
        // units, so "laueft" starts at unit 3 but char 2.
        let text = "😀 laueft";
        let edits = normalize_matches(text, vec![sample_match(3, 6, &["läuft"])]);

        assert_eq!(edits[0].span, Span::new(2, 6));
        assert_eq!(edits[0].matched_text, "laueft");
    }

    #[test]
    fn test_normalize_drops_matches_without_replacements() {
        let edits = normalize_matches("text", vec![sample_match(0, 4, &[])]);
        assert!(edits.is_empty());
    }

    #[test]
    fn test_normalize_caps_candidates() {
        let edits = normalize_matches(
            "text",
            vec![sample_match(0, 4, &["a", "b", "c", "d", "e", "f", "g"])],
        );
        assert_eq!(edits[0].candidates.len(), LanguageToolProvider::MAX_CANDIDATES);
    }

    #[test]
    fn test_normalize_falls_back_to_rule_description() {
        let mut m = sample_match(0, 4, &["Text"]);
        m.message = String::new();
        let edits = normalize_matches("text", vec![m]);
        assert_eq!(edits[0].reason, "Rechtschreibprüfung");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "matches": [
                {
                    "offset": 4,
                    "length": 3,
                    "message": "Fehler",
                    "replacements": [{"value": "der"}],
                    "rule": {"description": "Kasus"}
                }
            ]
        }"#;
        let parsed: CheckResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.matches.len(), 1);
        assert_eq!(parsed.matches[0].offset, 4);
    }

    #[test]
    fn test_response_parsing_tolerates_missing_fields() {
        let parsed: CheckResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.matches.is_empty());
    }
}
