//! Settings Persistence
//!
//! Persistent tool settings with atomic file writes (temp file + rename)
//! and an advisory lock against concurrent writers.
//!
//! Storage location: {config_dir}/subcheck/settings.json
//!
//! The core never reads credentials ad hoc: [`AppSettings::provider_config`]
//! is the single place a configured provider is derived from.

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CoreError, CoreResult};
use crate::provider::{ProviderConfig, ProviderType};

/// Settings schema version
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Lock file name (advisory lock to prevent concurrent writers)
pub const SETTINGS_LOCK_FILE: &str = "settings.json.lock";

// =============================================================================
// App Settings
// =============================================================================

/// Persisted tool settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Schema version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Selected correction provider
    #[serde(default)]
    pub provider: ProviderType,

    /// Language code for rule-based checking (e.g. "de-DE")
    #[serde(default = "default_language")]
    pub language: String,

    /// Anthropic API key
    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    /// Anthropic model override
    #[serde(default)]
    pub anthropic_model: Option<String>,

    /// Delay between sequential provider calls, in milliseconds
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Backoff before the single rate-limit retry, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_language() -> String {
    "de-DE".to_string()
}

fn default_pacing_ms() -> u64 {
    100
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            provider: ProviderType::default(),
            language: default_language(),
            anthropic_api_key: None,
            anthropic_model: None,
            pacing_ms: default_pacing_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl AppSettings {
    /// Clamps values to sane ranges
    pub fn normalize(&mut self) {
        if self.language.trim().is_empty() {
            self.language = default_language();
        }
        // Keep pacing within one request per 10s; anything longer is a
        // misconfiguration, not throttling.
        self.pacing_ms = self.pacing_ms.min(10_000);
        self.retry_backoff_ms = self.retry_backoff_ms.clamp(100, 60_000);
    }

    /// Builds the provider configuration for the selected provider
    pub fn provider_config(&self) -> CoreResult<ProviderConfig> {
        match self.provider {
            ProviderType::LanguageTool => {
                Ok(ProviderConfig::languagetool().with_language(&self.language))
            }
            ProviderType::Anthropic => {
                let api_key = self.anthropic_api_key.as_deref().ok_or_else(|| {
                    CoreError::ValidationError(
                        "Anthropic provider selected but no API key configured".to_string(),
                    )
                })?;
                let mut config = ProviderConfig::anthropic(api_key);
                if let Some(model) = &self.anthropic_model {
                    config = config.with_model(model);
                }
                Ok(config)
            }
        }
    }
}

// =============================================================================
// Settings Manager
// =============================================================================

/// Loads, saves, and resets settings on disk
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Creates a manager rooted at the given config directory
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            settings_path: config_dir.join(SETTINGS_FILE),
        }
    }

    /// Default per-user config directory
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("subcheck")
    }

    /// Returns the settings file path
    pub fn settings_path(&self) -> &PathBuf {
        &self.settings_path
    }

    fn lock_path(&self) -> PathBuf {
        self.settings_path
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join(SETTINGS_LOCK_FILE)
    }

    fn with_lock<T>(&self, exclusive: bool, op: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;

        if exclusive {
            fs2::FileExt::lock_exclusive(&lock_file)?;
        } else {
            fs2::FileExt::lock_shared(&lock_file)?;
        }

        let result = op();

        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            warn!("Failed to unlock settings lock file: {}", e);
        }

        result
    }

    /// Loads settings from disk, returning defaults if the file is missing
    /// or corrupt
    pub fn load(&self) -> AppSettings {
        let result = self.with_lock(false, || {
            if !self.settings_path.exists() {
                info!("Settings file not found, using defaults");
                return Ok(AppSettings::default());
            }

            let content = fs::read_to_string(&self.settings_path)?;
            let mut settings: AppSettings = serde_json::from_str(&content)?;

            if settings.version < SETTINGS_VERSION {
                info!(
                    "Upgrading settings from version {} to {}",
                    settings.version, SETTINGS_VERSION
                );
                settings.version = SETTINGS_VERSION;
            }

            settings.normalize();
            Ok(settings)
        });

        match result {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                AppSettings::default()
            }
        }
    }

    /// Saves settings to disk using atomic write (temp file + rename)
    pub fn save(&self, settings: &AppSettings) -> CoreResult<AppSettings> {
        self.with_lock(true, || {
            let mut normalized = settings.clone();
            normalized.normalize();

            let content = serde_json::to_string_pretty(&normalized)?;

            // std::fs::rename does not overwrite on Windows.
            let temp_path = self.settings_path.with_extension("json.tmp");
            if temp_path.exists() {
                let _ = fs::remove_file(&temp_path);
            }

            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;

            if cfg!(windows) && self.settings_path.exists() {
                let _ = fs::remove_file(&self.settings_path);
            }
            fs::rename(&temp_path, &self.settings_path)?;

            info!("Settings saved to {}", self.settings_path.display());
            Ok(normalized)
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
