//! Configuration types.
//!
//! Settings are read from the environment with `from_env()` constructors.
//! The LLM settings are optional — when no API key is configured the
//! classifier is simply not wired up and the agent runs without it.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default chat model for the classifier.
const DEFAULT_MODEL: &str = "gpt-4o";

/// Default sampling temperature for the classifier.
const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default object-path prefix for flushed sender-label batches.
const DEFAULT_LABEL_PREFIX: &str = "sender_labels";

/// Built-in sender category set. Always extended with "Other" if a
/// custom list omits it.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Personal",
    "Work",
    "Shopping",
    "Finance",
    "Travel",
    "Health",
    "Education",
    "Entertainment",
    "Newsletters",
    "Events",
    "Utilities",
    "Other",
];

/// Settings for the LLM-backed email classifier.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// API key for the completion service.
    pub api_key: SecretString,
    /// Chat model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl LlmSettings {
    /// Build LLM settings from the environment.
    ///
    /// Returns `Ok(None)` when `OPENAI_API_KEY` is unset — the classifier
    /// is disabled in that case rather than misconfigured.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(api_key) = std::env::var("OPENAI_API_KEY") else {
            return Ok(None);
        };

        let model =
            std::env::var("INBOX_ASSIST_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let temperature = match std::env::var("INBOX_ASSIST_LLM_TEMPERATURE") {
            Ok(raw) => parse_temperature(&raw)?,
            Err(_) => DEFAULT_TEMPERATURE,
        };

        Ok(Some(Self {
            api_key: SecretString::from(api_key),
            model,
            temperature,
        }))
    }
}

/// Settings for the sender-categorization label buffer.
#[derive(Debug, Clone)]
pub struct LabelSettings {
    /// Object-path prefix for flushed batches.
    pub prefix: String,
    /// Secret used to HMAC user ids before they leave the process.
    /// Empty disables hashing (events carry an empty hash).
    pub user_hash_secret: String,
    /// Category list offered to the classifier and accepted from callers.
    pub categories: Vec<String>,
}

impl LabelSettings {
    /// Build label settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let prefix = std::env::var("INBOX_ASSIST_LABEL_PREFIX")
            .unwrap_or_else(|_| DEFAULT_LABEL_PREFIX.to_string());
        let user_hash_secret =
            std::env::var("INBOX_ASSIST_LABEL_HASH_SECRET").unwrap_or_default();
        let categories = std::env::var("INBOX_ASSIST_CATEGORIES")
            .map(|raw| split_csv(&raw))
            .ok()
            .filter(|list| !list.is_empty())
            .unwrap_or_else(default_categories);

        Self {
            prefix,
            user_hash_secret,
            categories,
        }
    }
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_LABEL_PREFIX.to_string(),
            user_hash_secret: String::new(),
            categories: default_categories(),
        }
    }
}

/// The built-in category list as owned strings.
pub fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

/// Split a comma-separated env value into trimmed, non-empty entries.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn parse_temperature(raw: &str) -> Result<f32, ConfigError> {
    raw.trim()
        .parse::<f32>()
        .map_err(|_| ConfigError::InvalidValue {
            key: "INBOX_ASSIST_LLM_TEMPERATURE".to_string(),
            message: format!("expected a float, got '{raw}'"),
        })
}
