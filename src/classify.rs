//! LLM-backed email categorization.
//!
//! Best-effort enrichment: one completion call constrained to a JSON
//! object, strictly post-validated. A malformed response yields `None`
//! rather than an error (with a logged diagnostic) — only transport and
//! HTTP failures surface as `LlmError`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agent::types::EmailEnvelope;
use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// Temperature for categorization (deterministic-ish).
const CATEGORIZE_TEMPERATURE: f32 = 0.2;

/// Max tokens for the categorization call (runs on every opted-in email).
const CATEGORIZE_MAX_TOKENS: u32 = 256;

/// A validated categorization suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categorization {
    pub category: String,
    /// Clamped to [0, 1].
    pub confidence: f32,
    pub rationale: String,
}

/// Categorize one email against a fixed category list.
///
/// Returns `Ok(None)` when there is nothing to classify (empty email and
/// summary) or when the model's response fails validation.
pub async fn categorize_email(
    llm: &dyn LlmProvider,
    email: &EmailEnvelope,
    summary: Option<&str>,
    categories: &[String],
) -> Result<Option<Categorization>, LlmError> {
    let text = build_text(email, summary);
    if text.is_empty() {
        return Ok(None);
    }

    let categories = normalize_categories(categories);
    let prompt = build_prompt(&text, &categories);

    let request = CompletionRequest::new(vec![
        ChatMessage::system("You are a helpful email categorization assistant."),
        ChatMessage::user(prompt),
    ])
    .with_temperature(CATEGORIZE_TEMPERATURE)
    .with_max_tokens(CATEGORIZE_MAX_TOKENS)
    .with_json_object();

    let response = llm.complete(request).await?;

    Ok(parse_categorization(&response.content, &categories))
}

/// Strip blanks from the category list and guarantee "Other" is present.
pub fn normalize_categories(categories: &[String]) -> Vec<String> {
    let mut clean: Vec<String> = categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();
    if !clean.iter().any(|c| c == "Other") {
        clean.push("Other".to_string());
    }
    clean
}

fn build_text(email: &EmailEnvelope, summary: Option<&str>) -> String {
    [
        email.subject.as_deref(),
        email.snippet.as_deref(),
        email.body.as_deref(),
        summary,
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("\n")
}

fn build_prompt(text: &str, categories: &[String]) -> String {
    format!(
        "You categorize emails for a personal assistant. \
         Choose exactly one category from this list: {}. \
         Return JSON with keys: category, confidence, rationale. \
         confidence must be a number between 0 and 1. \
         If unsure, return category 'Other' with low confidence.\n\n\
         Email content:\n{}",
        categories.join(", "),
        text,
    )
}

/// Validate and coerce a raw model response.
///
/// Unknown categories collapse to "Other", confidence is coerced to a
/// float in [0, 1] (0.0 on failure), rationale defaults to empty.
fn parse_categorization(raw: &str, categories: &[String]) -> Option<Categorization> {
    let json = extract_json_object(raw);
    let payload: serde_json::Value = match serde_json::from_str(&json) {
        Ok(value) => value,
        Err(e) => {
            warn!(raw_response = %raw, error = %e, "Failed to parse categorization response");
            return None;
        }
    };

    let category = payload
        .get("category")
        .and_then(|v| v.as_str())
        .filter(|c| !c.is_empty())
        .unwrap_or("Other");
    let category = if categories.iter().any(|c| c == category) {
        category.to_string()
    } else {
        "Other".to_string()
    };

    let confidence = coerce_confidence(payload.get("confidence")).clamp(0.0, 1.0);

    let rationale = payload
        .get("rationale")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    Some(Categorization {
        category,
        confidence,
        rationale,
    })
}

/// Accept a JSON number or a numeric string; anything else is 0.0.
fn coerce_confidence(value: Option<&serde_json::Value>) -> f32 {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0) as f32,
        Some(serde_json::Value::String(s)) => s.trim().parse::<f32>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Extract a JSON object from model output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
