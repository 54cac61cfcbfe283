//! Turning raw model output into a [`ReviewAnalysis`].
//!
//! Never fails: missing fields get placeholders, an unknown sentiment becomes
//! NEUTRAL, and output that is not a JSON object yields [`fallback_analysis`].
//! A fallback is indistinguishable from a real answer downstream (the metric
//! is still recorded as SUCCESS); only the `warn!` log marks it.

use serde_json::{Map, Value};
use tracing::warn;

use super::{MAX_SUGGESTED_ACTIONS, ReviewAnalysis};
use crate::db::models::reviews::Sentiment;

pub const DEFAULT_SUMMARY: &str = "Sin resumen";
pub const DEFAULT_ACTION: &str = "Revisar manualmente";
pub const DEFAULT_RESPONSE: &str = "Por favor, contáctanos para ayudarte.";

pub const FALLBACK_SUMMARY: &str = "No se pudo analizar el comentario automáticamente";
pub const FALLBACK_ACTION: &str = "Revisar manualmente el comentario";
pub const FALLBACK_RESPONSE: &str = "Gracias por tu comentario. Estamos revisando tu caso.";

/// Result used when the model answer cannot be read at all.
pub fn fallback_analysis() -> ReviewAnalysis {
    ReviewAnalysis {
        summary: FALLBACK_SUMMARY.to_string(),
        sentiment: Sentiment::Neutral,
        suggested_actions: vec![FALLBACK_ACTION.to_string()],
        suggested_response: FALLBACK_RESPONSE.to_string(),
    }
}

pub fn parse_analysis(content: &str) -> ReviewAnalysis {
    match serde_json::from_str::<Value>(strip_code_fence(content)) {
        Ok(Value::Object(fields)) => from_fields(&fields),
        Ok(_) => {
            warn!("Model answer is JSON but not an object, using fallback analysis");
            fallback_analysis()
        }
        Err(e) => {
            warn!(error = %e, "Could not parse model answer, using fallback analysis");
            fallback_analysis()
        }
    }
}

/// Remove a surrounding Markdown code fence such as ```` ```json ... ``` ````.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn from_fields(fields: &Map<String, Value>) -> ReviewAnalysis {
    let text_or = |key: &str, default: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    let suggested_actions = match fields.get("suggestedActions") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(MAX_SUGGESTED_ACTIONS)
            .collect(),
        _ => vec![DEFAULT_ACTION.to_string()],
    };

    ReviewAnalysis {
        summary: text_or("summary", DEFAULT_SUMMARY),
        sentiment: coerce_sentiment(fields.get("sentiment")),
        suggested_actions,
        suggested_response: text_or("suggestedResponse", DEFAULT_RESPONSE),
    }
}

fn coerce_sentiment(value: Option<&Value>) -> Sentiment {
    value
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(Sentiment::Neutral)
}
