//! Prompt construction for review analysis.

use super::AnalysisContext;

pub(crate) const SYSTEM_PROMPT: &str = "You analyze customer comments for an e-commerce support team. \
Reply with a single JSON object and nothing else.";

/// User message asking for the four analysis fields as strict JSON.
pub(crate) fn build_user_prompt(text: &str, context: &AnalysisContext) -> String {
    let language = context
        .language
        .as_deref()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or("detect it from the comment");

    format!(
        r#"LANGUAGE: {language}

CUSTOMER COMMENT:
"{text}"

Provide:
1. summary: a brief summary of the issue, at most two lines
2. sentiment: exactly one of POSITIVE, NEUTRAL or NEGATIVE
3. suggestedActions: two to four concrete actions for the support agent
4. suggestedResponse: a professional, empathetic reply to the customer, written in the comment's language

Answer with exactly this JSON shape:
{{
  "summary": "...",
  "sentiment": "POSITIVE|NEUTRAL|NEGATIVE",
  "suggestedActions": ["...", "..."],
  "suggestedResponse": "..."
}}"#
    )
}
