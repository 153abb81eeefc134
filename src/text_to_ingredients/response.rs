use serde_json::Value;

use crate::error::ExtractError;
use crate::model::IngredientRecord;

/// Remove a Markdown code fence wrapped around a model answer.
///
/// Handles an opening fence with any info string (```json, ```JSON, bare ```),
/// surrounding whitespace, and a missing closing fence. Text that is not
/// fenced is returned trimmed.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string up to the end of the opening fence line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse a model answer into ingredient records.
///
/// The answer must be a JSON array of objects with string `text` and `lang`
/// fields, optionally fenced. Strings are kept exactly as the model sent them.
///
/// # Arguments
/// * `response` - Raw text of the model answer
///
/// # Returns
/// The records in answer order. An empty array yields an empty vector.
///
/// # Errors
/// Returns `ExtractError::MalformedResponse` if:
/// - The cleaned answer is not valid JSON
/// - The top-level value is not an array
/// - An element lacks a string `text` or `lang`
pub fn parse_ingredient_records(response: &str) -> Result<Vec<IngredientRecord>, ExtractError> {
    let cleaned = strip_code_fence(response);

    let value: Value = serde_json::from_str(cleaned).map_err(|e| {
        ExtractError::MalformedResponse(format!("{} in response: {}", e, preview(cleaned)))
    })?;

    let items = value.as_array().ok_or_else(|| {
        ExtractError::MalformedResponse(format!("expected a JSON array, got: {}", preview(cleaned)))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<IngredientRecord>(item.clone()).map_err(|e| {
                ExtractError::MalformedResponse(format!("element {}: {}", index, e))
            })
        })
        .collect()
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 200;
    match text.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
