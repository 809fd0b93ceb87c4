//! Parse LLM output into raw extractions

use quarry_domain::{Attributes, RawExtraction};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// The model response could not be interpreted at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed model response: {0}")]
pub struct MalformedResponse(pub String);

/// Parse an LLM JSON response into raw extractions
///
/// Accepts a JSON array of extraction objects, or an object holding such an
/// array under `"extractions"`, optionally wrapped in a markdown code block.
/// Individual malformed items are skipped with a warning.
pub fn parse_model_response(response: &str) -> Result<Vec<RawExtraction>, MalformedResponse> {
    // LLMs sometimes wrap JSON in markdown code blocks
    let json_str = extract_json(response)?;

    let json: Value = serde_json::from_str(json_str)
        .map_err(|e| MalformedResponse(format!("JSON parse error: {}", e)))?;

    let items = match &json {
        Value::Array(items) => items,
        Value::Object(obj) => obj
            .get("extractions")
            .and_then(|v| v.as_array())
            .ok_or_else(|| MalformedResponse("Expected an \"extractions\" array".to_string()))?,
        _ => return Err(MalformedResponse("Expected JSON array".to_string())),
    };

    let mut extractions = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match parse_item(item) {
            Ok(extraction) => extractions.push(extraction),
            Err(e) => warn!("Skipping extraction {}: {}", idx, e),
        }
    }

    Ok(extractions)
}

/// Extract JSON from response, handling markdown code blocks
fn extract_json(response: &str) -> Result<&str, MalformedResponse> {
    let trimmed = response.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // Skip the opening fence line (```json or ```)
        let body = rest
            .split_once('\n')
            .map(|(_, body)| body)
            .ok_or_else(|| MalformedResponse("Empty code block".to_string()))?;
        let body = body.trim_end();
        Ok(body.strip_suffix("```").unwrap_or(body).trim())
    } else {
        Ok(trimmed)
    }
}

/// Parse a single extraction object
fn parse_item(json: &Value) -> Result<RawExtraction, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "Extraction is not a JSON object".to_string())?;

    let class = obj
        .get("extraction_class")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| "Missing or invalid 'extraction_class'".to_string())?
        .to_string();

    let text = obj
        .get("extraction_text")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing or invalid 'extraction_text'".to_string())?
        .to_string();

    let attributes = match obj.get("attributes") {
        None | Some(Value::Null) => Attributes::new(),
        Some(Value::Object(map)) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), attribute_value(v)))
            .collect(),
        Some(_) => return Err("'attributes' is not an object".to_string()),
    };

    Ok(RawExtraction {
        class,
        text,
        attributes,
    })
}

fn attribute_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
