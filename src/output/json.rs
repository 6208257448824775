//! JSON output formatting.

use serde::Serialize;
use serde_json::json;

use crate::error::MecalError;

/// Wrap a list as `{"count": n, "items": [...]}`.
///
/// # Errors
///
/// Returns `MecalError::Parse` if JSON serialization fails.
pub fn format_list_json<T: Serialize>(items: &[T]) -> Result<String, MecalError> {
    let output = json!({
        "count": items.len(),
        "items": items
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Generic JSON formatter for any serializable type
///
/// # Errors
///
/// Returns `MecalError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, MecalError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Error body for JSON mode: `{"error": "...", "status": 404}`.
#[must_use]
pub fn format_error_json(error: &MecalError) -> String {
    json!({
        "error": error.to_string(),
        "status": error.status_code(),
    })
    .to_string()
}
