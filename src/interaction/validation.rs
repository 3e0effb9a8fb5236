//! Request body validation for toggle transitions

use serde_json::Value;

use crate::error::ToggleError;

/// Checks that `body.enabled` is exactly the boolean `expected`.
///
/// A missing key is reported before any value check. Non-boolean values,
/// including truthy ones like `"true"` or `1`, are never coerced.
pub fn require_enabled(body: &Value, expected: bool) -> Result<(), ToggleError> {
    match body.get("enabled") {
        None => Err(ToggleError::MissingState),
        Some(Value::Bool(enabled)) if *enabled == expected => Ok(()),
        Some(_) => Err(ToggleError::InvalidEnabledValue { expected }),
    }
}
