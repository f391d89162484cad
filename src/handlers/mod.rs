pub mod auth;
pub mod bookings;
pub mod health;
pub mod messages;
pub mod payments;
pub mod profile;
pub mod services;

use serde_json::Value;

/// Trimmed, non-empty contents of an optional text field.
pub(crate) fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Optional free-text field normalised for storage: blank becomes `None`.
pub(crate) fn optional_text(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Numbers arrive from browser forms either as JSON numbers or as numeric strings.
pub(crate) fn number(field: Option<&Value>) -> Option<f64> {
    match field? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
