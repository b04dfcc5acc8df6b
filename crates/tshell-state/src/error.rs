use thiserror::Error;

pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// A state payload that is not a plain JSON object.
    #[error("invalid state: expected a plain object, found {found}")]
    InvalidState { found: &'static str },
}

impl StateError {
    #[must_use]
    pub fn invalid(value: &serde_json::Value) -> Self {
        Self::InvalidState {
            found: kind_of(value),
        }
    }
}

/// Human-readable JSON kind, used in error messages.
#[must_use]
pub fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
