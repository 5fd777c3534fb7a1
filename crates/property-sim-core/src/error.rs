use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable tag for each failure family.
///
/// Callers (the HTTP layer, the CLI) map these to user-visible text; the core
/// never formats locale-specific messages itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    UnsafeInput,
    ResourceExhausted,
    ArithmeticError,
    SerializationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::UnsafeInput => "unsafe_input",
            ErrorKind::ResourceExhausted => "resource_exhausted",
            ErrorKind::ArithmeticError => "arithmetic_error",
            ErrorKind::SerializationError => "serialization_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Invalid input: {field} — {reason}")]
    Validation { field: String, reason: String },

    #[error("Unsafe input rejected ({rule}): {detail}")]
    UnsafeInput { rule: String, detail: String },

    #[error("Resource budget exhausted: {budget} exceeded limit of {limit}")]
    ResourceExhausted { budget: String, limit: String },

    #[error("Arithmetic error in {context}")]
    Arithmetic { context: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SimulatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimulatorError::Validation { .. } => ErrorKind::ValidationError,
            SimulatorError::UnsafeInput { .. } => ErrorKind::UnsafeInput,
            SimulatorError::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            SimulatorError::Arithmetic { .. } => ErrorKind::ArithmeticError,
            SimulatorError::Serialization(_) => ErrorKind::SerializationError,
        }
    }

    pub(crate) fn arithmetic(context: impl Into<String>) -> Self {
        SimulatorError::Arithmetic {
            context: context.into(),
        }
    }

    pub(crate) fn unsafe_input(rule: &str, detail: impl Into<String>) -> Self {
        SimulatorError::UnsafeInput {
            rule: rule.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<serde_json::Error> for SimulatorError {
    fn from(e: serde_json::Error) -> Self {
        SimulatorError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_distinct() {
        let errors = [
            SimulatorError::Validation {
                field: "purchase_price".into(),
                reason: "missing".into(),
            },
            SimulatorError::unsafe_input("max_loan_years", "loan_years=120"),
            SimulatorError::ResourceExhausted {
                budget: "wall_clock".into(),
                limit: "10ms".into(),
            },
            SimulatorError::arithmetic("remaining principal"),
        ];
        let tags: Vec<&str> = errors.iter().map(|e| e.kind().as_str()).collect();
        assert_eq!(
            tags,
            vec![
                "validation_error",
                "unsafe_input",
                "resource_exhausted",
                "arithmetic_error"
            ]
        );
    }

    #[test]
    fn test_kind_serializes_as_tag() {
        let json = serde_json::to_string(&ErrorKind::UnsafeInput).unwrap();
        assert_eq!(json, "\"unsafe_input\"");
    }
}
