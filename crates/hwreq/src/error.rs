//! Parse-time error types for requirement specifications
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.
//!
//! Every variant carries the dotted field path of the offending constraint so
//! callers can point at the exact place in the specification. Evaluation-time
//! conditions (absent field, wrong-typed candidate value) are deliberately
//! *not* errors — they surface as unsatisfied leaves in the
//! [`MatchReport`](crate::eval::MatchReport).

use thiserror::Error;

/// Result alias for requirement parsing.
pub type RequirementResult<T> = Result<T, RequirementError>;

// ============================================================================
// Main Error Type
// ============================================================================

/// Errors raised while parsing a requirement specification.
///
/// All of these are fatal to parsing that single specification and are
/// surfaced to the caller; nothing is silently swallowed.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {
    /// A scalar value could not be parsed into an operator/literal/unit triple.
    #[error("malformed value for '{path}': {message}")]
    MalformedValue { path: String, message: String },

    /// A `~` / `!~` operand is not a valid regular expression.
    #[error("invalid pattern for '{path}': {pattern}: {message}")]
    InvalidPattern {
        path: String,
        pattern: String,
        message: String,
    },

    /// Strict mode only: the field is not in the recognized-field schema.
    #[error("unknown field '{path}'")]
    UnknownField { path: String },

    /// The operand's unit category does not match the field's declared one.
    #[error("unit mismatch for '{path}': expected {expected}, found {actual}")]
    UnitMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

impl RequirementError {
    /// Get error code for categorization
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedValue { .. } => "HW:VALUE",
            Self::InvalidPattern { .. } => "HW:PATTERN",
            Self::UnknownField { .. } => "HW:FIELD",
            Self::UnitMismatch { .. } => "HW:UNIT",
        }
    }

    /// The dotted field path the error refers to.
    pub fn path(&self) -> &str {
        match self {
            Self::MalformedValue { path, .. }
            | Self::InvalidPattern { path, .. }
            | Self::UnknownField { path }
            | Self::UnitMismatch { path, .. } => path,
        }
    }

    // ========================================================================
    // Convenience Constructors
    // ========================================================================

    /// Create a malformed-value error.
    pub fn malformed_value(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedValue {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-pattern error.
    pub fn invalid_pattern(
        path: impl Into<String>,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPattern {
            path: path.into(),
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-field error.
    pub fn unknown_field(path: impl Into<String>) -> Self {
        Self::UnknownField { path: path.into() }
    }

    /// Create a unit-mismatch error.
    pub fn unit_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::UnitMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            RequirementError::malformed_value("memory", "bad literal").code(),
            "HW:VALUE"
        );
        assert_eq!(
            RequirementError::invalid_pattern("hostname", "(", "unclosed group").code(),
            "HW:PATTERN"
        );
        assert_eq!(RequirementError::unknown_field("gpu.model").code(), "HW:FIELD");
        assert_eq!(
            RequirementError::unit_mismatch("memory", "size", "frequency").code(),
            "HW:UNIT"
        );
    }

    #[test]
    fn path_is_attached() {
        let err = RequirementError::malformed_value("cpu.cores", "not a number");
        assert_eq!(err.path(), "cpu.cores");
        assert!(err.to_string().contains("cpu.cores"));
    }
}
