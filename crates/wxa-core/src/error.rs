// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Structured error type shared across the workspace.
///
/// Variants map to the failure taxonomy of the pipeline: malformed inputs,
/// training sets too small to fit a model, numerical breakdowns inside the
/// scoring path, and upstream data source failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WxaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
    #[error("data source unavailable: {0}")]
    SourceUnavailable(String),
}

impl WxaError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::WxaError;

    #[test]
    fn display_prefixes_identify_the_variant() {
        assert_eq!(
            WxaError::invalid_input("bad shape").to_string(),
            "invalid input: bad shape"
        );
        assert_eq!(
            WxaError::insufficient_data("1 row").to_string(),
            "insufficient data: 1 row"
        );
        assert_eq!(
            WxaError::numerical_issue("NaN score").to_string(),
            "numerical issue: NaN score"
        );
        assert_eq!(
            WxaError::source_unavailable("timeout").to_string(),
            "data source unavailable: timeout"
        );
    }

    #[test]
    fn errors_are_comparable_for_test_assertions() {
        assert_eq!(
            WxaError::invalid_input("x"),
            WxaError::InvalidInput("x".to_string())
        );
        assert_ne!(
            WxaError::invalid_input("x"),
            WxaError::insufficient_data("x")
        );
    }
}
