// src/profile/error.rs
use thiserror::Error;

/// Failures reported by the profile resolver. All of them are returned as
/// values; nothing in the resolver panics on bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// The descriptor text is not valid YAML/JSON or has the wrong shape.
    #[error("invalid descriptor: {0}")]
    Parse(String),

    /// The descriptor parsed but violates one of its invariants.
    #[error("{0}")]
    Validation(String),

    #[error("invalid certificate: {0}")]
    Certificate(String),
}

impl ProfileError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ProfileError::Validation(message.into())
    }
}
