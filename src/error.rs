use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlobError {
    // Patterns
    #[error("empty pattern")]
    EmptyPattern,

    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // Environment
    #[error("current directory unavailable")]
    CurrentDir(#[source] std::io::Error),
}

impl GlobError {
    pub(crate) fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    /// The pattern this error was raised for, if applicable.
    /// Callers use this to point at the offending argument without matching on variants.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::InvalidPattern { pattern, .. } => Some(pattern),
            _ => None,
        }
    }
}
