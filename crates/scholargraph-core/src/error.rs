//! Error types for Scholargraph

use thiserror::Error;

/// Result type alias using Scholargraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Scholargraph error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Graph contract errors (E001-E099)
    #[error("Node '{0}' already exists in the graph.")]
    DuplicateId(String),

    #[error("Node '{0}' not found. Run `scholargraph list` to see all nodes.")]
    NotFound(String),

    #[error("Link {source_id} -> {target_id} references missing node(s): {}", missing.join(", "))]
    DanglingEndpoint {
        source_id: String,
        target_id: String,
        missing: Vec<String>,
    },

    #[error("This action needs at least {required} nodes in the graph, found {found}.")]
    EmptyGraph { required: usize, found: usize },

    // Collaborator errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Check your API key with `scholargraph config get llm.api_key`.")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    #[error("No suitable model found: {0}")]
    NoSuitableModel(String),

    #[error("AI request failed: {0}. Please try again.")]
    CollaboratorFailure(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateId(_) => "E001",
            Self::NotFound(_) => "E002",
            Self::DanglingEndpoint { .. } => "E003",
            Self::EmptyGraph { .. } => "E004",
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::NoSuitableModel(_) => "E103",
            Self::CollaboratorFailure(_) => "E104",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Json(_) => "E801",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NotFound(_) => Some("scholargraph list".to_string()),
            Self::EmptyGraph { required, .. } => {
                Some(format!("Add at least {} papers or notes first", required))
            }
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => Some("scholargraph config get llm.api_key".to_string()),
            Self::CollaboratorFailure(_) => Some("Try the request again".to_string()),
            _ => None,
        }
    }

    /// Whether this error came from the external AI collaborator
    ///
    /// These leave engine state untouched and map to a "failed, try again"
    /// signal for the user.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_)
                | Self::LLMError(_)
                | Self::RateLimited(_)
                | Self::NoSuitableModel(_)
                | Self::CollaboratorFailure(_)
        )
    }

    /// Whether this is an advisory error that callers may log and continue past
    pub fn is_advisory(&self) -> bool {
        matches!(self, Self::DanglingEndpoint { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::DuplicateId("a".into()).code(), "E001");
        assert_eq!(Error::NotFound("a".into()).code(), "E002");
        assert_eq!(
            Error::EmptyGraph {
                required: 2,
                found: 1
            }
            .code(),
            "E004"
        );
        assert_eq!(Error::CollaboratorFailure("x".into()).code(), "E104");
    }

    #[test]
    fn test_dangling_endpoint_message() {
        let err = Error::DanglingEndpoint {
            source_id: "a".into(),
            target_id: "b".into(),
            missing: vec!["b".into()],
        };
        assert_eq!(err.to_string(), "Link a -> b references missing node(s): b");
        assert!(err.is_advisory());
        assert!(!err.is_collaborator_failure());
    }

    #[test]
    fn test_collaborator_classification() {
        assert!(Error::LLMError("bad".into()).is_collaborator_failure());
        assert!(Error::RateLimited(3).is_collaborator_failure());
        assert!(!Error::NotFound("x".into()).is_collaborator_failure());
    }

    #[test]
    fn test_suggestions() {
        assert_eq!(
            Error::NotFound("x".into()).suggestion(),
            Some("scholargraph list".to_string())
        );
        assert!(Error::Other("x".into()).suggestion().is_none());
    }
}
