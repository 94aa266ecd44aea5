//! Error types for the Paperlens client core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering transport, HTTP status, decoding, supersession, profile
//! workflows and configuration.

/// Top-level error type for the Paperlens core library.
#[derive(Debug, thiserror::Error)]
pub enum PaperlensError {
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors produced by a single request issued through the coordinator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed response body: {message}")]
    Decode { message: String },

    #[error("Request {operation}#{sequence} was superseded by a newer request")]
    Superseded { operation: String, sequence: u64 },

    #[error("Request {operation}#{sequence} was aborted by a newer request")]
    Aborted { operation: String, sequence: u64 },
}

impl RequestError {
    /// Whether this error only means "a newer request replaced this one".
    ///
    /// Such errors are never user-facing and callers drop them silently.
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. } | Self::Aborted { .. })
    }

    /// HTTP status code, if the server answered with a non-2xx status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Terminal failures of the profile save / analyze workflow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Saving the profile failed: {0}")]
    SaveFailed(RequestError),

    #[error("Analyzing the profile failed: {0}")]
    AnalyzeFailed(RequestError),
}

impl WorkflowError {
    /// The request failure underlying this workflow error.
    pub fn cause(&self) -> &RequestError {
        match self {
            Self::SaveFailed(e) | Self::AnalyzeFailed(e) => e,
        }
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration load error: {message}")]
    Load { message: String },
}

/// A type alias for results using the top-level `PaperlensError`.
pub type Result<T> = std::result::Result<T, PaperlensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_http() {
        let err = PaperlensError::Request(RequestError::Http {
            status: 500,
            body: "Internal Server Error".into(),
        });
        assert_eq!(
            err.to_string(),
            "Request error: HTTP 500: Internal Server Error"
        );
    }

    #[test]
    fn test_error_display_workflow() {
        let err = PaperlensError::Workflow(WorkflowError::SaveFailed(RequestError::Timeout {
            timeout_secs: 30,
        }));
        assert_eq!(
            err.to_string(),
            "Workflow error: Saving the profile failed: Request timed out after 30s"
        );
    }

    #[test]
    fn test_error_display_config() {
        let err = PaperlensError::Config(ConfigError::Invalid {
            message: "api.base_url is empty".into(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration: api.base_url is empty"
        );
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: PaperlensError = serde_err.into();
        assert!(matches!(err, PaperlensError::Serialization(_)));
    }

    #[test]
    fn test_superseded_classification() {
        let superseded = RequestError::Superseded {
            operation: "search".into(),
            sequence: 3,
        };
        let aborted = RequestError::Aborted {
            operation: "search".into(),
            sequence: 4,
        };
        assert!(superseded.is_superseded());
        assert!(aborted.is_superseded());
        assert!(!RequestError::Decode { message: "eof".into() }.is_superseded());
    }

    #[test]
    fn test_status_only_for_http_errors() {
        let err = RequestError::Http {
            status: 404,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            RequestError::Transport {
                message: "refused".into()
            }
            .status(),
            None
        );
    }

    #[test]
    fn test_workflow_cause() {
        let inner = RequestError::Http {
            status: 502,
            body: "bad gateway".into(),
        };
        let err = WorkflowError::AnalyzeFailed(inner.clone());
        assert_eq!(err.cause(), &inner);
    }
}
