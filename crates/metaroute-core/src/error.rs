//! Error types for Metaroute

use thiserror::Error;

/// Result type alias using Metaroute's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Metaroute error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Registry errors (E001-E099)
    #[error("Meta-agent '{0}' not found. Run `metaroute agents list` to see registered agents.")]
    AgentNotFound(String),

    // Matcher errors (E100-E199)
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // Delegation errors (E200-E299)
    #[error(
        "Circular delegation rejected: '{from}' -> '{to}' would loop back within {max_depth} hops"
    )]
    CircularDelegation {
        from: String,
        to: String,
        max_depth: usize,
    },

    // Storage errors (E400-E499)
    #[error("Storage I/O error: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error("Persisted snapshot is invalid: {0}")]
    SchemaInvalid(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::AgentNotFound(_) => "E001",
            Self::InvalidPattern { .. } => "E100",
            Self::CircularDelegation { .. } => "E200",
            Self::StorageIo(_) => "E400",
            Self::SchemaInvalid(_) => "E401",
            Self::Serialization(_) => "E402",
            Self::ConfigError(_) => "E600",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::AgentNotFound(_) => Some("metaroute agents list".to_string()),
            Self::CircularDelegation { to, .. } => Some(format!(
                "Remove the rule that routes back into '{}' or raise routing.max_delegation_depth",
                to
            )),
            Self::ConfigError(_) => Some("metaroute config list".to_string()),
            _ => None,
        }
    }

    /// Whether this error belongs to the routing decision path
    pub fn is_routing_error(&self) -> bool {
        matches!(
            self,
            Self::AgentNotFound(_) | Self::InvalidPattern { .. } | Self::CircularDelegation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(Error::AgentNotFound("x".into()).code(), "E001");
        assert_eq!(
            Error::CircularDelegation {
                from: "a".into(),
                to: "b".into(),
                max_depth: 3
            }
            .code(),
            "E200"
        );
        assert_eq!(Error::SchemaInvalid("bad".into()).code(), "E401");
        assert_eq!(Error::ConfigError("bad".into()).code(), "E600");
    }

    #[test]
    fn test_not_found_message_and_suggestion() {
        let err = Error::AgentNotFound("coordinator".into());
        assert!(err.to_string().contains("'coordinator'"));
        assert_eq!(err.suggestion().as_deref(), Some("metaroute agents list"));
        assert!(err.is_routing_error());
    }

    #[test]
    fn test_io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert_eq!(err.code(), "E400");
        assert!(!err.is_routing_error());
    }
}
