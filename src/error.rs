//! Pipeline error taxonomy
//!
//! Hook failures never surface here: they are converted into faults and
//! travel through the `INVOKE_FAULT` phase. [`PipelineError`] is reserved
//! for configuration and programming errors that no hook can recover from.

use crate::invocation::{Direction, InteractionType};
use thiserror::Error;

/// Fatal pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid interaction type: {0}")]
    InvalidInteraction(String),

    #[error("Illegal interaction transition from {from} to {to}")]
    IllegalTransition {
        from: InteractionType,
        to: InteractionType,
    },

    #[error("No {direction} stage beyond '{stage}'")]
    ChainBoundary { stage: String, direction: Direction },

    #[error("Chain assembly failed: {message}")]
    Assembly { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] crate::registry::RegistryError),
}

impl PipelineError {
    /// Create chain assembly error
    pub fn assembly<S: Into<String>>(message: S) -> Self {
        Self::Assembly {
            message: message.into(),
        }
    }

    /// Create chain boundary error
    pub fn chain_boundary<S: Into<String>>(stage: S, direction: Direction) -> Self {
        Self::ChainBoundary {
            stage: stage.into(),
            direction,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::registry::RegistryError;

    #[test]
    fn test_invalid_interaction_message() {
        let error = PipelineError::InvalidInteraction("RETRY".to_string());
        assert_eq!(error.to_string(), "Invalid interaction type: RETRY");
    }

    #[test]
    fn test_illegal_transition_message() {
        let error = PipelineError::IllegalTransition {
            from: InteractionType::InvokeFault,
            to: InteractionType::Invoke,
        };
        assert_eq!(
            error.to_string(),
            "Illegal interaction transition from INVOKE_FAULT to INVOKE"
        );
    }

    #[test]
    fn test_chain_boundary_constructor() {
        let error = PipelineError::chain_boundary("tail", Direction::Forward);
        assert!(matches!(error, PipelineError::ChainBoundary { .. }));
        assert_eq!(error.to_string(), "No forward stage beyond 'tail'");
    }

    #[test]
    fn test_assembly_constructor() {
        let error = PipelineError::assembly("unknown interceptor 'x'");
        assert_eq!(
            error.to_string(),
            "Chain assembly failed: unknown interceptor 'x'"
        );
    }

    #[test]
    fn test_from_conversions() {
        let config: PipelineError = ConfigError::InvalidConfig("bad".to_string()).into();
        assert!(matches!(config, PipelineError::Config(_)));

        let registry: PipelineError = RegistryError::ReservedName("system:x".to_string()).into();
        assert!(matches!(registry, PipelineError::Registry(_)));
        assert!(registry.to_string().contains("system:x"));
    }
}
