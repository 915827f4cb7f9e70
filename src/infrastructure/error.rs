//! Collaborator-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Failure reported by a collaborator (publisher, state manager or renderer).
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("renderer {renderer} failed: {message}")]
    Render { renderer: String, message: String },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("subscriber {subscriber_id} failed")]
    Subscriber {
        subscriber_id: String,
        #[source]
        source: Box<InfraError>,
    },

    #[error("{0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn render(renderer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            renderer: renderer.into(),
            message: message.into(),
        }
    }

    /// Domain error at the root of this failure, if any.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            InfraError::Domain(e) => Some(e),
            InfraError::Subscriber { source, .. } => source.domain(),
            _ => None,
        }
    }
}

/// Result type for collaborator operations.
pub type InfraResult<T> = Result<T, InfraError>;
