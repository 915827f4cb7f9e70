//! Application-level errors (wraps collaborator errors)

use std::convert::Infallible;

use thiserror::Error;

use crate::domain::{DomainError, TreeId};
use crate::infrastructure::InfraError;

/// Application errors wrap collaborator failures and add the failing step.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{operation} failed for tree {tree_id}: {source}")]
    Collaborator {
        operation: &'static str,
        tree_id: TreeId,
        #[source]
        source: InfraError,
    },

    #[error("node source failed: {context}")]
    NodeSource {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    pub fn node_source(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::NodeSource {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Name of the collaborator call that failed, if this is a collaborator failure.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            ApplicationError::Collaborator { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Underlying tree-state rule violation, if any.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ApplicationError::Collaborator { source, .. } => source.domain(),
            _ => None,
        }
    }
}

impl From<Infallible> for ApplicationError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
