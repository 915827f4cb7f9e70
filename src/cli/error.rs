//! CLI-level errors (wraps application and collaborator errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => crate::exitcode::USAGE,
            CliError::Io { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => crate::exitcode::NOINPUT,
                _ => crate::exitcode::IOERR,
            },
            CliError::Application(e) => match e {
                ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                ApplicationError::NodeSource { .. } => crate::exitcode::DATAERR,
                ApplicationError::Collaborator { .. } if e.domain().is_some() => {
                    crate::exitcode::DATAERR
                }
                ApplicationError::Collaborator { .. } => crate::exitcode::SOFTWARE,
            },
            CliError::Infra(e) if e.domain().is_some() => crate::exitcode::DATAERR,
            CliError::Infra(_) => crate::exitcode::SOFTWARE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, TreeId};

    #[test]
    fn given_domain_failure_when_mapping_exit_code_then_reports_data_error() {
        let err = CliError::from(ApplicationError::Collaborator {
            operation: "append_node_to_parent_node",
            tree_id: TreeId::from("t"),
            source: InfraError::Domain(DomainError::TreeNotFound(TreeId::from("t"))),
        });
        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
    }

    #[test]
    fn given_missing_input_when_mapping_exit_code_then_reports_no_input() {
        let err = CliError::io("open nodes.jsonl", std::io::ErrorKind::NotFound.into());
        assert_eq!(err.exit_code(), crate::exitcode::NOINPUT);
    }
}
