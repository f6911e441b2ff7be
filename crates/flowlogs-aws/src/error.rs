//! Error types for flowlogs-aws

use std::time::Duration;

use flowlogs_types::{TagMismatch, TargetError};
use thiserror::Error;

use crate::client::QueryStatus;

/// Provider rejection message when the account cannot read ECS fields
pub const ECS_FIELDS_DENIED: &str = "Caller is not authorized to obtain ECS field(s).";

/// Failure reported by one of the provider clients
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("`aws {command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("`aws {command}` timed out after {}s", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("failed to run aws")]
    Io(#[from] std::io::Error),

    #[error("failed to decode `aws {command}` output")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("provider rejected {0}")]
    Unsuccessful(String),
}

impl ClientError {
    /// Whether the provider refused the ECS fields of a flow log format
    pub fn is_ecs_fields_denied(&self) -> bool {
        match self {
            Self::Command { stderr, .. } => stderr.contains(ECS_FIELDS_DENIED),
            Self::Unsuccessful(message) => message.contains(ECS_FIELDS_DENIED),
            _ => false,
        }
    }
}

/// Errors returned by [`FlowLogsClient`](crate::FlowLogsClient) operations
#[derive(Debug, Error)]
pub enum FlowLogsError {
    /// Rejected before any remote call was made
    #[error("invalid target: {0}")]
    Validation(String),

    #[error("{operation} {target}")]
    Collaborator {
        operation: &'static str,
        target: String,
        #[source]
        source: ClientError,
    },

    /// Live tags do not carry the ownership tags, nothing was deleted
    #[error("{resource} is not owned by flowlogs: {mismatch}")]
    OwnershipMismatch {
        resource: String,
        mismatch: TagMismatch,
    },

    #[error("query {query_id} did not complete: status {status} after {attempts} attempts")]
    QueryIncomplete {
        query_id: String,
        status: QueryStatus,
        attempts: u32,
    },
}

impl From<TargetError> for FlowLogsError {
    fn from(err: TargetError) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FlowLogsError>;

/// Attach operation and target context to a client error
pub(crate) trait ClientResultExt<T> {
    fn during(self, operation: &'static str, target: impl Into<String>) -> Result<T>;
}

impl<T> ClientResultExt<T> for std::result::Result<T, ClientError> {
    fn during(self, operation: &'static str, target: impl Into<String>) -> Result<T> {
        self.map_err(|source| FlowLogsError::Collaborator {
            operation,
            target: target.into(),
            source,
        })
    }
}
