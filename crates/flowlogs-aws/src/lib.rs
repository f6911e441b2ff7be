//! AWS resource lifecycle for flowlogs
//!
//! This crate provides the client capabilities flowlogs needs from the
//! provider, their implementation on top of the `aws` command-line tool, and
//! the orchestrator that creates, queries and deletes flow logs together
//! with their log groups and roles.

mod cli;
mod client;
mod error;
mod interfaces;
mod naming;
mod orchestrator;
mod policy;

pub use cli::AwsCli;
pub use client::{
    ClientResult, CreateFlowLogsRequest, InterfaceFilter, LogSinkClient, NetworkClient,
    QueryRequest, QueryResults, QueryStatus, ResourceType, RoleClient, RoleSpec,
};
pub use error::{ClientError, ECS_FIELDS_DENIED, FlowLogsError, Result};
pub use interfaces::{classify, interface_kind, interface_name};
pub use naming::{
    CREATED_BY_TAG, CREATED_BY_VALUE, LOG_GROUP_PREFIX, MAX_ROLE_NAME_LEN, RETENTION_DAYS,
    TagPolicy, log_group_name, role_name,
};
pub use orchestrator::{AwsConfig, FlowLogsClient, QueryPolicy};
pub use policy::{POLICY_NAME, ROLE_DESCRIPTION, permissions_policy, trust_policy};

// Re-export types used in our public API
pub use flowlogs_types::{FlowLog, FlowLogs, LogRecord, NetworkInterfaces, Tags, Target, TargetKind};
