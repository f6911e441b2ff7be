//! Capability interfaces the orchestrator drives
//!
//! Each trait covers one provider service. [`crate::cli::AwsCli`] implements
//! all three on top of the `aws` command-line tool; tests use in-memory fakes.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowlogs_types::{
    FlowLogs, Instance, LogRecord, NatGateway, NetworkInterfaces, SecurityGroup, Subnet, Tags,
    Vpc, VpcEndpoint,
};

use crate::error::ClientError;

pub type ClientResult<T> = Result<T, ClientError>;

// ============================================================================
// Network
// ============================================================================

/// Provider resource type a flow log attaches to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceType {
    Vpc,
    Subnet,
    NetworkInterface,
    VpcEndpoint,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vpc => "VPC",
            Self::Subnet => "Subnet",
            Self::NetworkInterface => "NetworkInterface",
            Self::VpcEndpoint => "VpcEndpoint",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to create flow logs for a set of resources.
///
/// Flow logs always capture all traffic and deliver to the log store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateFlowLogsRequest {
    pub resource_type: ResourceType,
    pub resource_ids: Vec<String>,
    pub log_group_name: String,
    pub role_arn: String,
    pub log_format: String,
    pub tags: Tags,
}

/// Network interface listing filter
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterfaceFilter {
    pub vpc_id: Option<String>,
    pub security_group_id: Option<String>,
}

impl InterfaceFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn security_group(vpc_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            vpc_id: Some(vpc_id.into()),
            security_group_id: Some(group_id.into()),
        }
    }
}

#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Available VPCs owned by `owner_id`
    async fn list_vpcs(&self, owner_id: &str) -> ClientResult<Vec<Vpc>>;

    async fn list_subnets(&self, owner_id: &str, vpc_id: &str) -> ClientResult<Vec<Subnet>>;

    async fn list_security_groups(
        &self,
        owner_id: &str,
        vpc_id: &str,
    ) -> ClientResult<Vec<SecurityGroup>>;

    async fn list_nat_gateways(&self, vpc_id: &str) -> ClientResult<Vec<NatGateway>>;

    /// Running instances in a VPC
    async fn list_instances(&self, vpc_id: &str) -> ClientResult<Vec<Instance>>;

    async fn list_vpc_endpoints(&self, vpc_id: &str) -> ClientResult<Vec<VpcEndpoint>>;

    async fn list_network_interfaces(
        &self,
        filter: &InterfaceFilter,
    ) -> ClientResult<NetworkInterfaces>;

    async fn create_flow_logs(&self, request: &CreateFlowLogsRequest) -> ClientResult<()>;

    /// Flow logs delivering to the log store that carry a `Name` tag and
    /// every tag in `tags`
    async fn list_flow_logs(&self, tags: &Tags) -> ClientResult<FlowLogs>;

    async fn delete_flow_logs(&self, ids: &[String]) -> ClientResult<()>;
}

// ============================================================================
// Roles
// ============================================================================

/// Role the flow log service assumes to write into a log group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleSpec {
    pub name: String,
    pub description: String,
    pub trust_policy: String,
    pub tags: Tags,
}

#[async_trait]
pub trait RoleClient: Send + Sync {
    /// Create the role and return its ARN
    async fn create_role(&self, spec: &RoleSpec) -> ClientResult<String>;

    async fn put_role_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        document: &str,
    ) -> ClientResult<()>;

    async fn role_tags(&self, role_name: &str) -> ClientResult<Tags>;

    async fn delete_role_policy(&self, role_name: &str, policy_name: &str) -> ClientResult<()>;

    async fn delete_role(&self, role_name: &str) -> ClientResult<()>;
}

// ============================================================================
// Log store
// ============================================================================

/// Status of a submitted log query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    Scheduled,
    Running,
    Complete,
    Failed,
    Cancelled,
    Timeout,
    Unknown,
}

impl QueryStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "Scheduled" => Self::Scheduled,
            "Running" => Self::Running,
            "Complete" => Self::Complete,
            "Failed" => Self::Failed,
            "Cancelled" => Self::Cancelled,
            "Timeout" => Self::Timeout,
            _ => Self::Unknown,
        }
    }

    /// Still being worked on by the log store
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Running)
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scheduled => "Scheduled",
            Self::Running => "Running",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Timeout => "Timeout",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    pub log_group_names: Vec<String>,
    pub query: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryResults {
    pub status: QueryStatus,
    pub records: Vec<LogRecord>,
}

#[async_trait]
pub trait LogSinkClient: Send + Sync {
    async fn create_log_group(&self, name: &str, tags: &Tags) -> ClientResult<()>;

    async fn put_retention_policy(&self, name: &str, days: u32) -> ClientResult<()>;

    /// ARN of the log group with exactly this name
    async fn log_group_arn(&self, name: &str) -> ClientResult<String>;

    async fn log_group_tags(&self, arn: &str) -> ClientResult<Tags>;

    async fn delete_log_group(&self, name: &str) -> ClientResult<()>;

    /// Submit a query and return its id
    async fn start_query(&self, request: &QueryRequest) -> ClientResult<String>;

    async fn query_results(&self, query_id: &str) -> ClientResult<QueryResults>;
}
