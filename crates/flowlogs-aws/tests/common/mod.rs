//! Shared test helpers
//! An in-memory provider that records every call made through it

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flowlogs_aws::{
    AwsConfig, ClientError, ClientResult, CreateFlowLogsRequest, ECS_FIELDS_DENIED,
    FlowLogsClient, InterfaceFilter, LogSinkClient, NetworkClient, QueryPolicy, QueryRequest,
    QueryResults, QueryStatus, RoleClient, RoleSpec,
};
use flowlogs_types::{
    FlowLog, FlowLogs, Instance, LogRecord, NatGateway, NetworkInterface, NetworkInterfaces,
    SecurityGroup, Subnet, Tags, Vpc, VpcEndpoint,
};

pub const ACCOUNT: &str = "123456789012";
pub const REGION: &str = "eu-west-2";

#[derive(Default)]
pub struct FakeState {
    /// One entry per provider call, in order
    pub calls: Vec<String>,
    pub interfaces: Vec<NetworkInterface>,
    pub flow_logs: Vec<FlowLog>,
    pub role_tags: HashMap<String, Tags>,
    /// Keyed by log group name
    pub log_group_tags: HashMap<String, Tags>,
    pub create_requests: Vec<CreateFlowLogsRequest>,
    pub query_requests: Vec<QueryRequest>,
    /// Returned in order; the last one repeats
    pub query_statuses: VecDeque<QueryStatus>,
    pub records: Vec<LogRecord>,
    pub deny_ecs_fields: bool,
    /// Operation names that fail with a command error
    pub failing: HashSet<&'static str>,
    pub query_latency: Duration,
}

/// Fake provider implementing every client capability
#[derive(Clone, Default)]
pub struct FakeAws {
    state: Arc<Mutex<FakeState>>,
}

impl FakeAws {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F: FnOnce(&mut FakeState)>(self, configure: F) -> Self {
        configure(&mut self.state.lock().unwrap());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn record(&self, operation: &'static str, detail: impl AsRef<str>) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        let detail = detail.as_ref();
        state.calls.push(if detail.is_empty() {
            operation.to_string()
        } else {
            format!("{operation} {detail}")
        });
        if state.failing.contains(operation) {
            return Err(ClientError::Command {
                command: operation.to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Orchestrator wired to one fake, with no query delays
pub fn client(fake: &FakeAws) -> FlowLogsClient<FakeAws, FakeAws, FakeAws> {
    FlowLogsClient::new(
        AwsConfig {
            account: ACCOUNT.to_string(),
            region: REGION.to_string(),
        },
        fake.clone(),
        fake.clone(),
        fake.clone(),
    )
    .with_query_policy(fast_policy())
}

pub fn fast_policy() -> QueryPolicy {
    QueryPolicy {
        initial_delay: Duration::ZERO,
        retry_delay: Duration::ZERO,
        max_attempts: 6,
        deadline: Duration::from_secs(5),
    }
}

pub fn owned_tags(name: &str) -> Tags {
    Tags::new().with("Name", name).with("CreatedBy", "fl-cli")
}

pub fn flow_log(id: &str, name: &str) -> FlowLog {
    FlowLog::new(
        id.to_string(),
        format!("res-{id}"),
        format!("/fl-cli/{name}"),
        None,
        owned_tags(name),
    )
}

pub fn vpc(id: &str) -> Vpc {
    Vpc {
        id: id.to_string(),
        cidr: "10.0.0.0/16".to_string(),
        ..Default::default()
    }
}

pub fn instance(id: &str, name: &str, interfaces: &[&str]) -> Instance {
    Instance {
        vpc_id: "vpc-1".to_string(),
        id: id.to_string(),
        name: name.to_string(),
        network_interface_ids: interfaces.iter().map(|s| s.to_string()).collect(),
        tags: Tags::new().with("Name", name),
        ..Default::default()
    }
}

pub fn interface(id: &str, group_id: &str) -> NetworkInterface {
    NetworkInterface {
        id: id.to_string(),
        vpc_id: "vpc-1".to_string(),
        // stands in for the group membership the provider filters on
        description: group_id.to_string(),
        ..Default::default()
    }
}

#[async_trait]
impl NetworkClient for FakeAws {
    async fn list_vpcs(&self, owner_id: &str) -> ClientResult<Vec<Vpc>> {
        self.record("list_vpcs", owner_id)?;
        Ok(vec![vpc("vpc-1")])
    }

    async fn list_subnets(&self, owner_id: &str, vpc_id: &str) -> ClientResult<Vec<Subnet>> {
        self.record("list_subnets", format!("{owner_id} {vpc_id}"))?;
        Ok(Vec::new())
    }

    async fn list_security_groups(
        &self,
        owner_id: &str,
        vpc_id: &str,
    ) -> ClientResult<Vec<SecurityGroup>> {
        self.record("list_security_groups", format!("{owner_id} {vpc_id}"))?;
        Ok(Vec::new())
    }

    async fn list_nat_gateways(&self, vpc_id: &str) -> ClientResult<Vec<NatGateway>> {
        self.record("list_nat_gateways", vpc_id)?;
        Ok(Vec::new())
    }

    async fn list_instances(&self, vpc_id: &str) -> ClientResult<Vec<Instance>> {
        self.record("list_instances", vpc_id)?;
        Ok(Vec::new())
    }

    async fn list_vpc_endpoints(&self, vpc_id: &str) -> ClientResult<Vec<VpcEndpoint>> {
        self.record("list_vpc_endpoints", vpc_id)?;
        Ok(Vec::new())
    }

    async fn list_network_interfaces(
        &self,
        filter: &InterfaceFilter,
    ) -> ClientResult<NetworkInterfaces> {
        let group = filter.security_group_id.clone().unwrap_or_default();
        self.record("list_network_interfaces", &group)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .interfaces
            .iter()
            .filter(|ni| group.is_empty() || ni.description == group)
            .cloned()
            .collect())
    }

    async fn create_flow_logs(&self, request: &CreateFlowLogsRequest) -> ClientResult<()> {
        self.record(
            "create_flow_logs",
            format!("{} {}", request.resource_type, request.resource_ids.join(",")),
        )?;
        let mut state = self.state.lock().unwrap();
        state.create_requests.push(request.clone());
        if state.deny_ecs_fields && request.log_format.contains("ecs-") {
            return Err(ClientError::Unsuccessful(format!(
                "{} (InvalidParameter: {ECS_FIELDS_DENIED})",
                request.resource_ids.join(",")
            )));
        }
        Ok(())
    }

    async fn list_flow_logs(&self, tags: &Tags) -> ClientResult<FlowLogs> {
        self.record("list_flow_logs", "")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .flow_logs
            .iter()
            .filter(|fl| tags.verify(&fl.tags).is_ok())
            .cloned()
            .collect())
    }

    async fn delete_flow_logs(&self, ids: &[String]) -> ClientResult<()> {
        self.record("delete_flow_logs", ids.join(","))
    }
}

#[async_trait]
impl RoleClient for FakeAws {
    async fn create_role(&self, spec: &RoleSpec) -> ClientResult<String> {
        self.record("create_role", &spec.name)?;
        self.state
            .lock()
            .unwrap()
            .role_tags
            .insert(spec.name.clone(), spec.tags.clone());
        Ok(format!("arn:aws:iam::{ACCOUNT}:role/{}", spec.name))
    }

    async fn put_role_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        _document: &str,
    ) -> ClientResult<()> {
        self.record("put_role_policy", format!("{role_name} {policy_name}"))
    }

    async fn role_tags(&self, role_name: &str) -> ClientResult<Tags> {
        self.record("role_tags", role_name)?;
        self.state
            .lock()
            .unwrap()
            .role_tags
            .get(role_name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("role {role_name}")))
    }

    async fn delete_role_policy(&self, role_name: &str, policy_name: &str) -> ClientResult<()> {
        self.record("delete_role_policy", format!("{role_name} {policy_name}"))
    }

    async fn delete_role(&self, role_name: &str) -> ClientResult<()> {
        self.record("delete_role", role_name)
    }
}

const LOG_GROUP_ARN_PREFIX: &str = "arn:aws:logs:eu-west-2:123456789012:log-group:";

#[async_trait]
impl LogSinkClient for FakeAws {
    async fn create_log_group(&self, name: &str, tags: &Tags) -> ClientResult<()> {
        self.record("create_log_group", name)?;
        self.state
            .lock()
            .unwrap()
            .log_group_tags
            .insert(name.to_string(), tags.clone());
        Ok(())
    }

    async fn put_retention_policy(&self, name: &str, days: u32) -> ClientResult<()> {
        self.record("put_retention_policy", format!("{name} {days}"))
    }

    async fn log_group_arn(&self, name: &str) -> ClientResult<String> {
        self.record("log_group_arn", name)?;
        if self.state.lock().unwrap().log_group_tags.contains_key(name) {
            Ok(format!("{LOG_GROUP_ARN_PREFIX}{name}"))
        } else {
            Err(ClientError::NotFound(format!("log group {name}")))
        }
    }

    async fn log_group_tags(&self, arn: &str) -> ClientResult<Tags> {
        self.record("log_group_tags", arn)?;
        let name = arn.trim_start_matches(LOG_GROUP_ARN_PREFIX);
        Ok(self
            .state
            .lock()
            .unwrap()
            .log_group_tags
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_log_group(&self, name: &str) -> ClientResult<()> {
        self.record("delete_log_group", name)
    }

    async fn start_query(&self, request: &QueryRequest) -> ClientResult<String> {
        self.record("start_query", request.log_group_names.join(","))?;
        self.state
            .lock()
            .unwrap()
            .query_requests
            .push(request.clone());
        Ok("query-1".to_string())
    }

    async fn query_results(&self, query_id: &str) -> ClientResult<QueryResults> {
        self.record("query_results", query_id)?;
        let (status, records, latency) = {
            let mut state = self.state.lock().unwrap();
            let status = if state.query_statuses.len() > 1 {
                state.query_statuses.pop_front()
            } else {
                state.query_statuses.front().copied()
            }
            .unwrap_or(QueryStatus::Complete);
            let records = if status == QueryStatus::Complete {
                state.records.clone()
            } else {
                Vec::new()
            };
            (status, records, state.query_latency)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(QueryResults { status, records })
    }
}
