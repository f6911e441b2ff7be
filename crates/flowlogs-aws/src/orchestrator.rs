//! Flow log lifecycle across the network, role and log store clients

use std::time::Duration;

use chrono::Utc;
use flowlogs_query::CompiledQuery;
use flowlogs_query::catalog::fields::{FLOW_LOG_FIELDS_V2_V5, FLOW_LOG_FIELDS_V7, log_format};
use flowlogs_types::{
    FlowLogs, Instance, LogRecord, NAME_TAG, NatGateway, NetworkInterfaces, SecurityGroup, Subnet,
    Tags, Target, TargetKind, Vpc, VpcEndpoint,
};
use tracing::{debug, info, warn};

use crate::client::{
    CreateFlowLogsRequest, InterfaceFilter, LogSinkClient, NetworkClient, QueryRequest,
    QueryStatus, ResourceType, RoleClient, RoleSpec,
};
use crate::error::{ClientResultExt, FlowLogsError, Result};
use crate::naming::{self, RETENTION_DAYS, TagPolicy};
use crate::policy::{self, POLICY_NAME, ROLE_DESCRIPTION};

/// Account and region every call is made against
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AwsConfig {
    pub account: String,
    pub region: String,
}

/// How long to wait for a log query to finish
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Wait after submitting, before the first status check
    pub initial_delay: Duration,
    pub retry_delay: Duration,
    /// Status checks, including the first
    pub max_attempts: u32,
    /// Upper bound on the whole result phase
    pub deadline: Duration,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            retry_delay: Duration::from_secs(2),
            max_attempts: 6,
            deadline: Duration::from_secs(20),
        }
    }
}

/// Creates, lists, queries and deletes flow logs together with the log
/// group and role each one needs.
///
/// Every call is sequential. Nothing is cached between calls; all state
/// lives in the provider.
pub struct FlowLogsClient<N, R, L> {
    config: AwsConfig,
    tags: TagPolicy,
    query_policy: QueryPolicy,
    network: N,
    roles: R,
    logs: L,
}

impl<N, R, L> FlowLogsClient<N, R, L>
where
    N: NetworkClient,
    R: RoleClient,
    L: LogSinkClient,
{
    pub fn new(config: AwsConfig, network: N, roles: R, logs: L) -> Self {
        Self {
            config,
            tags: TagPolicy::default(),
            query_policy: QueryPolicy::default(),
            network,
            roles,
            logs,
        }
    }

    pub fn with_tag_policy(mut self, tags: TagPolicy) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_query_policy(mut self, query_policy: QueryPolicy) -> Self {
        self.query_policy = query_policy;
        self
    }

    pub fn config(&self) -> &AwsConfig {
        &self.config
    }

    // ========================================================================
    // Resource listings
    // ========================================================================

    pub async fn list_vpcs(&self) -> Result<Vec<Vpc>> {
        self.network
            .list_vpcs(&self.config.account)
            .await
            .during("list vpcs", &self.config.account)
    }

    pub async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>> {
        self.network
            .list_subnets(&self.config.account, vpc_id)
            .await
            .during("list subnets", vpc_id)
    }

    pub async fn list_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroup>> {
        self.network
            .list_security_groups(&self.config.account, vpc_id)
            .await
            .during("list security groups", vpc_id)
    }

    pub async fn list_nat_gateways(&self, vpc_id: &str) -> Result<Vec<NatGateway>> {
        self.network
            .list_nat_gateways(vpc_id)
            .await
            .during("list nat gateways", vpc_id)
    }

    pub async fn list_instances(&self, vpc_id: &str) -> Result<Vec<Instance>> {
        self.network
            .list_instances(vpc_id)
            .await
            .during("list instances", vpc_id)
    }

    pub async fn list_vpc_endpoints(&self, vpc_id: &str) -> Result<Vec<VpcEndpoint>> {
        self.network
            .list_vpc_endpoints(vpc_id)
            .await
            .during("list vpc endpoints", vpc_id)
    }

    pub async fn list_network_interfaces(&self) -> Result<NetworkInterfaces> {
        self.network
            .list_network_interfaces(&InterfaceFilter::all())
            .await
            .during("list network interfaces", &self.config.region)
    }

    // ========================================================================
    // Flow logs
    // ========================================================================

    /// Flow logs created by this tool whose name matches the kind prefix
    pub async fn list_flow_logs(&self, kind: TargetKind) -> Result<FlowLogs> {
        let flow_logs = self
            .network
            .list_flow_logs(&self.tags.shared())
            .await
            .during("list flow logs", kind.label())?;

        let prefix = kind.name_prefix();
        if prefix.is_empty() {
            debug!("returning all flow logs, no name prefix");
            return Ok(flow_logs);
        }

        Ok(flow_logs
            .into_iter()
            .filter(|flow_log| {
                let matches = flow_log.name.starts_with(prefix);
                if !matches {
                    debug!(name = %flow_log.name, prefix, "flow log does not match name prefix");
                }
                matches
            })
            .collect())
    }

    /// Create the log group, role and flow log(s) for a target.
    ///
    /// Returns the log group name. A failure after the log group exists
    /// leaves the earlier resources in place; `delete all` removes them.
    pub async fn create_flow_logs(&self, target: &Target) -> Result<String> {
        let identity = target.identity()?;
        let tags = self.tags.tags_for(&identity);
        let (resource_type, resource_ids) = self.resolve_resources(target, &identity).await?;

        let log_group_name = naming::log_group_name(&identity);
        self.create_log_group(&log_group_name, &tags).await?;

        let role_name = naming::role_name(&self.config.region, &identity);
        let role_arn = self.create_role(&role_name, &tags).await?;

        let mut request = CreateFlowLogsRequest {
            resource_type,
            resource_ids,
            log_group_name: log_group_name.clone(),
            role_arn,
            log_format: log_format(
                FLOW_LOG_FIELDS_V2_V5
                    .iter()
                    .chain(FLOW_LOG_FIELDS_V7)
                    .copied(),
            ),
            tags,
        };

        match self.network.create_flow_logs(&request).await {
            Err(err) if err.is_ecs_fields_denied() => {
                warn!(%identity, "ECS fields not available, creating flow logs without them");
                request.log_format = log_format(FLOW_LOG_FIELDS_V2_V5.iter().copied());
                self.network
                    .create_flow_logs(&request)
                    .await
                    .during("create flow logs", &identity)?;
            }
            other => other.during("create flow logs", &identity)?,
        }

        info!(
            %identity,
            resource_type = %request.resource_type,
            resources = request.resource_ids.len(),
            "flow logs created"
        );
        Ok(log_group_name)
    }

    /// Provider resources the flow log attaches to
    async fn resolve_resources(
        &self,
        target: &Target,
        identity: &str,
    ) -> Result<(ResourceType, Vec<String>)> {
        let (resource_type, ids) = match target {
            Target::Vpc(vpc) => (ResourceType::Vpc, vec![vpc.id.clone()]),
            Target::Subnet(subnet) => (ResourceType::Subnet, vec![subnet.id.clone()]),
            Target::Endpoint(endpoint) => (ResourceType::VpcEndpoint, vec![endpoint.id.clone()]),
            Target::NatGateway(nat) => (
                ResourceType::NetworkInterface,
                vec![nat.network_interface_id.clone()],
            ),
            Target::SecurityGroup(sg) => {
                let interfaces = self
                    .network
                    .list_network_interfaces(&InterfaceFilter::security_group(&sg.vpc_id, &sg.id))
                    .await
                    .during("list security group network interfaces", &sg.id)?;
                (ResourceType::NetworkInterface, interfaces.ids())
            }
            Target::Instances(instances) => {
                let mut ids: Vec<String> = Vec::new();
                for id in instances.iter().flat_map(|i| &i.network_interface_ids) {
                    if !ids.contains(id) {
                        ids.push(id.clone());
                    }
                }
                (ResourceType::NetworkInterface, ids)
            }
        };

        let ids: Vec<String> = ids.into_iter().filter(|id| !id.is_empty()).collect();
        if ids.is_empty() {
            return Err(FlowLogsError::Validation(format!(
                "{identity} has no resources to attach flow logs to"
            )));
        }
        Ok((resource_type, ids))
    }

    async fn create_log_group(&self, name: &str, tags: &Tags) -> Result<()> {
        self.logs
            .create_log_group(name, tags)
            .await
            .during("create log group", name)?;
        self.logs
            .put_retention_policy(name, RETENTION_DAYS)
            .await
            .during("put retention policy on log group", name)?;
        info!(log_group = name, retention_days = RETENTION_DAYS, "log group created");
        Ok(())
    }

    async fn create_role(&self, name: &str, tags: &Tags) -> Result<String> {
        let spec = RoleSpec {
            name: name.to_string(),
            description: ROLE_DESCRIPTION.to_string(),
            trust_policy: policy::trust_policy(),
            tags: tags.clone(),
        };
        let arn = self
            .roles
            .create_role(&spec)
            .await
            .during("create iam role", name)?;
        self.roles
            .put_role_policy(name, POLICY_NAME, &policy::permissions_policy())
            .await
            .during("put iam role policy", name)?;
        info!(role = name, "iam role created");
        Ok(arn)
    }

    /// Delete flow logs, then their roles, then their log groups.
    ///
    /// Roles and log groups are only deleted when their live tags carry the
    /// flow log's ownership tags.
    pub async fn delete_resources(&self, flow_logs: &FlowLogs) -> Result<()> {
        if flow_logs.is_empty() {
            info!("no flow logs provided, nothing to delete");
            return Ok(());
        }

        self.delete_flow_logs(flow_logs).await?;
        self.delete_roles(flow_logs).await?;
        self.delete_log_groups(flow_logs).await
    }

    pub async fn delete_flow_logs(&self, flow_logs: &FlowLogs) -> Result<()> {
        if flow_logs.is_empty() {
            return Ok(());
        }
        let ids = flow_logs.ids();
        self.network
            .delete_flow_logs(&ids)
            .await
            .during("delete flow logs", ids.join(", "))?;
        info!(count = ids.len(), "flow logs deleted");
        Ok(())
    }

    pub async fn delete_roles(&self, flow_logs: &FlowLogs) -> Result<()> {
        let groups = flow_logs.by_name();
        debug!(count = groups.len(), "deleting iam roles");

        for (name, group) in &groups {
            let Some(expected) = ownership_tags(group) else {
                continue;
            };
            let role_name = naming::role_name(&self.config.region, name);

            let live = self
                .roles
                .role_tags(&role_name)
                .await
                .during("get iam role tags", &role_name)?;
            expected
                .verify(&live)
                .map_err(|mismatch| FlowLogsError::OwnershipMismatch {
                    resource: format!("iam role {role_name}"),
                    mismatch,
                })?;
            debug!(role = %role_name, "iam role matches ownership tags");

            // the role cannot be deleted while it still has an inline policy
            self.roles
                .delete_role_policy(&role_name, POLICY_NAME)
                .await
                .during("delete iam role policy", &role_name)?;
            self.roles
                .delete_role(&role_name)
                .await
                .during("delete iam role", &role_name)?;
            info!(role = %role_name, "iam role deleted");
        }
        Ok(())
    }

    pub async fn delete_log_groups(&self, flow_logs: &FlowLogs) -> Result<()> {
        let groups = flow_logs.by_name();
        debug!(count = groups.len(), "deleting log groups");

        for (name, group) in &groups {
            let Some(expected) = ownership_tags(group) else {
                continue;
            };
            let log_group_name = naming::log_group_name(name);

            let arn = self
                .logs
                .log_group_arn(&log_group_name)
                .await
                .during("describe log group", &log_group_name)?;
            let live = self
                .logs
                .log_group_tags(&arn)
                .await
                .during("list log group tags", &arn)?;
            expected
                .verify(&live)
                .map_err(|mismatch| FlowLogsError::OwnershipMismatch {
                    resource: format!("log group {log_group_name}"),
                    mismatch,
                })?;

            self.logs
                .delete_log_group(&log_group_name)
                .await
                .during("delete log group", &log_group_name)?;
            info!(log_group = %log_group_name, "log group deleted");
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Run a query over the log groups of the given flow logs
    pub async fn query_flow_logs(
        &self,
        flow_logs: &FlowLogs,
        query: &CompiledQuery,
    ) -> Result<Vec<LogRecord>> {
        if flow_logs.is_empty() {
            info!("no flow logs provided, nothing to query");
            return Ok(Vec::new());
        }

        let log_group_names: Vec<String> = flow_logs
            .names()
            .iter()
            .map(|name| naming::log_group_name(name))
            .collect();
        let end = Utc::now();
        let start = end - chrono::Duration::minutes(i64::from(query.window_minutes()));

        let request = QueryRequest {
            log_group_names,
            query: query.render(),
            start,
            end,
            limit: query.limit(),
        };
        let query_id = self
            .logs
            .start_query(&request)
            .await
            .during("start query", request.log_group_names.join(", "))?;
        debug!(%query_id, "query submitted");

        let mut attempts = 0;
        let mut status = QueryStatus::Unknown;
        let polled = tokio::time::timeout(
            self.query_policy.deadline,
            self.poll_query(&query_id, &mut attempts, &mut status),
        )
        .await;

        match polled {
            Ok(result) => result,
            Err(_) => Err(FlowLogsError::QueryIncomplete {
                query_id,
                status,
                attempts,
            }),
        }
    }

    async fn poll_query(
        &self,
        query_id: &str,
        attempts: &mut u32,
        status: &mut QueryStatus,
    ) -> Result<Vec<LogRecord>> {
        let policy = &self.query_policy;
        tokio::time::sleep(policy.initial_delay).await;

        loop {
            *attempts += 1;
            let results = self
                .logs
                .query_results(query_id)
                .await
                .during("get query results", query_id)?;
            *status = results.status;

            if results.status == QueryStatus::Complete {
                return Ok(results.records);
            }
            if !results.status.is_pending() || *attempts >= policy.max_attempts {
                return Err(FlowLogsError::QueryIncomplete {
                    query_id: query_id.to_string(),
                    status: results.status,
                    attempts: *attempts,
                });
            }

            debug!(
                query_id,
                status = %results.status,
                retry_in_ms = policy.retry_delay.as_millis() as u64,
                "query not finished, retrying"
            );
            tokio::time::sleep(policy.retry_delay).await;
        }
    }
}

/// Tags a group's role and log group must carry, `Name` excluded
fn ownership_tags(group: &FlowLogs) -> Option<Tags> {
    group.first().map(|flow_log| flow_log.tags.without(NAME_TAG))
}
