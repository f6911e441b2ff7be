use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowlogs_types::{
    FlowLog, FlowLogs, Instance, NAME_TAG, NatGateway, NetworkInterface, NetworkInterfaces,
    SecurityGroup, Subnet, Tags, Vpc, VpcEndpoint,
};
use serde::Deserialize;
use serde_json::json;

use super::{AwsCli, AwsTag, args, filters, tag_list, to_tags};
use crate::client::{ClientResult, CreateFlowLogsRequest, InterfaceFilter, NetworkClient};
use crate::error::ClientError;
use crate::interfaces::classify;

const LOG_DESTINATION_TYPE: &str = "cloud-watch-logs";
const IN_USE: &str = "in-use";

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct VpcsPage {
    vpcs: Vec<VpcItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct VpcItem {
    vpc_id: String,
    cidr_block: String,
    is_default: bool,
    tags: Vec<AwsTag>,
}

impl From<VpcItem> for Vpc {
    fn from(item: VpcItem) -> Self {
        let tags = to_tags(item.tags);
        Self {
            id: item.vpc_id,
            name: tags.name().to_string(),
            cidr: item.cidr_block,
            is_default: item.is_default,
            tags,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SubnetsPage {
    subnets: Vec<SubnetItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SubnetItem {
    vpc_id: String,
    subnet_id: String,
    subnet_arn: String,
    availability_zone: String,
    cidr_block: String,
    available_ip_address_count: i64,
    default_for_az: bool,
    tags: Vec<AwsTag>,
}

impl From<SubnetItem> for Subnet {
    fn from(item: SubnetItem) -> Self {
        let tags = to_tags(item.tags);
        Self {
            vpc_id: item.vpc_id,
            id: item.subnet_id,
            arn: item.subnet_arn,
            name: tags.name().to_string(),
            availability_zone: item.availability_zone,
            cidr_block: item.cidr_block,
            available_ip_address_count: item.available_ip_address_count,
            default_for_az: item.default_for_az,
            tags,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SecurityGroupsPage {
    security_groups: Vec<SecurityGroupItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SecurityGroupItem {
    vpc_id: String,
    group_id: String,
    group_name: String,
    description: String,
    tags: Vec<AwsTag>,
}

impl From<SecurityGroupItem> for SecurityGroup {
    fn from(item: SecurityGroupItem) -> Self {
        Self {
            vpc_id: item.vpc_id,
            id: item.group_id,
            group_name: item.group_name,
            description: item.description,
            tags: to_tags(item.tags),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct NatGatewaysPage {
    nat_gateways: Vec<NatGatewayItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct NatGatewayItem {
    nat_gateway_id: String,
    vpc_id: String,
    subnet_id: String,
    nat_gateway_addresses: Vec<NatGatewayAddress>,
    tags: Vec<AwsTag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct NatGatewayAddress {
    network_interface_id: String,
    is_primary: bool,
}

impl From<NatGatewayItem> for NatGateway {
    fn from(item: NatGatewayItem) -> Self {
        let network_interface_id = item
            .nat_gateway_addresses
            .into_iter()
            .find(|address| address.is_primary)
            .map(|address| address.network_interface_id)
            .unwrap_or_default();
        Self {
            id: item.nat_gateway_id,
            vpc_id: item.vpc_id,
            subnet_id: item.subnet_id,
            network_interface_id,
            tags: to_tags(item.tags),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ReservationsPage {
    reservations: Vec<Reservation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Reservation {
    instances: Vec<InstanceItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstanceItem {
    instance_id: String,
    vpc_id: String,
    subnet_id: String,
    network_interfaces: Vec<InstanceInterface>,
    tags: Vec<AwsTag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstanceInterface {
    network_interface_id: String,
    status: String,
}

impl From<InstanceItem> for Instance {
    fn from(item: InstanceItem) -> Self {
        let tags = to_tags(item.tags);
        Self {
            vpc_id: item.vpc_id,
            subnet_id: item.subnet_id,
            id: item.instance_id,
            name: tags.name().to_string(),
            network_interface_ids: item
                .network_interfaces
                .into_iter()
                .filter(|ni| ni.status == IN_USE)
                .map(|ni| ni.network_interface_id)
                .collect(),
            tags,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct VpcEndpointsPage {
    vpc_endpoints: Vec<VpcEndpointItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct VpcEndpointItem {
    vpc_endpoint_id: String,
    vpc_endpoint_type: String,
    dns_entries: Vec<DnsEntry>,
    network_interface_ids: Vec<String>,
    vpc_id: String,
    subnet_ids: Vec<String>,
    owner_id: String,
    service_name: String,
    state: String,
    tags: Vec<AwsTag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DnsEntry {
    dns_name: String,
}

impl From<VpcEndpointItem> for VpcEndpoint {
    fn from(item: VpcEndpointItem) -> Self {
        Self {
            id: item.vpc_endpoint_id,
            endpoint_type: item.vpc_endpoint_type,
            dns_names: item.dns_entries.into_iter().map(|e| e.dns_name).collect(),
            network_interface_ids: item.network_interface_ids,
            vpc_id: item.vpc_id,
            subnet_ids: item.subnet_ids,
            owner_id: item.owner_id,
            service_name: item.service_name,
            state: item.state,
            tags: to_tags(item.tags),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct NetworkInterfacesPage {
    network_interfaces: Vec<NetworkInterfaceItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct NetworkInterfaceItem {
    network_interface_id: String,
    vpc_id: String,
    subnet_id: String,
    owner_id: String,
    association: Option<Association>,
    private_ip_address: String,
    private_ip_addresses: Vec<PrivateIp>,
    description: String,
    interface_type: String,
    requester_id: String,
    requester_managed: bool,
    attachment: Option<Attachment>,
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Association {
    public_ip: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Attachment {
    instance_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct PrivateIp {
    private_ip_address: String,
}

impl From<NetworkInterfaceItem> for NetworkInterface {
    fn from(item: NetworkInterfaceItem) -> Self {
        let mut ni = Self {
            id: item.network_interface_id,
            vpc_id: item.vpc_id,
            subnet_id: item.subnet_id,
            owner_id: item.owner_id,
            public_ip: item.association.map(|a| a.public_ip).unwrap_or_default(),
            private_ip: item.private_ip_address,
            private_ips: item
                .private_ip_addresses
                .into_iter()
                .map(|ip| ip.private_ip_address)
                .collect(),
            description: item.description,
            interface_type: item.interface_type,
            requester_id: item.requester_id,
            requester_managed: item.requester_managed,
            instance_id: item.attachment.map(|a| a.instance_id).unwrap_or_default(),
            status: item.status,
            kind: String::new(),
            name: String::new(),
        };
        classify(&mut ni);
        ni
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FlowLogsPage {
    flow_logs: Vec<FlowLogItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FlowLogItem {
    flow_log_id: String,
    resource_id: String,
    log_group_name: String,
    creation_time: Option<DateTime<Utc>>,
    tags: Vec<AwsTag>,
}

impl From<FlowLogItem> for FlowLog {
    fn from(item: FlowLogItem) -> Self {
        FlowLog::new(
            item.flow_log_id,
            item.resource_id,
            item.log_group_name,
            item.creation_time,
            to_tags(item.tags),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FlowLogsResponse {
    unsuccessful: Vec<UnsuccessfulItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct UnsuccessfulItem {
    resource_id: String,
    error: UnsuccessfulError,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct UnsuccessfulError {
    code: String,
    message: String,
}

impl FlowLogsResponse {
    fn into_result(self) -> Result<(), ClientError> {
        if self.unsuccessful.is_empty() {
            return Ok(());
        }
        let reasons = self
            .unsuccessful
            .iter()
            .map(|item| format!("{} ({}: {})", item.resource_id, item.error.code, item.error.message))
            .collect::<Vec<_>>()
            .join(", ");
        Err(ClientError::Unsuccessful(reasons))
    }
}

// ============================================================================
// NetworkClient
// ============================================================================

impl AwsCli {
    async fn list<P, T>(&self, mut args: Vec<String>, items: impl Fn(P) -> Vec<T>) -> ClientResult<Vec<T>>
    where
        P: serde::de::DeserializeOwned,
    {
        args.insert(0, "ec2".to_string());
        let pages: Vec<P> = self.paginate(args).await?;
        Ok(pages.into_iter().flat_map(items).collect())
    }
}

#[async_trait]
impl NetworkClient for AwsCli {
    async fn list_vpcs(&self, owner_id: &str) -> ClientResult<Vec<Vpc>> {
        let filter = filters([("state", "available"), ("owner-id", owner_id)]);
        self.list(args(["describe-vpcs", "--filters", &filter]), |p: VpcsPage| {
            p.vpcs.into_iter().map(Vpc::from).collect()
        })
        .await
    }

    async fn list_subnets(&self, owner_id: &str, vpc_id: &str) -> ClientResult<Vec<Subnet>> {
        let filter = filters([
            ("state", "available"),
            ("owner-id", owner_id),
            ("vpc-id", vpc_id),
        ]);
        self.list(args(["describe-subnets", "--filters", &filter]), |p: SubnetsPage| {
            p.subnets.into_iter().map(Subnet::from).collect()
        })
        .await
    }

    async fn list_security_groups(
        &self,
        owner_id: &str,
        vpc_id: &str,
    ) -> ClientResult<Vec<SecurityGroup>> {
        let filter = filters([("owner-id", owner_id), ("vpc-id", vpc_id)]);
        self.list(
            args(["describe-security-groups", "--filters", &filter]),
            |p: SecurityGroupsPage| p.security_groups.into_iter().map(SecurityGroup::from).collect(),
        )
        .await
    }

    async fn list_nat_gateways(&self, vpc_id: &str) -> ClientResult<Vec<NatGateway>> {
        // describe-nat-gateways takes --filter, not --filters
        let filter = filters([("vpc-id", vpc_id)]);
        self.list(
            args(["describe-nat-gateways", "--filter", &filter]),
            |p: NatGatewaysPage| p.nat_gateways.into_iter().map(NatGateway::from).collect(),
        )
        .await
    }

    async fn list_instances(&self, vpc_id: &str) -> ClientResult<Vec<Instance>> {
        let filter = filters([("instance-state-name", "running"), ("vpc-id", vpc_id)]);
        self.list(
            args(["describe-instances", "--filters", &filter]),
            |p: ReservationsPage| {
                p.reservations
                    .into_iter()
                    .flat_map(|r| r.instances)
                    .map(Instance::from)
                    .collect()
            },
        )
        .await
    }

    async fn list_vpc_endpoints(&self, vpc_id: &str) -> ClientResult<Vec<VpcEndpoint>> {
        let filter = filters([("vpc-id", vpc_id)]);
        self.list(
            args(["describe-vpc-endpoints", "--filters", &filter]),
            |p: VpcEndpointsPage| p.vpc_endpoints.into_iter().map(VpcEndpoint::from).collect(),
        )
        .await
    }

    async fn list_network_interfaces(
        &self,
        filter: &InterfaceFilter,
    ) -> ClientResult<NetworkInterfaces> {
        let mut pairs = Vec::new();
        if let Some(vpc_id) = &filter.vpc_id {
            pairs.push(("vpc-id", vpc_id.as_str()));
        }
        if let Some(group_id) = &filter.security_group_id {
            pairs.push(("group-id", group_id.as_str()));
        }

        let mut call = args(["describe-network-interfaces"]);
        if !pairs.is_empty() {
            call.extend(["--filters".to_string(), filters(pairs)]);
        }
        let interfaces = self
            .list(call, |p: NetworkInterfacesPage| {
                p.network_interfaces
                    .into_iter()
                    .map(NetworkInterface::from)
                    .collect()
            })
            .await?;
        Ok(interfaces.into())
    }

    async fn create_flow_logs(&self, request: &CreateFlowLogsRequest) -> ClientResult<()> {
        let tag_specifications = json!([{
            "ResourceType": "vpc-flow-log",
            "Tags": tag_list(&request.tags),
        }])
        .to_string();

        let mut call = args([
            "ec2",
            "create-flow-logs",
            "--resource-type",
            request.resource_type.as_str(),
            "--traffic-type",
            "ALL",
            "--log-destination-type",
            LOG_DESTINATION_TYPE,
            "--log-group-name",
            &request.log_group_name,
            "--deliver-logs-permission-arn",
            &request.role_arn,
            "--log-format",
            &request.log_format,
            "--tag-specifications",
            &tag_specifications,
            "--resource-ids",
        ]);
        call.extend(request.resource_ids.iter().cloned());

        let response: FlowLogsResponse = self.call(call).await?;
        response.into_result()
    }

    async fn list_flow_logs(&self, tags: &Tags) -> ClientResult<FlowLogs> {
        let tag_filters: Vec<(String, &str)> = tags
            .iter()
            .filter(|(key, _)| *key != NAME_TAG)
            .map(|(key, value)| (format!("tag:{key}"), value))
            .collect();
        let mut pairs = vec![("log-destination-type", LOG_DESTINATION_TYPE), ("tag-key", NAME_TAG)];
        pairs.extend(tag_filters.iter().map(|(key, value)| (key.as_str(), *value)));

        // describe-flow-logs takes --filter, not --filters
        let filter = filters(pairs);
        let flow_logs = self
            .list(args(["describe-flow-logs", "--filter", &filter]), |p: FlowLogsPage| {
                p.flow_logs.into_iter().map(FlowLog::from).collect()
            })
            .await?;
        Ok(flow_logs.into())
    }

    async fn delete_flow_logs(&self, ids: &[String]) -> ClientResult<()> {
        let mut call = args(["ec2", "delete-flow-logs", "--flow-log-ids"]);
        call.extend(ids.iter().cloned());
        let response: FlowLogsResponse = self.call(call).await?;
        response.into_result()
    }
}
