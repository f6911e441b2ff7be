//! Shared types for flowlogs
//!
//! This crate contains data structures used across multiple flowlogs crates.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

// ============================================================================
// Tag Types
// ============================================================================

/// Tag key joining flow logs, roles and log groups created for one target
pub const NAME_TAG: &str = "Name";

/// Key/value tags attached to cloud resources
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Copy of these tags without the given key
    pub fn without(&self, key: &str) -> Self {
        let mut out = self.clone();
        out.0.remove(key);
        out
    }

    /// Value of the `Name` tag, empty when missing
    pub fn name(&self) -> &str {
        self.get(NAME_TAG).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that `live` carries every tag in `self`.
    ///
    /// Extra tags on `live` are allowed; a missing key or a different value
    /// is reported as the first mismatch in key order.
    pub fn verify(&self, live: &Tags) -> Result<(), TagMismatch> {
        for (key, expected) in &self.0 {
            match live.0.get(key) {
                None => {
                    return Err(TagMismatch::MissingKey {
                        key: key.clone(),
                        expected: expected.clone(),
                    });
                }
                Some(actual) if actual != expected => {
                    return Err(TagMismatch::ValueMismatch {
                        key: key.clone(),
                        expected: expected.clone(),
                        actual: actual.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<HashMap<String, String>> for Tags {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

/// Why a live resource does not carry the expected tags
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TagMismatch {
    #[error("missing tag {key} (expected {expected})")]
    MissingKey { key: String, expected: String },

    #[error("tag {key} is {actual}, expected {expected}")]
    ValueMismatch {
        key: String,
        expected: String,
        actual: String,
    },
}

// ============================================================================
// Network Resource Types
// ============================================================================

/// Anything that maps onto a target identity
pub trait Identified {
    fn identity(&self) -> String;
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

/// VPC information
#[derive(Clone, Debug, Default)]
pub struct Vpc {
    pub id: String,
    pub name: String,
    pub cidr: String,
    pub is_default: bool,
    pub tags: Tags,
}

impl fmt::Display for Vpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, or_dash(&self.name))
    }
}

impl Identified for Vpc {
    fn identity(&self) -> String {
        self.id.clone()
    }
}

/// Subnet information
#[derive(Clone, Debug, Default)]
pub struct Subnet {
    pub vpc_id: String,
    pub id: String,
    pub arn: String,
    pub name: String,
    pub availability_zone: String,
    pub cidr_block: String,
    pub available_ip_address_count: i64,
    pub default_for_az: bool,
    pub tags: Tags,
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, or_dash(&self.name))
    }
}

impl Identified for Subnet {
    fn identity(&self) -> String {
        self.id.clone()
    }
}

#[derive(Clone, Debug, Default)]
pub struct SecurityGroup {
    pub vpc_id: String,
    pub id: String,
    pub group_name: String,
    pub description: String,
    pub tags: Tags,
}

impl fmt::Display for SecurityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, or_dash(&self.group_name))
    }
}

impl Identified for SecurityGroup {
    fn identity(&self) -> String {
        self.id.clone()
    }
}

/// NAT gateway with its primary network interface
#[derive(Clone, Debug, Default)]
pub struct NatGateway {
    pub id: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub network_interface_id: String,
    pub tags: Tags,
}

impl fmt::Display for NatGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.id, or_dash(self.tags.name()))
    }
}

impl Identified for NatGateway {
    fn identity(&self) -> String {
        self.id.clone()
    }
}

/// Running compute instance
#[derive(Clone, Debug, Default)]
pub struct Instance {
    pub vpc_id: String,
    pub subnet_id: String,
    pub id: String,
    /// Value of the `Name` tag
    pub name: String,
    /// In-use network interfaces only
    pub network_interface_ids: Vec<String>,
    pub tags: Tags,
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", or_dash(&self.name), self.id)
    }
}

impl Identified for Instance {
    fn identity(&self) -> String {
        format!("{}{}", TargetKind::Instance.name_prefix(), self.name)
    }
}

/// Group instances by name, names sorted
pub fn instances_by_name(instances: &[Instance]) -> BTreeMap<String, Vec<Instance>> {
    let mut out: BTreeMap<String, Vec<Instance>> = BTreeMap::new();
    for instance in instances {
        out.entry(instance.name.clone())
            .or_default()
            .push(instance.clone());
    }
    out
}

#[derive(Clone, Debug, Default)]
pub struct VpcEndpoint {
    pub id: String,
    pub endpoint_type: String,
    pub dns_names: Vec<String>,
    pub network_interface_ids: Vec<String>,
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    pub owner_id: String,
    pub service_name: String,
    pub state: String,
    pub tags: Tags,
}

impl fmt::Display for VpcEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.tags.get(NAME_TAG) {
            Some(tag) => format!("{} - {}", tag, self.service_name),
            None => self.service_name.clone(),
        };
        write!(f, "{} [{}] [vpc {}]", self.id, name, self.vpc_id)
    }
}

impl Identified for VpcEndpoint {
    fn identity(&self) -> String {
        self.id.clone()
    }
}

/// Network interface with a derived type and display name
#[derive(Clone, Debug, Default)]
pub struct NetworkInterface {
    pub id: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub owner_id: String,
    pub public_ip: String,
    pub private_ip: String,
    pub private_ips: Vec<String>,
    pub description: String,
    /// Provider interface type, e.g. `interface`, `nat_gateway`
    pub interface_type: String,
    pub requester_id: String,
    pub requester_managed: bool,
    pub instance_id: String,
    pub status: String,
    /// Classified type, e.g. `instance`, `alb`, `lambda`
    pub kind: String,
    /// Best-effort display name, `-` when unknown
    pub name: String,
}

impl NetworkInterface {
    fn has_ip(&self, ip: &str) -> bool {
        self.private_ips
            .iter()
            .chain([&self.private_ip, &self.public_ip])
            .any(|candidate| candidate == ip)
    }
}

/// Collection of network interfaces with lookup helpers
#[derive(Clone, Debug, Default)]
pub struct NetworkInterfaces(Vec<NetworkInterface>);

impl NetworkInterfaces {
    pub fn get_by_id(&self, id: &str) -> Option<&NetworkInterface> {
        self.0.iter().find(|ni| ni.id == id)
    }

    pub fn get_by_ip(&self, ip: &str) -> Vec<&NetworkInterface> {
        self.0.iter().filter(|ni| ni.has_ip(ip)).collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.0.iter().map(|ni| ni.id.clone()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NetworkInterface> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<NetworkInterface>> for NetworkInterfaces {
    fn from(items: Vec<NetworkInterface>) -> Self {
        Self(items)
    }
}

impl FromIterator<NetworkInterface> for NetworkInterfaces {
    fn from_iter<I: IntoIterator<Item = NetworkInterface>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Target Types
// ============================================================================

/// Kind of monitored resource, as encoded in the flow log name prefix
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Instance,
    SecurityGroup,
    NatGateway,
    Subnet,
    Vpc,
    Endpoint,
    /// Every flow log created by this tool
    All,
}

impl TargetKind {
    /// Prefix of the `Name` tag for flow logs of this kind
    pub fn name_prefix(&self) -> &'static str {
        match self {
            Self::Instance => "instance-",
            Self::SecurityGroup => "sg-",
            Self::NatGateway => "nat-",
            Self::Subnet => "subnet-",
            Self::Vpc => "vpc-",
            Self::Endpoint => "vpce-",
            Self::All => "",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::SecurityGroup => "security group",
            Self::NatGateway => "nat gateway",
            Self::Subnet => "subnet",
            Self::Vpc => "vpc",
            Self::Endpoint => "vpc endpoint",
            Self::All => "all",
        }
    }
}

/// A resource (or instance group) to create flow logs for
#[derive(Clone, Debug)]
pub enum Target {
    Vpc(Vpc),
    Subnet(Subnet),
    SecurityGroup(SecurityGroup),
    NatGateway(NatGateway),
    /// Instances sharing one `Name` tag, monitored as a single unit
    Instances(Vec<Instance>),
    Endpoint(VpcEndpoint),
}

impl Target {
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Vpc(_) => TargetKind::Vpc,
            Self::Subnet(_) => TargetKind::Subnet,
            Self::SecurityGroup(_) => TargetKind::SecurityGroup,
            Self::NatGateway(_) => TargetKind::NatGateway,
            Self::Instances(_) => TargetKind::Instance,
            Self::Endpoint(_) => TargetKind::Endpoint,
        }
    }

    /// Derive the target identity.
    ///
    /// Instances are keyed by their shared name (`instance-<name>`); an
    /// empty group or a group with differing names is rejected.
    pub fn identity(&self) -> Result<String, TargetError> {
        match self {
            Self::Vpc(vpc) => Ok(vpc.identity()),
            Self::Subnet(subnet) => Ok(subnet.identity()),
            Self::SecurityGroup(sg) => Ok(sg.identity()),
            Self::NatGateway(nat) => Ok(nat.identity()),
            Self::Endpoint(endpoint) => Ok(endpoint.identity()),
            Self::Instances(instances) => {
                let first = instances.first().ok_or(TargetError::NoInstances)?;
                for pair in instances.windows(2) {
                    if pair[0].name != pair[1].name {
                        return Err(TargetError::MixedInstanceNames {
                            first: pair[0].name.clone(),
                            second: pair[1].name.clone(),
                        });
                    }
                }
                Ok(first.identity())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("no instances provided")]
    NoInstances,

    #[error("supplied instances do not have the same name: {first} {second}")]
    MixedInstanceNames { first: String, second: String },
}

// ============================================================================
// Flow Log Types
// ============================================================================

/// A flow log (capture configuration) as stored by the provider
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowLog {
    pub id: String,
    /// Value of the `Name` tag, the target identity it was created for
    pub name: String,
    pub resource_id: String,
    pub log_group_name: String,
    pub creation_time: Option<DateTime<Utc>>,
    pub tags: Tags,
}

impl FlowLog {
    pub fn new(
        id: String,
        resource_id: String,
        log_group_name: String,
        creation_time: Option<DateTime<Utc>>,
        tags: Tags,
    ) -> Self {
        Self {
            id,
            name: tags.name().to_string(),
            resource_id,
            log_group_name,
            creation_time,
            tags,
        }
    }
}

impl fmt::Display for FlowLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} - {}]", self.name, self.id, self.resource_id)
    }
}

/// Collection of flow logs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowLogs(Vec<FlowLog>);

impl FlowLogs {
    pub fn ids(&self) -> Vec<String> {
        self.0.iter().map(|fl| fl.id.clone()).collect()
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.0.iter().map(|fl| fl.name.clone()).collect()
    }

    /// Flow logs grouped by name, names sorted
    pub fn by_name(&self) -> BTreeMap<String, FlowLogs> {
        let mut out: BTreeMap<String, FlowLogs> = BTreeMap::new();
        for flow_log in &self.0 {
            out.entry(flow_log.name.clone())
                .or_default()
                .0
                .push(flow_log.clone());
        }
        out
    }

    /// Drop resources that already have flow logs
    pub fn exclude_monitored<T: Identified>(&self, items: Vec<T>) -> Vec<T> {
        let names = self.names();
        items
            .into_iter()
            .filter(|item| !names.contains(&item.identity()))
            .collect()
    }

    pub fn first(&self) -> Option<&FlowLog> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FlowLog> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<FlowLog>> for FlowLogs {
    fn from(items: Vec<FlowLog>) -> Self {
        Self(items)
    }
}

impl FromIterator<FlowLog> for FlowLogs {
    fn from_iter<I: IntoIterator<Item = FlowLog>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FlowLogs {
    type Item = FlowLog;
    type IntoIter = std::vec::IntoIter<FlowLog>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FlowLogs {
    type Item = &'a FlowLog;
    type IntoIter = std::slice::Iter<'a, FlowLog>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// Log Record Types
// ============================================================================

/// Value the log store uses for fields that are not set
pub const ABSENT: &str = "-";

/// One row returned by the log store, field name to string value
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogRecord(HashMap<String, String>);

impl LogRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Field value, `-` when the record does not carry it
    pub fn field(&self, field: &str) -> &str {
        self.get(field).unwrap_or(ABSENT)
    }

    /// Field value, `None` when missing, empty or `-`
    pub fn present(&self, field: &str) -> Option<&str> {
        self.get(field).filter(|v| !v.is_empty() && *v != ABSENT)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LogRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
