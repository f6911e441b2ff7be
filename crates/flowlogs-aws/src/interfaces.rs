//! Network interface classification
//!
//! Managed services create interfaces with recognisable descriptions. These
//! heuristics turn them into a short type and a display name for query output.

use std::sync::LazyLock;

use flowlogs_types::NetworkInterface;
use regex::Regex;

const NLB_INTERFACE_TYPE: &str = "network_load_balancer";
const NAT_INTERFACE_TYPE: &str = "nat_gateway";
const ELB_REQUESTER: &str = "amazon-elb";
const LAMBDA_PREFIX: &str = "AWS Lambda VPC ENI-";
const NAT_PREFIX: &str = "Interface for NAT Gateway ";

static UUID_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid suffix pattern compiles")
});

/// Fill in `kind` and `name` from the provider attributes
pub fn classify(ni: &mut NetworkInterface) {
    ni.kind = interface_kind(ni);
    ni.name = interface_name(ni);
}

/// Short type of the service owning the interface
pub fn interface_kind(ni: &NetworkInterface) -> String {
    let description = ni.description.as_str();

    let kind = if !ni.instance_id.is_empty() {
        "instance"
    } else if ni.interface_type == NLB_INTERFACE_TYPE {
        "nlb"
    } else if description.starts_with("ELB app/") {
        "alb"
    } else if ni.requester_id == ELB_REQUESTER && description.starts_with("ELB ") {
        "elb"
    } else if description.starts_with("ElastiCache ") {
        "elastic_cache"
    } else if description.starts_with(LAMBDA_PREFIX) {
        "lambda"
    } else if description.starts_with("datasync ") {
        "datasync"
    } else if description.starts_with(
        "[Do not delete] Network Interface created to access resources in your VPC for SageMaker Notebook Instance ",
    ) || description.starts_with("[DO NOT DELETE] ENI managed by SageMaker for Studio Domain")
    {
        "sage_maker"
    } else if description.starts_with("Attached to Glue using role: arn:aws:iam::") {
        "glue"
    } else if description.starts_with("arn:aws:ecs:") {
        "ecs"
    } else if description.starts_with("AWS created network interface for directory ") {
        "ad"
    } else if description.starts_with("Created By Amazon Workspaces for AWS Account ID ") {
        "workspace"
    } else if description == "RDSNetworkInterface" {
        "rds"
    } else if description == "RedshiftNetworkInterface" {
        "redshift"
    } else if ni.interface_type == NAT_INTERFACE_TYPE
        || description.starts_with("Interface for NAT Gateway nat-")
    {
        "nat"
    } else {
        return ni.interface_type.clone();
    };
    kind.to_string()
}

/// Best-effort name of the resource owning the interface, `-` when unknown
pub fn interface_name(ni: &NetworkInterface) -> String {
    let description = ni.description.as_str();

    if !ni.instance_id.is_empty() {
        return ni.instance_id.clone();
    }

    // "ELB app/<name>/<id>" and "ELB net/<name>/<id>"
    if description.starts_with("ELB app/") || description.starts_with("ELB net/") {
        return description.split('/').nth(1).unwrap_or_default().to_string();
    }

    if ni.requester_id == ELB_REQUESTER {
        if let Some(name) = description.strip_prefix("ELB ") {
            return name.to_string();
        }
    }

    if let Some(name) = description
        .strip_prefix("ElastiCache ")
        .or_else(|| description.strip_prefix("ElastiCache+"))
    {
        return name.to_string();
    }

    if let Some(name) = description.strip_prefix(LAMBDA_PREFIX) {
        return UUID_SUFFIX.replace(name, "").into_owned();
    }

    if let Some(name) = description.strip_prefix("datasync ") {
        return name.to_string();
    }

    if description.starts_with("Interface for NAT Gateway nat-") {
        return description.trim_start_matches(NAT_PREFIX).to_string();
    }

    "-".to_string()
}
