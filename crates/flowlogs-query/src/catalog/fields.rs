//! Field names, both for creating flow logs and for querying them.
//!
//! See <https://docs.aws.amazon.com/vpc/latest/userguide/flow-logs.html>.

/// Flow log record fields, versions 2 to 5
pub const FLOW_LOG_FIELDS_V2_V5: &[&str] = &[
    // version 2
    "interface-id", "srcaddr", "dstaddr", "srcport", "dstport", "protocol", "packets", "bytes", "start", "end",
    "action", "log-status",
    // version 3
    "vpc-id", "subnet-id", "instance-id", "tcp-flags", "type", "pkt-srcaddr", "pkt-dstaddr",
    // version 5
    "pkt-src-aws-service", "pkt-dst-aws-service", "flow-direction", "traffic-path",
];

/// Flow log record fields added in version 7 (ECS)
pub const FLOW_LOG_FIELDS_V7: &[&str] = &[
    "ecs-cluster-arn", "ecs-cluster-name", "ecs-container-instance-arn", "ecs-container-instance-id",
    "ecs-container-id", "ecs-second-container-id", "ecs-service-name", "ecs-task-definition-arn",
    "ecs-task-arn", "ecs-task-id",
];

/// Log format string for creating flow logs with the given fields
pub fn log_format<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields
        .into_iter()
        .map(|field| format!("${{{field}}}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub const TIMESTAMP: &str = "@timestamp";
pub const INTERFACE_ID: &str = "interfaceId";
pub const SRC_ADDR: &str = "srcAddr";
pub const DST_ADDR: &str = "dstAddr";
pub const SRC_PORT: &str = "srcPort";
pub const DST_PORT: &str = "dstPort";
pub const PROTOCOL: &str = "protocol";
pub const PACKETS: &str = "packets";
pub const BYTES: &str = "bytes";
pub const ACTION: &str = "action";
pub const TCP_FLAGS: &str = "tcpFlags";
pub const PKT_SRC_ADDR: &str = "pktSrcAddr";
pub const PKT_DST_ADDR: &str = "pktDstAddr";
pub const FLOW_DIRECTION: &str = "flowDirection";
pub const TRAFFIC_PATH: &str = "trafficPath";
pub const LOG_STATUS: &str = "logStatus";
/// Only populated for flow logs created with ECS fields
pub const ECS_SERVICE_NAME: &str = "ecsServiceName";

/// Fields requested from the log store, in projection order
pub const QUERY_FIELDS: &[&str] = &[
    TIMESTAMP, INTERFACE_ID, SRC_ADDR, DST_ADDR, SRC_PORT, DST_PORT, PROTOCOL, PACKETS, BYTES,
    ACTION,
    TCP_FLAGS, PKT_SRC_ADDR, PKT_DST_ADDR,
    FLOW_DIRECTION, TRAFFIC_PATH,
    ECS_SERVICE_NAME,
];
