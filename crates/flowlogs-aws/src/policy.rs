//! Role documents for flow log delivery

use serde_json::json;

pub const ROLE_DESCRIPTION: &str = "flowlogs cli role";

/// Name of the inline policy attached to every created role
pub const POLICY_NAME: &str = "flow-logs";

const FLOW_LOGS_PRINCIPAL: &str = "vpc-flow-logs.amazonaws.com";

/// Lets the flow log service assume the role
pub fn trust_policy() -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": FLOW_LOGS_PRINCIPAL },
            "Action": "sts:AssumeRole"
        }]
    })
    .to_string()
}

/// Lets the role write flow log records into log groups
pub fn permissions_policy() -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Action": [
                "logs:CreateLogStream",
                "logs:PutLogEvents",
                "logs:DescribeLogGroups",
                "logs:DescribeLogStreams"
            ],
            "Resource": "*"
        }]
    })
    .to_string()
}
