//! Flow log lifecycle tests against the in-memory provider

use std::time::Duration;

use flowlogs_aws::{FlowLogsError, QueryPolicy, QueryStatus, ResourceType, TagPolicy};
use flowlogs_query::QueryOptions;
use flowlogs_types::{
    FlowLogs, LogRecord, NatGateway, SecurityGroup, Tags, Target, TargetKind, VpcEndpoint,
};

mod common;
use common::{FakeAws, client, flow_log, instance, interface, owned_tags, vpc};

fn query() -> flowlogs_query::CompiledQuery {
    QueryOptions::new(100, 60).build()
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_vpc_flow_log_in_order() {
    let fake = FakeAws::new();
    let log_group = client(&fake)
        .create_flow_logs(&Target::Vpc(vpc("vpc-1")))
        .await
        .unwrap();

    assert_eq!(log_group, "/fl-cli/vpc-1");
    assert_eq!(
        fake.calls(),
        vec![
            "create_log_group /fl-cli/vpc-1",
            "put_retention_policy /fl-cli/vpc-1 30",
            "create_role fl-cli-eu-west-2-vpc-1",
            "put_role_policy fl-cli-eu-west-2-vpc-1 flow-logs",
            "create_flow_logs VPC vpc-1",
        ]
    );

    let state = fake.state();
    let request = &state.create_requests[0];
    assert_eq!(request.role_arn, "arn:aws:iam::123456789012:role/fl-cli-eu-west-2-vpc-1");
    assert!(request.log_format.contains("${ecs-service-name}"));
    assert_eq!(request.tags, owned_tags("vpc-1"));
    assert_eq!(state.log_group_tags["/fl-cli/vpc-1"], owned_tags("vpc-1"));
    assert_eq!(state.role_tags["fl-cli-eu-west-2-vpc-1"], owned_tags("vpc-1"));
}

#[tokio::test]
async fn test_create_with_extra_tags() {
    let fake = FakeAws::new();
    let extra = Tags::new().with("Owner", "team-x").with("Name", "ignored");
    client(&fake)
        .with_tag_policy(TagPolicy::new(extra))
        .create_flow_logs(&Target::Vpc(vpc("vpc-1")))
        .await
        .unwrap();

    let state = fake.state();
    let request = &state.create_requests[0];
    assert_eq!(request.tags.get("Owner"), Some("team-x"));
    assert_eq!(request.tags.name(), "vpc-1");
    assert_eq!(request.tags.get("CreatedBy"), Some("fl-cli"));
}

#[tokio::test]
async fn test_create_instance_group() {
    let fake = FakeAws::new();
    let target = Target::Instances(vec![
        instance("i-1", "web", &["eni-1", "eni-2"]),
        instance("i-2", "web", &["eni-2", "eni-3"]),
    ]);
    let log_group = client(&fake).create_flow_logs(&target).await.unwrap();

    assert_eq!(log_group, "/fl-cli/instance-web");
    let state = fake.state();
    let request = &state.create_requests[0];
    assert_eq!(request.resource_type, ResourceType::NetworkInterface);
    assert_eq!(request.resource_ids, vec!["eni-1", "eni-2", "eni-3"]);
    assert_eq!(request.tags.name(), "instance-web");
}

#[tokio::test]
async fn test_create_mixed_instance_names_makes_no_calls() {
    let fake = FakeAws::new();
    let target = Target::Instances(vec![
        instance("i-1", "web", &["eni-1"]),
        instance("i-2", "db", &["eni-2"]),
    ]);
    let err = client(&fake).create_flow_logs(&target).await.unwrap_err();

    assert!(matches!(err, FlowLogsError::Validation(_)));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_create_no_instances_makes_no_calls() {
    let fake = FakeAws::new();
    let err = client(&fake)
        .create_flow_logs(&Target::Instances(Vec::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, FlowLogsError::Validation(_)));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_create_security_group_uses_member_interfaces() {
    let fake = FakeAws::new().with(|state| {
        state.interfaces = vec![
            interface("eni-1", "sg-1"),
            interface("eni-2", "sg-2"),
            interface("eni-3", "sg-1"),
        ];
    });
    let sg = SecurityGroup {
        vpc_id: "vpc-1".to_string(),
        id: "sg-1".to_string(),
        group_name: "web".to_string(),
        ..Default::default()
    };
    client(&fake)
        .create_flow_logs(&Target::SecurityGroup(sg))
        .await
        .unwrap();

    assert_eq!(fake.calls()[0], "list_network_interfaces sg-1");
    let state = fake.state();
    let request = &state.create_requests[0];
    assert_eq!(request.resource_ids, vec!["eni-1", "eni-3"]);
}

#[tokio::test]
async fn test_create_empty_security_group_creates_nothing() {
    let fake = FakeAws::new();
    let sg = SecurityGroup {
        vpc_id: "vpc-1".to_string(),
        id: "sg-9".to_string(),
        ..Default::default()
    };
    let err = client(&fake)
        .create_flow_logs(&Target::SecurityGroup(sg))
        .await
        .unwrap_err();

    assert!(matches!(err, FlowLogsError::Validation(_)));
    assert_eq!(fake.calls(), vec!["list_network_interfaces sg-9"]);
}

#[tokio::test]
async fn test_create_nat_gateway_and_endpoint_resources() {
    let fake = FakeAws::new();
    let nat = NatGateway {
        id: "nat-1".to_string(),
        network_interface_id: "eni-nat".to_string(),
        ..Default::default()
    };
    let endpoint = VpcEndpoint {
        id: "vpce-1".to_string(),
        ..Default::default()
    };
    let client = client(&fake);
    client.create_flow_logs(&Target::NatGateway(nat)).await.unwrap();
    client.create_flow_logs(&Target::Endpoint(endpoint)).await.unwrap();

    let state = fake.state();
    assert_eq!(state.create_requests[0].resource_type, ResourceType::NetworkInterface);
    assert_eq!(state.create_requests[0].resource_ids, vec!["eni-nat"]);
    assert_eq!(state.create_requests[1].resource_type, ResourceType::VpcEndpoint);
    assert_eq!(state.create_requests[1].resource_ids, vec!["vpce-1"]);
}

#[tokio::test]
async fn test_create_retries_without_ecs_fields() {
    let fake = FakeAws::new().with(|state| state.deny_ecs_fields = true);
    client(&fake)
        .create_flow_logs(&Target::Vpc(vpc("vpc-1")))
        .await
        .unwrap();

    let state = fake.state();
    assert_eq!(state.create_requests.len(), 2);
    assert!(state.create_requests[0].log_format.contains("${ecs-cluster-arn}"));
    assert!(!state.create_requests[1].log_format.contains("ecs-"));
    assert!(state.create_requests[1].log_format.starts_with("${interface-id}"));
}

#[tokio::test]
async fn test_create_failure_is_attributed() {
    let fake = FakeAws::new().with(|state| {
        state.failing.insert("create_role");
    });
    let err = client(&fake)
        .create_flow_logs(&Target::Vpc(vpc("vpc-1")))
        .await
        .unwrap_err();

    match err {
        FlowLogsError::Collaborator { operation, target, .. } => {
            assert_eq!(operation, "create iam role");
            assert_eq!(target, "fl-cli-eu-west-2-vpc-1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // the log group is left behind for a later delete
    assert!(!fake.calls().iter().any(|c| c.starts_with("create_flow_logs")));
    assert!(fake.calls().iter().any(|c| c.starts_with("create_log_group")));
}

// ============================================================================
// List
// ============================================================================

#[tokio::test]
async fn test_list_filters_by_kind_prefix() {
    let fake = FakeAws::new().with(|state| {
        state.flow_logs = vec![
            flow_log("fl-1", "vpc-1"),
            flow_log("fl-2", "subnet-1"),
            flow_log("fl-3", "instance-web"),
        ];
    });
    let client = client(&fake);

    let vpcs = client.list_flow_logs(TargetKind::Vpc).await.unwrap();
    assert_eq!(vpcs.ids(), vec!["fl-1"]);

    let instances = client.list_flow_logs(TargetKind::Instance).await.unwrap();
    assert_eq!(instances.ids(), vec!["fl-3"]);

    let all = client.list_flow_logs(TargetKind::All).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_list_only_owned_flow_logs() {
    let foreign = flowlogs_types::FlowLog::new(
        "fl-9".to_string(),
        "vpc-9".to_string(),
        "/other/vpc-9".to_string(),
        None,
        Tags::new().with("Name", "vpc-9"),
    );
    let fake = FakeAws::new().with(|state| {
        state.flow_logs = vec![flow_log("fl-1", "vpc-1"), foreign];
    });
    let flow_logs = client(&fake).list_flow_logs(TargetKind::All).await.unwrap();
    assert_eq!(flow_logs.ids(), vec!["fl-1"]);
}

// ============================================================================
// Delete
// ============================================================================

fn owned_fake(names: &[&str]) -> FakeAws {
    let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    FakeAws::new().with(|state| {
        for name in &names {
            state
                .role_tags
                .insert(format!("fl-cli-eu-west-2-{name}"), owned_tags(name));
            state
                .log_group_tags
                .insert(format!("/fl-cli/{name}"), owned_tags(name));
        }
    })
}

#[tokio::test]
async fn test_delete_order() {
    let fake = owned_fake(&["vpc-1"]);
    let flow_logs: FlowLogs = vec![flow_log("fl-1", "vpc-1")].into();
    client(&fake).delete_resources(&flow_logs).await.unwrap();

    assert_eq!(
        fake.calls(),
        vec![
            "delete_flow_logs fl-1",
            "role_tags fl-cli-eu-west-2-vpc-1",
            "delete_role_policy fl-cli-eu-west-2-vpc-1 flow-logs",
            "delete_role fl-cli-eu-west-2-vpc-1",
            "log_group_arn /fl-cli/vpc-1",
            "log_group_tags arn:aws:logs:eu-west-2:123456789012:log-group:/fl-cli/vpc-1",
            "delete_log_group /fl-cli/vpc-1",
        ]
    );
}

#[tokio::test]
async fn test_delete_groups_by_name() {
    let fake = owned_fake(&["instance-web", "vpc-1"]);
    let flow_logs: FlowLogs = vec![
        flow_log("fl-1", "instance-web"),
        flow_log("fl-2", "instance-web"),
        flow_log("fl-3", "vpc-1"),
    ]
    .into();
    client(&fake).delete_resources(&flow_logs).await.unwrap();

    let calls = fake.calls();
    assert_eq!(calls[0], "delete_flow_logs fl-1,fl-2,fl-3");
    assert_eq!(calls.iter().filter(|c| c.starts_with("delete_role ")).count(), 2);
    assert_eq!(calls.iter().filter(|c| c.starts_with("delete_log_group")).count(), 2);
}

#[tokio::test]
async fn test_delete_empty_makes_no_calls() {
    let fake = FakeAws::new();
    client(&fake).delete_resources(&FlowLogs::default()).await.unwrap();
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_delete_role_tag_value_mismatch() {
    let fake = owned_fake(&["vpc-1"]).with(|state| {
        state.role_tags.insert(
            "fl-cli-eu-west-2-vpc-1".to_string(),
            Tags::new().with("Name", "vpc-1").with("CreatedBy", "someone-else"),
        );
    });
    let flow_logs: FlowLogs = vec![flow_log("fl-1", "vpc-1")].into();
    let err = client(&fake).delete_resources(&flow_logs).await.unwrap_err();

    assert!(matches!(err, FlowLogsError::OwnershipMismatch { .. }));
    let calls = fake.calls();
    assert!(!calls.iter().any(|c| c.starts_with("delete_role")));
    assert!(!calls.iter().any(|c| c.starts_with("delete_log_group")));
}

#[tokio::test]
async fn test_delete_log_group_missing_tag() {
    let fake = owned_fake(&["vpc-1"]).with(|state| {
        state
            .log_group_tags
            .insert("/fl-cli/vpc-1".to_string(), Tags::new().with("Name", "vpc-1"));
    });
    let flow_logs: FlowLogs = vec![flow_log("fl-1", "vpc-1")].into();
    let err = client(&fake).delete_resources(&flow_logs).await.unwrap_err();

    match err {
        FlowLogsError::OwnershipMismatch { resource, mismatch } => {
            assert_eq!(resource, "log group /fl-cli/vpc-1");
            assert_eq!(mismatch.to_string(), "missing tag CreatedBy (expected fl-cli)");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!fake.calls().iter().any(|c| c.starts_with("delete_log_group")));
}

// ============================================================================
// Query
// ============================================================================

fn record(action: &str) -> LogRecord {
    [("@timestamp", "2024-12-04 14:50:07.000"), ("action", action)]
        .into_iter()
        .collect()
}

#[tokio::test]
async fn test_query_empty_input_makes_no_calls() {
    let fake = FakeAws::new();
    let records = client(&fake)
        .query_flow_logs(&FlowLogs::default(), &query())
        .await
        .unwrap();
    assert!(records.is_empty());
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_query_request_shape() {
    let fake = FakeAws::new().with(|state| state.records = vec![record("ACCEPT")]);
    let flow_logs: FlowLogs = vec![
        flow_log("fl-1", "instance-web"),
        flow_log("fl-2", "instance-web"),
    ]
    .into();
    let records = client(&fake)
        .query_flow_logs(&flow_logs, &QueryOptions::new(25, 15).build())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    let state = fake.state();
    let request = &state.query_requests[0];
    assert_eq!(request.log_group_names, vec!["/fl-cli/instance-web"]);
    assert_eq!(request.limit, 25);
    assert_eq!((request.end - request.start).num_minutes(), 15);
    assert!(request.query.ends_with("| sort @timestamp desc"));
}

#[tokio::test]
async fn test_query_waits_through_scheduled_and_running() {
    let fake = FakeAws::new().with(|state| {
        state.query_statuses = [QueryStatus::Scheduled, QueryStatus::Running, QueryStatus::Complete].into();
        state.records = vec![record("ACCEPT"), record("REJECT")];
    });
    let flow_logs: FlowLogs = vec![flow_log("fl-1", "vpc-1")].into();
    let records = client(&fake).query_flow_logs(&flow_logs, &query()).await.unwrap();

    assert_eq!(records.len(), 2);
    let polls = fake.calls().iter().filter(|c| c.starts_with("query_results")).count();
    assert_eq!(polls, 3);
}

#[tokio::test]
async fn test_query_gives_up_after_max_attempts() {
    let fake = FakeAws::new().with(|state| state.query_statuses = [QueryStatus::Running].into());
    let flow_logs: FlowLogs = vec![flow_log("fl-1", "vpc-1")].into();
    let err = client(&fake).query_flow_logs(&flow_logs, &query()).await.unwrap_err();

    match err {
        FlowLogsError::QueryIncomplete { status, attempts, .. } => {
            assert_eq!(status, QueryStatus::Running);
            assert_eq!(attempts, 6);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let polls = fake.calls().iter().filter(|c| c.starts_with("query_results")).count();
    assert_eq!(polls, 6);
}

#[tokio::test]
async fn test_query_failed_status_stops_polling() {
    let fake = FakeAws::new()
        .with(|state| state.query_statuses = [QueryStatus::Running, QueryStatus::Failed].into());
    let flow_logs: FlowLogs = vec![flow_log("fl-1", "vpc-1")].into();
    let err = client(&fake).query_flow_logs(&flow_logs, &query()).await.unwrap_err();

    assert!(matches!(
        err,
        FlowLogsError::QueryIncomplete { status: QueryStatus::Failed, attempts: 2, .. }
    ));
}

#[tokio::test]
async fn test_query_deadline_bounds_polling() {
    let fake = FakeAws::new().with(|state| {
        state.query_statuses = [QueryStatus::Running].into();
        state.query_latency = Duration::from_millis(20);
    });
    let flow_logs: FlowLogs = vec![flow_log("fl-1", "vpc-1")].into();
    let err = client(&fake)
        .with_query_policy(QueryPolicy {
            initial_delay: Duration::ZERO,
            retry_delay: Duration::from_millis(10),
            max_attempts: 1_000,
            deadline: Duration::from_millis(150),
        })
        .query_flow_logs(&flow_logs, &query())
        .await
        .unwrap_err();

    match err {
        FlowLogsError::QueryIncomplete { status, attempts, .. } => {
            assert_eq!(status, QueryStatus::Running);
            assert!(attempts >= 1 && attempts < 1_000);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
