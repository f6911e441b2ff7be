//! Command handlers

use std::fmt::Display;

use anyhow::{Context, Result, bail};
use tracing::info;

use flowlogs_aws::{AwsCli, FlowLogs, FlowLogsClient, Target, TargetKind};
use flowlogs_query::{QueryOptions, decode_record, decode_record_enriched};
use flowlogs_types::Instance;

use crate::output;

type Client = FlowLogsClient<AwsCli, AwsCli, AwsCli>;

pub async fn list(client: &Client, kind: TargetKind) -> Result<()> {
    let flow_logs = client.list_flow_logs(kind).await?;
    if flow_logs.is_empty() {
        println!("no {} flow logs", kind.label());
        return Ok(());
    }
    print!("{}", output::flow_logs_table(&flow_logs).render());
    Ok(())
}

pub async fn resources(
    client: &Client,
    kind: TargetKind,
    vpc: Option<String>,
    all: bool,
) -> Result<()> {
    let monitored = if all {
        FlowLogs::default()
    } else {
        client.list_flow_logs(kind).await?
    };

    match kind {
        TargetKind::Vpc => {
            let vpcs = client.list_vpcs().await?;
            show(kind, &monitored.exclude_monitored(vpcs));
        }
        TargetKind::Subnet => {
            let mut subnets = Vec::new();
            for vpc_id in vpc_ids(client, vpc).await? {
                subnets.extend(client.list_subnets(&vpc_id).await?);
            }
            show(kind, &monitored.exclude_monitored(subnets));
        }
        TargetKind::SecurityGroup => {
            let mut groups = Vec::new();
            for vpc_id in vpc_ids(client, vpc).await? {
                groups.extend(client.list_security_groups(&vpc_id).await?);
            }
            show(kind, &monitored.exclude_monitored(groups));
        }
        TargetKind::NatGateway => {
            let mut gateways = Vec::new();
            for vpc_id in vpc_ids(client, vpc).await? {
                gateways.extend(client.list_nat_gateways(&vpc_id).await?);
            }
            show(kind, &monitored.exclude_monitored(gateways));
        }
        TargetKind::Instance => {
            let instances = all_instances(client, vpc).await?;
            show(kind, &monitored.exclude_monitored(instances));
        }
        TargetKind::Endpoint => {
            let mut endpoints = Vec::new();
            for vpc_id in vpc_ids(client, vpc).await? {
                endpoints.extend(client.list_vpc_endpoints(&vpc_id).await?);
            }
            show(kind, &monitored.exclude_monitored(endpoints));
        }
        TargetKind::All => bail!("choose a resource kind to list"),
    }
    Ok(())
}

fn show<T: Display>(kind: TargetKind, items: &[T]) {
    if items.is_empty() {
        println!("no {} resources without flow logs", kind.label());
    } else {
        print!(
            "{}",
            output::resources_table(&kind.label().to_uppercase(), items).render()
        );
    }
}

/// The given VPC, or every VPC in the account
async fn vpc_ids(client: &Client, vpc: Option<String>) -> Result<Vec<String>> {
    match vpc {
        Some(vpc) => Ok(vec![vpc]),
        None => Ok(client
            .list_vpcs()
            .await?
            .into_iter()
            .map(|vpc| vpc.id)
            .collect()),
    }
}

async fn all_instances(client: &Client, vpc: Option<String>) -> Result<Vec<Instance>> {
    let mut instances = Vec::new();
    for vpc_id in vpc_ids(client, vpc).await? {
        instances.extend(client.list_instances(&vpc_id).await?);
    }
    Ok(instances)
}

pub async fn create(
    client: &Client,
    kind: TargetKind,
    ids: Vec<String>,
    vpc: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let targets = resolve_targets(client, kind, &ids, vpc, name).await?;

    for target in &targets {
        let identity = target.identity()?;
        let log_group = client
            .create_flow_logs(target)
            .await
            .with_context(|| format!("failed to create flow logs for {identity}"))?;
        println!("created flow logs for {identity}, log group {log_group}");
    }
    Ok(())
}

/// Look the requested ids up so each target carries its live attributes
async fn resolve_targets(
    client: &Client,
    kind: TargetKind,
    ids: &[String],
    vpc: Option<String>,
    name: Option<String>,
) -> Result<Vec<Target>> {
    if kind == TargetKind::Instance {
        let instances: Vec<Instance> = all_instances(client, vpc)
            .await?
            .into_iter()
            .filter(|i| ids.contains(&i.id) || name.as_deref() == Some(i.name.as_str()))
            .collect();
        if instances.is_empty() {
            bail!("no running instances match the given ids or name");
        }
        return Ok(vec![Target::Instances(instances)]);
    }

    if ids.is_empty() {
        bail!("no {} ids given", kind.label());
    }

    let mut candidates: Vec<Target> = Vec::new();
    if kind == TargetKind::Vpc {
        candidates.extend(client.list_vpcs().await?.into_iter().map(Target::Vpc));
    } else {
        for vpc_id in vpc_ids(client, vpc).await? {
            match kind {
                TargetKind::Subnet => candidates.extend(
                    client.list_subnets(&vpc_id).await?.into_iter().map(Target::Subnet),
                ),
                TargetKind::SecurityGroup => candidates.extend(
                    client
                        .list_security_groups(&vpc_id)
                        .await?
                        .into_iter()
                        .map(Target::SecurityGroup),
                ),
                TargetKind::NatGateway => candidates.extend(
                    client
                        .list_nat_gateways(&vpc_id)
                        .await?
                        .into_iter()
                        .map(Target::NatGateway),
                ),
                TargetKind::Endpoint => candidates.extend(
                    client
                        .list_vpc_endpoints(&vpc_id)
                        .await?
                        .into_iter()
                        .map(Target::Endpoint),
                ),
                _ => bail!("cannot create flow logs for {}", kind.label()),
            }
        }
    }

    let mut targets = Vec::new();
    for id in ids {
        let target = candidates
            .iter()
            .find(|candidate| target_id(candidate) == Some(id.as_str()))
            .with_context(|| format!("{} {id} not found", kind.label()))?;
        targets.push(target.clone());
    }
    Ok(targets)
}

fn target_id(target: &Target) -> Option<&str> {
    match target {
        Target::Vpc(vpc) => Some(vpc.id.as_str()),
        Target::Subnet(subnet) => Some(subnet.id.as_str()),
        Target::SecurityGroup(sg) => Some(sg.id.as_str()),
        Target::NatGateway(nat) => Some(nat.id.as_str()),
        Target::Endpoint(endpoint) => Some(endpoint.id.as_str()),
        Target::Instances(_) => None,
    }
}

pub async fn delete(
    client: &Client,
    kind: TargetKind,
    name: Option<String>,
    yes: bool,
) -> Result<()> {
    let flow_logs = select(client.list_flow_logs(kind).await?, name.as_deref());
    if flow_logs.is_empty() {
        println!("no {} flow logs to delete", kind.label());
        return Ok(());
    }

    print!("{}", output::flow_logs_table(&flow_logs).render());
    if !yes {
        bail!(
            "not deleting {} flow logs, re-run with --yes to confirm",
            flow_logs.len()
        );
    }

    client.delete_resources(&flow_logs).await?;
    info!(count = flow_logs.len(), "deleted flow logs and their resources");
    println!("deleted {} flow logs", flow_logs.len());
    Ok(())
}

pub async fn query(
    client: &Client,
    kind: TargetKind,
    name: Option<String>,
    options: &QueryOptions,
    pretty: bool,
) -> Result<()> {
    let flow_logs = select(client.list_flow_logs(kind).await?, name.as_deref());
    if flow_logs.is_empty() {
        bail!("no {} flow logs to query", kind.label());
    }

    let records = client.query_flow_logs(&flow_logs, &options.build()).await?;
    if records.is_empty() {
        println!("no records");
        return Ok(());
    }

    let table = if pretty {
        let interfaces = client.list_network_interfaces().await?;
        let rows: Vec<_> = records
            .iter()
            .map(|record| decode_record_enriched(record, &interfaces))
            .collect();
        output::enriched_table(&rows)
    } else {
        let rows: Vec<_> = records.iter().map(decode_record).collect();
        output::plain_table(&rows)
    };
    print!("{}", table.render());
    Ok(())
}

/// Narrow to one flow log name when given
fn select(flow_logs: FlowLogs, name: Option<&str>) -> FlowLogs {
    match name {
        Some(name) => flow_logs.into_iter().filter(|fl| fl.name == name).collect(),
        None => flow_logs,
    }
}
