mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use flowlogs_aws::{AwsCli, FlowLogsClient, TagPolicy, TargetKind};

use crate::config::Config;

/// flowlogs - create, query and delete VPC flow logs
#[derive(Parser, Debug)]
#[command(name = "flowlogs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// AWS region (defaults to the aws tool's configured region)
    #[arg(long, global = true)]
    region: Option<String>,

    /// AWS named profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Log level: debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List flow logs created by flowlogs
    List {
        #[arg(value_enum, default_value_t = Kind::All)]
        kind: Kind,
    },

    /// List resources flow logs can be created for
    Resources {
        #[arg(value_enum)]
        kind: Kind,

        /// Only look in this VPC
        #[arg(long)]
        vpc: Option<String>,

        /// Include resources that already have flow logs
        #[arg(long)]
        all: bool,
    },

    /// Create flow logs, with their log group and role
    Create {
        #[arg(value_enum)]
        kind: Kind,

        /// Resource ids
        #[arg(value_name = "ID")]
        ids: Vec<String>,

        /// Only look in this VPC
        #[arg(long)]
        vpc: Option<String>,

        /// Select running instances by Name tag
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete flow logs with their roles and log groups
    Delete {
        #[arg(value_enum)]
        kind: Kind,

        /// Only the flow logs with this name
        name: Option<String>,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Query flow log records
    Query(QueryArgs),
}

#[derive(ClapArgs, Debug)]
struct QueryArgs {
    #[arg(value_enum)]
    kind: Kind,

    /// Only the flow logs with this name
    name: Option<String>,

    /// Maximum number of records
    #[arg(long)]
    limit: Option<i32>,

    /// How far back to look
    #[arg(long)]
    minutes: Option<i32>,

    /// Protocol keyword, e.g. tcp
    #[arg(long)]
    protocol: Option<String>,

    #[arg(long)]
    ingress: bool,

    #[arg(long)]
    egress: bool,

    #[arg(long)]
    accept: bool,

    #[arg(long)]
    reject: bool,

    /// Source or destination port, negative means all ports
    #[arg(long, allow_hyphen_values = true)]
    port: Option<i32>,

    /// Source or destination address
    #[arg(long)]
    addr: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    src_port: Option<i32>,

    #[arg(long)]
    src_addr: Option<String>,

    #[arg(long)]
    pkt_src_addr: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    dst_port: Option<i32>,

    #[arg(long)]
    dst_addr: Option<String>,

    #[arg(long)]
    pkt_dst_addr: Option<String>,

    #[arg(long)]
    interface_id: Option<String>,

    /// Add the type and name of each network interface
    #[arg(long)]
    pretty: bool,
}

/// Resource kind as typed on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Kind {
    Instance,
    Sg,
    Nat,
    Subnet,
    Vpc,
    Endpoint,
    All,
}

impl From<Kind> for TargetKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Instance => TargetKind::Instance,
            Kind::Sg => TargetKind::SecurityGroup,
            Kind::Nat => TargetKind::NatGateway,
            Kind::Subnet => TargetKind::Subnet,
            Kind::Vpc => TargetKind::Vpc,
            Kind::Endpoint => TargetKind::Endpoint,
            Kind::All => TargetKind::All,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load()?;
    if args.region.is_some() {
        config.region = args.region;
    }
    if args.profile.is_some() {
        config.profile = args.profile;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(config.log_level()?.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut aws = AwsCli::new()
        .with_region(config.region.clone())
        .with_profile(config.profile.clone())
        .with_timeout(config.call_timeout());
    let aws_config = aws
        .resolve_config()
        .await
        .context("failed to resolve aws account and region")?;

    let client = FlowLogsClient::new(aws_config, aws.clone(), aws.clone(), aws)
        .with_tag_policy(TagPolicy::new(config.extra_tags()))
        .with_query_policy(config.query_policy());

    match args.command {
        Command::List { kind } => commands::list(&client, kind.into()).await,
        Command::Resources { kind, vpc, all } => {
            commands::resources(&client, kind.into(), vpc, all).await
        }
        Command::Create {
            kind,
            ids,
            vpc,
            name,
        } => commands::create(&client, kind.into(), ids, vpc, name).await,
        Command::Delete { kind, name, yes } => {
            commands::delete(&client, kind.into(), name, yes).await
        }
        Command::Query(query) => {
            let options = query.options(&config);
            commands::query(&client, query.kind.into(), query.name, &options, query.pretty).await
        }
    }
}

impl QueryArgs {
    /// Flags win, unset flags fall back to the configured defaults
    fn options(&self, config: &Config) -> flowlogs_query::QueryOptions {
        let defaults = &config.query;
        let or = |flag: &Option<String>, default: &Option<String>| {
            flag.clone().or_else(|| default.clone())
        };
        flowlogs_query::QueryOptions {
            limit: self.limit.unwrap_or(defaults.limit),
            minutes: self.minutes.unwrap_or(defaults.minutes),
            protocol: or(&self.protocol, &defaults.protocol),
            ingress: self.ingress || defaults.ingress,
            egress: self.egress || defaults.egress,
            accept: self.accept || defaults.accept,
            reject: self.reject || defaults.reject,
            port: self.port.or(defaults.port),
            addr: or(&self.addr, &defaults.addr),
            src_port: self.src_port.or(defaults.src_port),
            src_addr: or(&self.src_addr, &defaults.src_addr),
            pkt_src_addr: or(&self.pkt_src_addr, &defaults.pkt_src_addr),
            dst_port: self.dst_port.or(defaults.dst_port),
            dst_addr: or(&self.dst_addr, &defaults.dst_addr),
            pkt_dst_addr: or(&self.pkt_dst_addr, &defaults.pkt_dst_addr),
            interface_id: self.interface_id.clone(),
        }
    }
}
