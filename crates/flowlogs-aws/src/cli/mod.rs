//! Provider clients backed by the `aws` command-line tool
//!
//! Every call runs `aws <service> <operation> ... --output json` with its own
//! timeout and parses stdout with serde. Listings page through results with
//! `--max-items`/`--starting-token` until no `NextToken` is returned.

mod ec2;
mod iam;
mod logs;
mod sts;

use std::time::Duration;

use flowlogs_types::Tags;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::process::Command;
use tracing::debug;

use crate::error::ClientError;

const DEFAULT_PROGRAM: &str = "aws";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const PAGE_SIZE: u32 = 500;

/// Runs provider calls through the `aws` tool
#[derive(Clone, Debug)]
pub struct AwsCli {
    program: String,
    region: Option<String>,
    profile: Option<String>,
    timeout: Duration,
}

impl Default for AwsCli {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            region: None,
            profile: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl AwsCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region.filter(|r| !r.is_empty());
        self
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile.filter(|p| !p.is_empty());
        self
    }

    /// Per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(args);
        if let Some(region) = &self.region {
            command.args(["--region", region.as_str()]);
        }
        if let Some(profile) = &self.profile {
            command.args(["--profile", profile.as_str()]);
        }
        command.kill_on_drop(true);
        command
    }

    /// Run one call and return its stdout
    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>, ClientError> {
        let label = command_label(&args);
        debug!(command = %label, "running aws");

        let output = tokio::time::timeout(self.timeout, self.command(&args).output())
            .await
            .map_err(|_| ClientError::Timeout {
                command: label.clone(),
                timeout: self.timeout,
            })??;

        if !output.status.success() {
            return Err(ClientError::Command {
                command: label,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    async fn call<T: DeserializeOwned>(&self, mut args: Vec<String>) -> Result<T, ClientError> {
        let label = command_label(&args);
        args.extend(["--output".to_string(), "json".to_string()]);
        let stdout = self.run(args).await?;
        decode(&label, &stdout)
    }

    /// Run a call whose output is not needed
    async fn call_unit(&self, args: Vec<String>) -> Result<(), ClientError> {
        self.run(args).await.map(|_| ())
    }

    /// Fetch every page of a listing
    async fn paginate<T: DeserializeOwned>(&self, args: Vec<String>) -> Result<Vec<T>, ClientError> {
        let mut pages = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut page_args = args.clone();
            page_args.extend(["--max-items".to_string(), PAGE_SIZE.to_string()]);
            if let Some(token) = &token {
                page_args.extend(["--starting-token".to_string(), token.clone()]);
            }

            let page: Page<T> = self.call(page_args).await?;
            pages.push(page.body);
            match page.next_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }
        Ok(pages)
    }
}

fn command_label(args: &[String]) -> String {
    args.iter().take(2).cloned().collect::<Vec<_>>().join(" ")
}

fn decode<T: DeserializeOwned>(label: &str, stdout: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(stdout).map_err(|source| ClientError::Decode {
        command: label.to_string(),
        source,
    })
}

fn args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// One page of a paginated listing
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(flatten)]
    body: T,
    #[serde(rename = "NextToken", default)]
    next_token: Option<String>,
}

/// `Key`/`Value` tag as used by ec2 and iam
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsTag {
    key: String,
    #[serde(default)]
    value: String,
}

fn to_tags(tags: Vec<AwsTag>) -> Tags {
    tags.into_iter().map(|tag| (tag.key, tag.value)).collect()
}

fn tag_list(tags: &Tags) -> Value {
    tags.iter()
        .map(|(key, value)| json!({ "Key": key, "Value": value }))
        .collect()
}

/// Filters in the JSON form accepted by `--filters`
fn filters<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(name, value)| json!({ "Name": name, "Values": [value] }))
        .collect::<Value>()
        .to_string()
}
