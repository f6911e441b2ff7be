use std::collections::HashMap;

use async_trait::async_trait;
use flowlogs_types::{LogRecord, Tags};
use serde::Deserialize;

use super::{AwsCli, args};
use crate::client::{ClientResult, LogSinkClient, QueryRequest, QueryResults, QueryStatus};
use crate::error::ClientError;

const LOG_GROUP_CLASS: &str = "STANDARD";

/// Field the log store adds to every row for its own paging
const POINTER_FIELD: &str = "@ptr";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LogGroupsPage {
    log_groups: Vec<LogGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LogGroup {
    log_group_name: String,
    log_group_arn: String,
    arn: String,
}

impl LogGroup {
    /// ARN without the `:*` stream wildcard
    fn tagging_arn(&self) -> String {
        if !self.log_group_arn.is_empty() {
            return self.log_group_arn.clone();
        }
        self.arn.trim_end_matches(":*").to_string()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TagsResponse {
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartQueryResponse {
    query_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryResultsResponse {
    status: String,
    results: Vec<Vec<ResultField>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResultField {
    field: String,
    value: String,
}

impl From<QueryResultsResponse> for QueryResults {
    fn from(response: QueryResultsResponse) -> Self {
        Self {
            status: QueryStatus::parse(&response.status),
            records: response
                .results
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .filter(|cell| cell.field != POINTER_FIELD)
                        .map(|cell| (cell.field, cell.value))
                        .collect::<LogRecord>()
                })
                .collect(),
        }
    }
}

fn find_log_group(pages: Vec<LogGroupsPage>, name: &str) -> Result<String, ClientError> {
    pages
        .into_iter()
        .flat_map(|page| page.log_groups)
        .find(|group| group.log_group_name == name)
        .map(|group| group.tagging_arn())
        .ok_or_else(|| ClientError::NotFound(format!("log group {name}")))
}

#[async_trait]
impl LogSinkClient for AwsCli {
    async fn create_log_group(&self, name: &str, tags: &Tags) -> ClientResult<()> {
        // logs takes tags as a plain map, unlike ec2 and iam
        let tags: HashMap<&str, &str> = tags.iter().collect();
        let tags = serde_json::to_string(&tags).map_err(|source| ClientError::Decode {
            command: "logs create-log-group".to_string(),
            source,
        })?;
        self.call_unit(args([
            "logs",
            "create-log-group",
            "--log-group-name",
            name,
            "--log-group-class",
            LOG_GROUP_CLASS,
            "--tags",
            &tags,
        ]))
        .await
    }

    async fn put_retention_policy(&self, name: &str, days: u32) -> ClientResult<()> {
        self.call_unit(args([
            "logs",
            "put-retention-policy",
            "--log-group-name",
            name,
            "--retention-in-days",
            &days.to_string(),
        ]))
        .await
    }

    async fn log_group_arn(&self, name: &str) -> ClientResult<String> {
        let pages: Vec<LogGroupsPage> = self
            .paginate(args([
                "logs",
                "describe-log-groups",
                "--log-group-name-prefix",
                name,
            ]))
            .await?;
        find_log_group(pages, name)
    }

    async fn log_group_tags(&self, arn: &str) -> ClientResult<Tags> {
        let response: TagsResponse = self
            .call(args(["logs", "list-tags-for-resource", "--resource-arn", arn]))
            .await?;
        Ok(response.tags.into())
    }

    async fn delete_log_group(&self, name: &str) -> ClientResult<()> {
        self.call_unit(args(["logs", "delete-log-group", "--log-group-name", name]))
            .await
    }

    async fn start_query(&self, request: &QueryRequest) -> ClientResult<String> {
        let mut call = args([
            "logs",
            "start-query",
            "--start-time",
            &request.start.timestamp().to_string(),
            "--end-time",
            &request.end.timestamp().to_string(),
            "--query-string",
            &request.query,
            "--limit",
            &request.limit.to_string(),
            "--log-group-names",
        ]);
        call.extend(request.log_group_names.iter().cloned());

        let response: StartQueryResponse = self.call(call).await?;
        Ok(response.query_id)
    }

    async fn query_results(&self, query_id: &str) -> ClientResult<QueryResults> {
        let response: QueryResultsResponse = self
            .call(args(["logs", "get-query-results", "--query-id", query_id]))
            .await?;
        Ok(response.into())
    }
}
