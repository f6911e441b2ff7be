use async_trait::async_trait;
use flowlogs_types::Tags;
use serde::Deserialize;

use super::{AwsCli, AwsTag, args, tag_list, to_tags};
use crate::client::{ClientResult, RoleClient, RoleSpec};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleResponse {
    role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Role {
    arn: String,
    #[serde(default)]
    tags: Vec<AwsTag>,
}

#[async_trait]
impl RoleClient for AwsCli {
    async fn create_role(&self, spec: &RoleSpec) -> ClientResult<String> {
        let tags = tag_list(&spec.tags).to_string();
        let response: RoleResponse = self
            .call(args([
                "iam",
                "create-role",
                "--role-name",
                &spec.name,
                "--description",
                &spec.description,
                "--assume-role-policy-document",
                &spec.trust_policy,
                "--tags",
                &tags,
            ]))
            .await?;
        Ok(response.role.arn)
    }

    async fn put_role_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        document: &str,
    ) -> ClientResult<()> {
        self.call_unit(args([
            "iam",
            "put-role-policy",
            "--role-name",
            role_name,
            "--policy-name",
            policy_name,
            "--policy-document",
            document,
        ]))
        .await
    }

    async fn role_tags(&self, role_name: &str) -> ClientResult<Tags> {
        let response: RoleResponse = self
            .call(args(["iam", "get-role", "--role-name", role_name]))
            .await?;
        Ok(to_tags(response.role.tags))
    }

    async fn delete_role_policy(&self, role_name: &str, policy_name: &str) -> ClientResult<()> {
        self.call_unit(args([
            "iam",
            "delete-role-policy",
            "--role-name",
            role_name,
            "--policy-name",
            policy_name,
        ]))
        .await
    }

    async fn delete_role(&self, role_name: &str) -> ClientResult<()> {
        self.call_unit(args(["iam", "delete-role", "--role-name", role_name]))
            .await
    }
}
