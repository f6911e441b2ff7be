use serde::Deserialize;
use tracing::debug;

use super::{AwsCli, args};
use crate::error::ClientError;
use crate::orchestrator::AwsConfig;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CallerIdentity {
    account: String,
}

impl AwsCli {
    /// Region from the aws tool's own configuration, `None` when unset
    pub async fn configured_region(&self) -> Result<Option<String>, ClientError> {
        // `aws configure get` exits 1 when the key is not set
        match self.run(args(["configure", "get", "region"])).await {
            Ok(stdout) => {
                let region = String::from_utf8_lossy(&stdout).trim().to_string();
                Ok(Some(region).filter(|r| !r.is_empty()))
            }
            Err(ClientError::Command { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Account id of the current credentials
    pub async fn caller_account(&self) -> Result<String, ClientError> {
        let identity: CallerIdentity = self.call(args(["sts", "get-caller-identity"])).await?;
        Ok(identity.account)
    }

    /// Pin the region and look up the account every later call runs against
    pub async fn resolve_config(&mut self) -> Result<AwsConfig, ClientError> {
        let region = match self.region.clone() {
            Some(region) => region,
            None => self
                .configured_region()
                .await?
                .ok_or_else(|| ClientError::NotFound("aws region".to_string()))?,
        };
        self.region = Some(region.clone());

        let account = self.caller_account().await?;
        debug!(%account, %region, "resolved aws config");
        Ok(AwsConfig { account, region })
    }
}
