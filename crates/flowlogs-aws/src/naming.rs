//! Names and tags derived from a target identity
//!
//! Log groups, roles and flow logs created for one target share a `Name` tag
//! equal to the identity, which is how they are found again at delete time.

use flowlogs_types::{NAME_TAG, Tags};

/// Longest role name the identity service accepts
pub const MAX_ROLE_NAME_LEN: usize = 64;

pub const LOG_GROUP_PREFIX: &str = "/fl-cli/";

/// Retention applied to every created log group
pub const RETENTION_DAYS: u32 = 30;

pub const CREATED_BY_TAG: &str = "CreatedBy";
pub const CREATED_BY_VALUE: &str = "fl-cli";

pub fn log_group_name(identity: &str) -> String {
    format!("{LOG_GROUP_PREFIX}{identity}")
}

/// Role name for an identity in a region.
///
/// Roles are global, so the region is part of the name. Names over the limit
/// keep their first 64 characters.
pub fn role_name(region: &str, identity: &str) -> String {
    let name = format!("fl-cli-{region}-{identity}");
    match name.char_indices().nth(MAX_ROLE_NAME_LEN) {
        Some((cut, _)) => name[..cut].to_string(),
        None => name,
    }
}

/// Ownership tags stamped on every created resource
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagPolicy {
    extra: Tags,
}

impl TagPolicy {
    /// `extra` tags are added to every resource. A `Name` or `CreatedBy`
    /// entry in `extra` is ignored.
    pub fn new(extra: Tags) -> Self {
        Self {
            extra: extra.without(NAME_TAG).without(CREATED_BY_TAG),
        }
    }

    /// Full tag set for a target identity
    pub fn tags_for(&self, identity: &str) -> Tags {
        let mut tags = self.shared();
        tags.insert(NAME_TAG, identity);
        tags
    }

    /// Tags every resource carries regardless of target, used as the flow
    /// log listing filter
    pub fn shared(&self) -> Tags {
        let mut tags = self.extra.clone();
        tags.insert(CREATED_BY_TAG, CREATED_BY_VALUE);
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_group_name() {
        assert_eq!(log_group_name("vpc-123"), "/fl-cli/vpc-123");
        assert_eq!(log_group_name("instance-web"), "/fl-cli/instance-web");
    }

    #[test]
    fn test_short_role_name_untouched() {
        assert_eq!(role_name("eu-west-2", "vpc-123"), "fl-cli-eu-west-2-vpc-123");
    }

    #[test]
    fn test_long_role_name_keeps_prefix() {
        let identity = format!("instance-{}", "a".repeat(80));
        let name = role_name("eu-west-2", &identity);
        assert_eq!(name.len(), MAX_ROLE_NAME_LEN);
        assert!(name.starts_with("fl-cli-eu-west-2-instance-"));
        assert!(format!("fl-cli-eu-west-2-{identity}").starts_with(&name));
    }

    #[test]
    fn test_tags_for_identity() {
        let policy = TagPolicy::new(Tags::new().with("Owner", "team-x"));
        let tags = policy.tags_for("vpc-123");
        assert_eq!(tags.get("Name"), Some("vpc-123"));
        assert_eq!(tags.get("CreatedBy"), Some("fl-cli"));
        assert_eq!(tags.get("Owner"), Some("team-x"));
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn test_extra_tags_cannot_override_ownership() {
        let policy = TagPolicy::new(
            Tags::new()
                .with("Name", "spoofed")
                .with("CreatedBy", "someone-else"),
        );
        let tags = policy.tags_for("subnet-1");
        assert_eq!(tags.get("Name"), Some("subnet-1"));
        assert_eq!(tags.get("CreatedBy"), Some("fl-cli"));
        assert_eq!(policy.shared().get("Name"), None);
    }
}
