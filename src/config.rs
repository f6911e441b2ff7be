//! Configuration for the flowlogs command line
//!
//! Settings come from `~/.flowlogs/config.toml`, then `AWSFL_*` environment
//! variables, then command-line flags, each layer overriding the one before.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::Level;

use flowlogs_aws::{QueryPolicy, Tags};

const CONFIG_DIR: &str = ".flowlogs";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "AWSFL_";

const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub log_level: String,
    /// Timeout for each `aws` call
    pub call_timeout_secs: u64,
    /// Upper bound on waiting for query results
    pub query_timeout_secs: u64,
    pub query: QueryDefaults,
    /// Extra ownership tags for every created resource
    pub tags: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            log_level: "info".to_string(),
            call_timeout_secs: 10,
            query_timeout_secs: 20,
            query: QueryDefaults::default(),
            tags: BTreeMap::new(),
        }
    }
}

/// Defaults for `query` flags. A negative port means all ports.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryDefaults {
    pub limit: i32,
    pub minutes: i32,
    pub protocol: Option<String>,
    pub ingress: bool,
    pub egress: bool,
    pub accept: bool,
    pub reject: bool,
    pub port: Option<i32>,
    pub addr: Option<String>,
    pub src_port: Option<i32>,
    pub src_addr: Option<String>,
    pub pkt_src_addr: Option<String>,
    pub dst_port: Option<i32>,
    pub dst_addr: Option<String>,
    pub pkt_dst_addr: Option<String>,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            limit: 100,
            minutes: 60,
            protocol: None,
            ingress: false,
            egress: false,
            accept: false,
            reject: false,
            port: None,
            addr: None,
            src_port: None,
            src_addr: None,
            pkt_src_addr: None,
            dst_port: None,
            dst_addr: None,
            pkt_dst_addr: None,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load the config file, if any, and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.log_level()?;
        Ok(config)
    }

    /// Apply `AWSFL_*` overrides read through `var`
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| var(&format!("{ENV_PREFIX}{key}")).filter(|v| !v.trim().is_empty());

        if let Some(region) = get("REGION") {
            self.region = Some(region);
        }
        if let Some(profile) = get("PROFILE") {
            self.profile = Some(profile);
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.log_level = level;
            self.log_level()?;
        }
        if let Some(limit) = get("LIMIT") {
            self.query.limit = parse_number("LIMIT", &limit)?;
        }
        if let Some(minutes) = get("MINUTES") {
            self.query.minutes = parse_number("MINUTES", &minutes)?;
        }

        let query = &mut self.query;
        for (key, flag) in [
            ("INGRESS", &mut query.ingress),
            ("EGRESS", &mut query.egress),
            ("ACCEPT", &mut query.accept),
            ("REJECT", &mut query.reject),
        ] {
            if let Some(value) = get(key) {
                *flag = parse_bool(key, &value)?;
            }
        }
        for (key, port) in [
            ("PORT", &mut query.port),
            ("SRC_PORT", &mut query.src_port),
            ("DST_PORT", &mut query.dst_port),
        ] {
            if let Some(value) = get(key) {
                *port = Some(parse_number(key, &value)?);
            }
        }
        for (key, text) in [
            ("PROTOCOL", &mut query.protocol),
            ("ADDR", &mut query.addr),
            ("SRC_ADDR", &mut query.src_addr),
            ("PKT_SRC_ADDR", &mut query.pkt_src_addr),
            ("DST_ADDR", &mut query.dst_addr),
            ("PKT_DST_ADDR", &mut query.pkt_dst_addr),
        ] {
            if let Some(value) = get(key) {
                *text = Some(value.trim().to_string());
            }
        }
        Ok(())
    }

    pub fn log_level(&self) -> Result<Level> {
        let level = self.log_level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            bail!(
                "invalid log level {:?}, expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            );
        }
        level
            .parse()
            .with_context(|| format!("invalid log level {:?}", self.log_level))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn query_policy(&self) -> QueryPolicy {
        QueryPolicy {
            deadline: Duration::from_secs(self.query_timeout_secs),
            ..QueryPolicy::default()
        }
    }

    pub fn extra_tags(&self) -> Tags {
        self.tags
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

fn parse_number(key: &str, value: &str) -> Result<i32> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{ENV_PREFIX}{key} is not a number: {value}"))
}

/// Accepts the spellings `1 t T TRUE true True` and `0 f F FALSE false False`
fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => bail!("{ENV_PREFIX}{key} is not a boolean: {value}"),
    }
}
