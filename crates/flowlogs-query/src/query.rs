use crate::catalog::fields::{self, QUERY_FIELDS};
use crate::catalog::protocol_number;

const SORT_CLAUSE: &str = "| sort @timestamp desc";

/// Flow log query under construction.
///
/// Every predicate appends one filter clause in call order; repeated
/// predicates are kept as repeated clauses. Values are interpolated as-is.
/// Filter clauses open a parenthesis they never close, which the log store
/// tolerates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    clauses: Vec<String>,
    limit: i32,
    since_minutes: i32,
}

impl Query {
    /// Start a query projecting the flow log fields.
    ///
    /// `limit` and `since_minutes` are passed to the log store unchecked.
    pub fn new(limit: i32, since_minutes: i32) -> Self {
        Self {
            clauses: vec![format!("fields {}", QUERY_FIELDS.join(", "))],
            limit,
            since_minutes,
        }
    }

    fn filter(mut self, expr: impl AsRef<str>) -> Self {
        self.clauses.push(format!("| filter ({}", expr.as_ref()));
        self
    }

    pub fn ingress(self) -> Self {
        self.filter(format!(r#"{} == "ingress""#, fields::FLOW_DIRECTION))
    }

    pub fn egress(self) -> Self {
        self.filter(format!(r#"{} == "egress""#, fields::FLOW_DIRECTION))
    }

    pub fn accept(self) -> Self {
        self.filter(format!(r#"{} == "ACCEPT""#, fields::ACTION))
    }

    pub fn reject(self) -> Self {
        self.filter(format!(r#"{} == "REJECT""#, fields::ACTION))
    }

    /// Drop records for intervals with no traffic
    pub fn exclude_no_data(self) -> Self {
        self.filter(format!(r#"{} != "NODATA""#, fields::LOG_STATUS))
    }

    /// Drop records for intervals the provider skipped
    pub fn exclude_skip_data(self) -> Self {
        self.filter(format!(r#"{} != "SKIPDATA""#, fields::LOG_STATUS))
    }

    /// Filter by protocol keyword, e.g. `tcp`.
    ///
    /// An unknown keyword leaves the query unchanged, so every protocol
    /// matches.
    pub fn protocol(self, keyword: &str) -> Self {
        match protocol_number(keyword) {
            Some(number) => self.filter(format!(r#"{} == "{}""#, fields::PROTOCOL, number)),
            None => self,
        }
    }

    /// Source or destination port
    pub fn port(self, port: i32) -> Self {
        self.filter(format!(
            r#"{} == "{port}" or {} == "{port}""#,
            fields::SRC_PORT,
            fields::DST_PORT
        ))
    }

    pub fn source_port(self, port: i32) -> Self {
        self.filter(format!(r#"{} == "{port}""#, fields::SRC_PORT))
    }

    pub fn destination_port(self, port: i32) -> Self {
        self.filter(format!(r#"{} == "{port}""#, fields::DST_PORT))
    }

    /// Source, destination or packet-level address
    pub fn address(self, addr: &str) -> Self {
        self.filter(format!(
            r#"{} == "{addr}" or {} == "{addr}" or {} == "{addr}" or {} == "{addr}""#,
            fields::SRC_ADDR,
            fields::PKT_SRC_ADDR,
            fields::DST_ADDR,
            fields::PKT_DST_ADDR
        ))
    }

    pub fn source_address(self, addr: &str) -> Self {
        self.filter(format!(r#"{} == "{addr}""#, fields::SRC_ADDR))
    }

    pub fn destination_address(self, addr: &str) -> Self {
        self.filter(format!(r#"{} == "{addr}""#, fields::DST_ADDR))
    }

    pub fn packet_source_address(self, addr: &str) -> Self {
        self.filter(format!(r#"{} == "{addr}""#, fields::PKT_SRC_ADDR))
    }

    pub fn packet_destination_address(self, addr: &str) -> Self {
        self.filter(format!(r#"{} == "{addr}""#, fields::PKT_DST_ADDR))
    }

    pub fn interface_id(self, id: &str) -> Self {
        self.filter(format!(r#"{} == "{id}""#, fields::INTERFACE_ID))
    }

    /// Finish the query, newest records first
    pub fn sort(mut self) -> CompiledQuery {
        self.clauses.push(SORT_CLAUSE.to_string());
        CompiledQuery { inner: self }
    }

    /// Query text, one clause per line
    pub fn render(&self) -> String {
        self.clauses.join("\n")
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    pub fn limit(&self) -> i32 {
        self.limit
    }

    pub fn window_minutes(&self) -> i32 {
        self.since_minutes
    }
}

/// A sorted query, ready to run against the log store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledQuery {
    inner: Query,
}

impl CompiledQuery {
    pub fn render(&self) -> String {
        self.inner.render()
    }

    /// Maximum number of records to return
    pub fn limit(&self) -> i32 {
        self.inner.limit
    }

    /// Search window, ending now
    pub fn window_minutes(&self) -> i32 {
        self.inner.since_minutes
    }
}
