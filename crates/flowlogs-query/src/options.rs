use crate::query::{CompiledQuery, Query};

/// Query filters collected from the command line or configuration.
///
/// Unset fields and negative ports add no clause. [`QueryOptions::build`]
/// applies the set filters in a fixed order regardless of how they were
/// supplied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryOptions {
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
    pub interface_id: Option<String>,
}

impl Default for QueryOptions {
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
            interface_id: None,
        }
    }
}

impl QueryOptions {
    pub fn new(limit: i32, minutes: i32) -> Self {
        Self {
            limit,
            minutes,
            ..Self::default()
        }
    }

    pub fn build(&self) -> CompiledQuery {
        let mut query = Query::new(self.limit, self.minutes);

        if let Some(protocol) = non_empty(&self.protocol) {
            query = query.protocol(protocol);
        }
        if self.egress {
            query = query.egress();
        }
        if self.ingress {
            query = query.ingress();
        }
        if self.accept {
            query = query.accept();
        }
        if self.reject {
            query = query.reject();
        }
        if let Some(port) = specific_port(self.port) {
            query = query.port(port);
        }
        if let Some(addr) = non_empty(&self.addr) {
            query = query.address(addr);
        }
        if let Some(port) = specific_port(self.src_port) {
            query = query.source_port(port);
        }
        if let Some(addr) = non_empty(&self.src_addr) {
            query = query.source_address(addr);
        }
        if let Some(addr) = non_empty(&self.pkt_src_addr) {
            query = query.packet_source_address(addr);
        }
        if let Some(port) = specific_port(self.dst_port) {
            query = query.destination_port(port);
        }
        if let Some(addr) = non_empty(&self.dst_addr) {
            query = query.destination_address(addr);
        }
        if let Some(addr) = non_empty(&self.pkt_dst_addr) {
            query = query.packet_destination_address(addr);
        }
        if let Some(id) = non_empty(&self.interface_id) {
            query = query.interface_id(id);
        }

        query.sort()
    }
}

fn specific_port(port: Option<i32>) -> Option<i32> {
    port.filter(|port| *port >= 0)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
