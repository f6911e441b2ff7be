//! Turning raw log records into display rows
//!
//! Decoding never fails. Missing fields show as `-`, malformed ones decode to
//! empty values.

use chrono::NaiveDateTime;
use flowlogs_types::{LogRecord, NetworkInterfaces};

use crate::catalog::fields;
use crate::catalog::{protocol_name, tcp_flag_names, traffic_path_label};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Reformat a log store timestamp (`2024-12-04 14:50:07.000`) as `14:50:07`.
///
/// Returns an empty string when the input does not parse.
pub fn format_time(timestamp: &str) -> String {
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowDirection {
    Ingress,
    Egress,
    Other,
}

impl FlowDirection {
    pub fn parse(value: &str) -> Self {
        match value {
            "ingress" => Self::Ingress,
            "egress" => Self::Egress,
            _ => Self::Other,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Ingress => "<-ingress-",
            Self::Egress => "-egress-->",
            Self::Other => "",
        }
    }
}

/// Addresses and ports seen from the monitored interface
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowView {
    pub glyph: String,
    pub local_addr: String,
    pub local_port: String,
    pub remote_addr: String,
    pub remote_port: String,
}

impl FlowView {
    pub fn from_record(record: &LogRecord) -> Self {
        let get = |field: &str| record.field(field).to_string();
        let direction = FlowDirection::parse(record.field(fields::FLOW_DIRECTION));

        let (local, remote) = match direction {
            FlowDirection::Ingress => (
                (fields::DST_ADDR, fields::DST_PORT),
                (fields::SRC_ADDR, fields::SRC_PORT),
            ),
            FlowDirection::Egress => (
                (fields::SRC_ADDR, fields::SRC_PORT),
                (fields::DST_ADDR, fields::DST_PORT),
            ),
            FlowDirection::Other => return Self::default(),
        };

        Self {
            glyph: direction.glyph().to_string(),
            local_addr: get(local.0),
            local_port: get(local.1),
            remote_addr: get(remote.0),
            remote_port: get(remote.1),
        }
    }
}

/// One decoded record, ready for a table
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlainRow {
    pub time: String,
    pub interface_id: String,
    pub flow: FlowView,
    pub action: String,
    pub packets: String,
    pub bytes: String,
    pub protocol: String,
    pub tcp_flags: String,
    pub traffic_path: String,
}

/// A decoded record plus the interface it was captured on
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnrichedRow {
    pub row: PlainRow,
    pub interface_type: String,
    pub name: String,
}

pub fn decode_record(record: &LogRecord) -> PlainRow {
    let flow = FlowView::from_record(record);

    // Traffic path is only reported for egress traffic.
    let traffic_path = if flow.glyph == FlowDirection::Egress.glyph() {
        traffic_path_label(record.field(fields::TRAFFIC_PATH))
    } else {
        ""
    };

    PlainRow {
        time: format_time(record.field(fields::TIMESTAMP)),
        interface_id: record.field(fields::INTERFACE_ID).to_string(),
        flow,
        action: record.field(fields::ACTION).to_string(),
        packets: record.field(fields::PACKETS).to_string(),
        bytes: record.field(fields::BYTES).to_string(),
        protocol: protocol_name(record.field(fields::PROTOCOL))
            .unwrap_or_default()
            .to_string(),
        tcp_flags: tcp_flag_names(record.field(fields::TCP_FLAGS)).join(", "),
        traffic_path: traffic_path.to_string(),
    }
}

/// Decode a record and attach interface type and name.
///
/// A container service name on the record replaces the interface name.
pub fn decode_record_enriched(record: &LogRecord, interfaces: &NetworkInterfaces) -> EnrichedRow {
    let row = decode_record(record);
    let interface = interfaces.get_by_id(&row.interface_id);

    let interface_type = interface.map(|ni| ni.kind.clone()).unwrap_or_default();
    let name = match record.present(fields::ECS_SERVICE_NAME) {
        Some(service) => service.to_string(),
        None => interface.map(|ni| ni.name.clone()).unwrap_or_default(),
    };

    EnrichedRow {
        row,
        interface_type,
        name,
    }
}
