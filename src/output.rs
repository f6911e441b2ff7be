//! Plain-text tables for command output

use std::fmt::Display;

use unicode_width::UnicodeWidthStr;

use flowlogs_aws::{FlowLog, FlowLogs};
use flowlogs_query::{EnrichedRow, PlainRow};

const COLUMN_GAP: &str = "  ";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Left-aligned table sized to its widest cell per column
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.width());
            }
        }
        widths
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut out = String::new();
        for row in std::iter::once(&self.headers).chain(&self.rows) {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| pad(cell, *width))
                .collect::<Vec<_>>()
                .join(COLUMN_GAP);
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(cell.width());
    format!("{cell}{}", " ".repeat(fill))
}

pub fn flow_logs_table(flow_logs: &FlowLogs) -> Table {
    let mut table = Table::new(["NAME", "ID", "RESOURCE", "LOG GROUP", "CREATED"]);
    for flow_log in flow_logs {
        table.push(flow_log_row(flow_log));
    }
    table
}

fn flow_log_row(flow_log: &FlowLog) -> [String; 5] {
    [
        flow_log.name.clone(),
        flow_log.id.clone(),
        flow_log.resource_id.clone(),
        flow_log.log_group_name.clone(),
        flow_log
            .creation_time
            .map(|t| t.format(TIME_FORMAT).to_string())
            .unwrap_or_default(),
    ]
}

/// One-column listing of anything displayable
pub fn resources_table<T: Display>(header: &str, items: &[T]) -> Table {
    let mut table = Table::new([header]);
    for item in items {
        table.push([item.to_string()]);
    }
    table
}

const PLAIN_HEADERS: [&str; 11] = [
    "TIME", "INTERFACE", "LOCAL", "DIR", "REMOTE", "ACTION", "PROTO", "PACKETS", "BYTES",
    "FLAGS", "PATH",
];

pub fn plain_table(rows: &[PlainRow]) -> Table {
    let mut table = Table::new(PLAIN_HEADERS);
    for row in rows {
        table.push(plain_cells(row));
    }
    table
}

pub fn enriched_table(rows: &[EnrichedRow]) -> Table {
    let mut table = Table::new(PLAIN_HEADERS.into_iter().chain(["TYPE", "NAME"]));
    for row in rows {
        let mut cells = plain_cells(&row.row).to_vec();
        cells.extend([row.interface_type.clone(), row.name.clone()]);
        table.push(cells);
    }
    table
}

fn plain_cells(row: &PlainRow) -> [String; 11] {
    let flow = &row.flow;
    [
        row.time.clone(),
        row.interface_id.clone(),
        endpoint(&flow.local_addr, &flow.local_port),
        flow.glyph.clone(),
        endpoint(&flow.remote_addr, &flow.remote_port),
        row.action.clone(),
        row.protocol.clone(),
        row.packets.clone(),
        row.bytes.clone(),
        row.tcp_flags.clone(),
        row.traffic_path.clone(),
    ]
}

fn endpoint(addr: &str, port: &str) -> String {
    match (addr.is_empty(), port.is_empty() || port == "-") {
        (true, _) => String::new(),
        (false, true) => addr.to_string(),
        (false, false) => format!("{addr}:{port}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlogs_aws::Tags;
    use flowlogs_query::{LogRecord, decode_record};

    #[test]
    fn test_columns_align() {
        let mut table = Table::new(["A", "LONG HEADER"]);
        table.push(["wide cell", "x"]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "A          LONG HEADER");
        assert_eq!(lines[1], "wide cell  x");
    }

    #[test]
    fn test_wide_characters_counted_by_display_width() {
        let mut table = Table::new(["N", "V"]);
        table.push(["日本", "1"]);
        table.push(["ab", "2"]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[1], "日本  1");
        assert_eq!(lines[2], "ab    2");
    }

    #[test]
    fn test_short_rows_padded() {
        let mut table = Table::new(["A", "B", "C"]);
        table.push(["1"]);
        assert_eq!(table.render().lines().nth(1), Some("1"));
    }

    #[test]
    fn test_flow_logs_table() {
        let flow_logs: FlowLogs = vec![FlowLog::new(
            "fl-1".to_string(),
            "vpc-1".to_string(),
            "/fl-cli/vpc-1".to_string(),
            None,
            Tags::new().with("Name", "vpc-1"),
        )]
        .into();
        let rendered = flow_logs_table(&flow_logs).render();
        assert!(rendered.starts_with("NAME"));
        assert!(rendered.contains("vpc-1  fl-1  vpc-1     /fl-cli/vpc-1"));
    }

    #[test]
    fn test_plain_row_cells() {
        let record: LogRecord = [
            ("@timestamp", "2024-12-04 14:50:07.000"),
            ("flowDirection", "egress"),
            ("srcAddr", "10.0.0.5"),
            ("srcPort", "443"),
            ("dstAddr", "1.1.1.1"),
            ("dstPort", "51000"),
            ("action", "ACCEPT"),
            ("protocol", "6"),
        ]
        .into_iter()
        .collect();
        let cells = plain_cells(&decode_record(&record));
        assert_eq!(cells[0], "14:50:07");
        assert_eq!(cells[2], "10.0.0.5:443");
        assert_eq!(cells[4], "1.1.1.1:51000");
        assert_eq!(cells[6], "TCP");
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(endpoint("", ""), "");
        assert_eq!(endpoint("10.0.0.1", ""), "10.0.0.1");
        assert_eq!(endpoint("10.0.0.1", "-"), "10.0.0.1");
        assert_eq!(endpoint("-", "-"), "-");
    }
}
