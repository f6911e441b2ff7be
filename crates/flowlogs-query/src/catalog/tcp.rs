/// Flag names by bit position, lowest bit first
const TCP_FLAGS: [&str; 8] = ["FIN", "SYN", "RST", "PSH", "ACK", "URG", "RESERVED", "RESERVED"];

/// Decode the 8-bit `tcpFlags` field into flag names.
///
/// Names come out in bit order, not sorted. A value of 0 decodes to `ACK`:
/// flow logs report a flow of only ACK packets as 0 rather than 16. Unset,
/// non-numeric or out of range values decode to nothing.
pub fn tcp_flag_names(bitfield: &str) -> Vec<&'static str> {
    let Some(value) = bitfield.parse::<i64>().ok().and_then(|v| u8::try_from(v).ok()) else {
        return Vec::new();
    };

    if value == 0 {
        return vec!["ACK"];
    }

    TCP_FLAGS
        .iter()
        .enumerate()
        .filter(|(bit, _)| value & (1 << bit) != 0)
        .map(|(_, name)| *name)
        .collect()
}
