//! Static lookup tables for flow log fields
//!
//! Every function here is total: malformed input decodes to an empty value,
//! never an error.

pub mod fields;
mod path;
mod protocol;
mod tcp;

pub use path::traffic_path_label;
pub use protocol::{Protocol, protocol, protocol_name, protocol_number};
pub use tcp::tcp_flag_names;
