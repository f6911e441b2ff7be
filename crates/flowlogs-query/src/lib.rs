//! Flow log queries for flowlogs
//!
//! This crate provides the field catalog, the query builder and the decoders
//! that turn returned records into display rows.

pub mod catalog;
mod decode;
mod options;
mod query;

pub use decode::{
    EnrichedRow, FlowDirection, FlowView, PlainRow, decode_record, decode_record_enriched,
    format_time,
};
pub use options::QueryOptions;
pub use query::{CompiledQuery, Query};

// Re-export types used in our public API
pub use flowlogs_types::{LogRecord, NetworkInterfaces};
