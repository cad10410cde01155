//! Service layer for the archiver.
//!
//! This module contains the business logic for:
//! - Channel classification (`classify_all`, `sanitize_thread_name`)
//! - Include/exclude filtering (`ChannelFilter`)
//! - Capture tool invocation (`ChannelExporter`, `CliExporter`)
//! - Export metadata (`count_messages`, `extract_thread_metadata`)

mod classifier;
mod exporter;
mod filter;
mod metadata;

pub use classifier::{classify_all, classify_channel, sanitize_thread_name};
pub use exporter::{
    ChannelExporter, CliExporter, ExportOutcome, ExportRequest, build_export_args,
    parse_channel_listing,
};
pub use filter::ChannelFilter;
pub use metadata::{ExportDocument, ThreadMetadata, count_messages, extract_thread_metadata};
