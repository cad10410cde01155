// src/models/mod.rs

//! Domain models for the archiver.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod archive;
mod channel;
mod config;
mod state;
mod summary;

// Re-export all public types
pub use archive::{ArchiveEntry, ExportFormat, YearGroup, group_by_year};
pub use channel::{Channel, ChannelKind, DiscoveredChannel};
pub use config::{
    CaptureConfig, Config, ExportConfig, LoggingConfig, Partition, PathsConfig, ServerConfig,
    SiteConfig,
};
pub use state::{ChannelRecord, ForumState, ServerState, SyncState, ThreadRecord};
pub use summary::{ExportError, NavigationStats, OrganizeStats, SyncSummary};
