//! Pipeline entry points for archiver operations.
//!
//! - `run_sync`: Capture new messages for every configured server
//! - `run_organize`: Move raw captures into the dated public layout
//! - `run_navigation`: Rebuild index pages from the public layout
//! - `run_pipeline`: All of the above in order

pub mod navigation;
pub mod organize;
pub mod pipeline;
pub mod render;
pub mod sync;
pub mod validate;

pub use navigation::{run_navigation, scan_public, write_site};
pub use organize::{organize_exports, run_organize};
pub use pipeline::{PipelineReport, run_pipeline};
pub use sync::{SyncPlan, SyncScheduler, plan_server, run_sync};
pub use validate::{run_info, run_validate};
