// src/pipeline/pipeline.rs

use serde::Serialize;

use crate::error::Result;
use crate::models::{Config, NavigationStats, OrganizeStats, SyncSummary};
use crate::services::ChannelExporter;
use crate::utils::report;

use super::navigation::run_navigation;
use super::organize::run_organize;
use super::sync::run_sync;

/// Results of every stage of a full run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    /// `None` when the sync step was skipped
    pub sync: Option<SyncSummary>,
    pub organize: OrganizeStats,
    pub navigation: NavigationStats,
}

impl PipelineReport {
    pub fn has_failures(&self) -> bool {
        self.sync.as_ref().is_some_and(SyncSummary::has_failures)
    }
}

/// Run the full pipeline: sync, organize, navigate.
///
/// Passing no exporter skips the sync step.
pub async fn run_pipeline(
    config: &Config,
    exporter: Option<&dyn ChannelExporter>,
) -> Result<PipelineReport> {
    report::header("Running archive pipeline");

    let total_steps = if exporter.is_some() { 3 } else { 2 };
    let mut current_step = 1;
    let mut result = PipelineReport::default();

    if let Some(exporter) = exporter {
        report::step(current_step, total_steps, "Sync - Capturing new messages");
        result.sync = Some(run_sync(config, exporter).await?);
        current_step += 1;
    }

    report::step(current_step, total_steps, "Organize - Building dated archives");
    result.organize = run_organize(config, false)?;
    current_step += 1;

    report::step(current_step, total_steps, "Navigate - Generating index pages");
    result.navigation = run_navigation(config)?;

    report::success("Pipeline complete");
    Ok(result)
}
