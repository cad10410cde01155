// src/models/summary.rs

//! Run summaries returned by the pipeline stages.

use serde::Serialize;

/// A failed (unit, format) capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportError {
    pub unit: String,
    pub format: String,
    pub message: String,
}

/// Aggregated result of a synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub units_updated: usize,
    pub units_failed: usize,
    pub total_format_exports: usize,
    pub errors: Vec<ExportError>,
}

impl SyncSummary {
    pub fn push_error(
        &mut self,
        unit: impl Into<String>,
        format: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(ExportError {
            unit: unit.into(),
            format: format.into(),
            message: message.into(),
        });
    }

    pub fn has_failures(&self) -> bool {
        self.units_failed > 0 || !self.errors.is_empty()
    }
}

/// Result of moving raw captures into the public layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganizeStats {
    pub files_organized: usize,
    pub units_processed: usize,
    pub errors: Vec<String>,
}

/// Result of rebuilding the navigation pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavigationStats {
    pub servers: usize,
    pub channels: usize,
    pub groups: usize,
    pub threads: usize,
    pub pages_written: usize,
}
