// src/models/archive.rs

//! Export formats and archive entries of the public layout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Output representation requested from the capture tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Html,
    Txt,
    Json,
    Csv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Html,
        ExportFormat::Txt,
        ExportFormat::Json,
        ExportFormat::Csv,
    ];

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Txt => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    /// Format selector understood by the capture tool.
    pub fn tool_name(&self) -> &'static str {
        match self {
            ExportFormat::Html => "HtmlDark",
            ExportFormat::Txt => "PlainText",
            ExportFormat::Json => "Json",
            ExportFormat::Csv => "Csv",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(&s.to_ascii_lowercase())
            .ok_or_else(|| AppError::validation(format!("unknown export format '{s}'")))
    }
}

/// One dated archive of a unit, with every format found for that period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    /// Period label, `YYYY-MM` (or `YYYY` for yearly partitions)
    pub date: String,
    pub formats: Vec<ExportFormat>,
    pub message_count: usize,
}

impl ArchiveEntry {
    pub fn year(&self) -> &str {
        self.date.split('-').next().unwrap_or(&self.date)
    }

    /// Path of the file for `format`, relative to the unit directory.
    pub fn href(&self, format: ExportFormat) -> String {
        format!("{0}/{0}.{1}", self.date, format.extension())
    }
}

/// Archives of a single calendar year, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearGroup {
    pub year: String,
    pub archives: Vec<ArchiveEntry>,
}

/// Group archives by year; years and the archives inside them sort newest first.
pub fn group_by_year(archives: &[ArchiveEntry]) -> Vec<YearGroup> {
    let mut groups: Vec<YearGroup> = Vec::new();
    let mut sorted = archives.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));

    for archive in sorted {
        let year = archive.year().to_string();
        match groups.last_mut() {
            Some(group) if group.year == year => group.archives.push(archive),
            _ => groups.push(YearGroup {
                year,
                archives: vec![archive],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str) -> ArchiveEntry {
        ArchiveEntry {
            date: date.into(),
            formats: vec![ExportFormat::Html],
            message_count: 0,
        }
    }

    #[test]
    fn test_group_by_year() {
        let archives = vec![
            entry("2025-01"),
            entry("2025-02"),
            entry("2024-12"),
            entry("2024-11"),
        ];
        let groups = group_by_year(&archives);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].year, "2025");
        assert_eq!(groups[1].year, "2024");

        let dates = |g: &YearGroup| g.archives.iter().map(|a| a.date.clone()).collect::<Vec<_>>();
        assert_eq!(dates(&groups[0]), vec!["2025-02", "2025-01"]);
        assert_eq!(dates(&groups[1]), vec!["2024-12", "2024-11"]);
    }

    #[test]
    fn test_group_by_year_empty() {
        assert!(group_by_year(&[]).is_empty());
    }

    #[test]
    fn test_format_names() {
        assert_eq!(ExportFormat::Txt.extension(), "txt");
        assert_eq!(ExportFormat::Txt.tool_name(), "PlainText");
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_href() {
        assert_eq!(entry("2025-11").href(ExportFormat::Csv), "2025-11/2025-11.csv");
    }
}
