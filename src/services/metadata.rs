// src/services/metadata.rs

//! Metadata derived from JSON exports.
//!
//! Two JSON shapes are accepted: one message record per line, or a single
//! document with a `messages` array (and an optional `channel.name`).

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value;

/// Threads quiet for longer than this are flagged as archived.
const ARCHIVE_AFTER_DAYS: i64 = 180;

/// Parsed contents of a JSON export.
#[derive(Debug, Clone, Default)]
pub struct ExportDocument {
    pub channel_name: Option<String>,
    pub messages: Vec<Value>,
}

impl ExportDocument {
    /// Read and parse an export, `None` when missing or unparsable.
    pub fn read(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Option<Self> {
        if let Ok(Value::Object(doc)) = serde_json::from_str::<Value>(content) {
            if let Some(Value::Array(messages)) = doc.get("messages") {
                let channel_name = doc
                    .get("channel")
                    .and_then(|c| c.get("name"))
                    .and_then(Value::as_str)
                    .map(String::from);
                return Some(Self {
                    channel_name,
                    messages: messages.clone(),
                });
            }
        }

        let mut messages = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            messages.push(serde_json::from_str::<Value>(line).ok()?);
        }
        Some(Self {
            channel_name: None,
            messages,
        })
    }

    pub fn last_message_id(&self) -> Option<String> {
        match self.messages.last()?.get("id")? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Date of the last message as `YYYY-MM-DD`.
    pub fn last_activity(&self) -> Option<String> {
        let raw = self.messages.last()?.get("timestamp")?.as_str()?;
        let parsed = DateTime::parse_from_rfc3339(raw).ok()?;
        Some(parsed.format("%Y-%m-%d").to_string())
    }
}

/// Number of messages in a JSON export; 0 when missing or unparsable.
pub fn count_messages(path: &Path) -> usize {
    ExportDocument::read(path).map_or(0, |doc| doc.messages.len())
}

/// Summary of a thread used on group index pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMetadata {
    pub title: Option<String>,
    pub reply_count: usize,
    pub last_activity: Option<String>,
    pub archived: bool,
}

pub fn extract_thread_metadata(path: &Path, now: DateTime<Utc>) -> Option<ThreadMetadata> {
    let doc = ExportDocument::read(path)?;
    let last_activity = doc.last_activity();
    let archived = last_activity
        .as_deref()
        .is_some_and(|date| is_stale(date, now));

    Some(ThreadMetadata {
        title: doc.channel_name.clone(),
        reply_count: doc.messages.len(),
        last_activity,
        archived,
    })
}

fn is_stale(date: &str, now: DateTime<Utc>) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| now.date_naive() - d > Duration::days(ARCHIVE_AFTER_DAYS))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-11-15T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_count_line_delimited() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("2025-11.json");
        fs::write(
            &path,
            "{\"id\":\"1\"}\n{\"id\":\"2\"}\n\n{\"id\":\"3\"}\n",
        )
        .unwrap();
        assert_eq!(count_messages(&path), 3);
    }

    #[test]
    fn test_count_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(count_messages(&tmp.path().join("nope.json")), 0);
    }

    #[test]
    fn test_count_unparsable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        fs::write(&path, "{\"id\":\"1\"}\nnot json\n").unwrap();
        assert_eq!(count_messages(&path), 0);
    }

    #[test]
    fn test_count_document_format() {
        let doc = serde_json::json!({
            "guild": {"id": "123", "name": "Test Server"},
            "channel": {"id": "456", "name": "test-thread"},
            "messages": [
                {"id": "1", "timestamp": "2025-11-01T10:00:00Z"},
                {"id": "2", "timestamp": "2025-11-01T10:01:00Z"},
                {"id": "3", "timestamp": "2025-11-01T10:02:00Z"},
                {"id": "4", "timestamp": "2025-11-01T10:03:00Z"},
                {"id": "5", "timestamp": "2025-11-01T10:04:00Z"}
            ]
        });
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("export.json");
        fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

        assert_eq!(count_messages(&path), 5);
        let parsed = ExportDocument::read(&path).unwrap();
        assert_eq!(parsed.last_message_id().as_deref(), Some("5"));
    }

    #[test]
    fn test_thread_metadata() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("2025-11.json");
        fs::write(
            &path,
            r#"{"channel":{"name":"How do I start?"},"messages":[{"id":"1","timestamp":"2025-11-01T10:00:00+00:00"},{"id":"2","timestamp":"2025-11-03T08:30:00+00:00"}]}"#,
        )
        .unwrap();

        let meta = extract_thread_metadata(&path, now()).unwrap();
        assert_eq!(meta.title.as_deref(), Some("How do I start?"));
        assert_eq!(meta.reply_count, 2);
        assert_eq!(meta.last_activity.as_deref(), Some("2025-11-03"));
        assert!(!meta.archived);
    }

    #[test]
    fn test_thread_metadata_archived() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("2025-01.json");
        fs::write(&path, "{\"id\":\"1\",\"timestamp\":\"2025-01-02T00:00:00Z\"}\n").unwrap();

        let meta = extract_thread_metadata(&path, now()).unwrap();
        assert!(meta.archived);
        assert_eq!(meta.title, None);
    }

    #[test]
    fn test_thread_metadata_missing() {
        let tmp = TempDir::new().unwrap();
        assert!(extract_thread_metadata(&tmp.path().join("x.json"), now()).is_none());
    }
}
