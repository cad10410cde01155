// src/models/state.rs

//! Persisted synchronization progress.
//!
//! ```text
//! {
//!   "<server>": {
//!     "channels": { "<channel>": { "last_export": ..., "last_message_id": ... } },
//!     "forums": { "<group>": { "threads": { "<thread-id>": { "name", "title", ... } } } }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress record of a plain channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub last_export: DateTime<Utc>,
    #[serde(default)]
    pub last_message_id: Option<String>,
}

/// Progress record of a thread inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    /// Filesystem-safe slug
    pub name: String,
    /// Original thread title
    pub title: String,
    pub last_export: DateTime<Utc>,
    #[serde(default)]
    pub last_message_id: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumState {
    #[serde(default)]
    pub threads: BTreeMap<String, ThreadRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerState {
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelRecord>,
    #[serde(default)]
    pub forums: BTreeMap<String, ForumState>,
}

/// Whole-run synchronization state, keyed by server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncState {
    pub servers: BTreeMap<String, ServerState>,
}

impl SyncState {
    pub fn channel(&self, server: &str, channel: &str) -> Option<&ChannelRecord> {
        self.servers.get(server)?.channels.get(channel)
    }

    pub fn thread(&self, server: &str, forum: &str, thread_id: &str) -> Option<&ThreadRecord> {
        self.servers
            .get(server)?
            .forums
            .get(forum)?
            .threads
            .get(thread_id)
    }

    /// Record a successful capture of a plain channel.
    ///
    /// `last_export` never moves backwards.
    pub fn record_channel(
        &mut self,
        server: &str,
        channel: &str,
        at: DateTime<Utc>,
        last_message_id: Option<String>,
    ) {
        let channels = &mut self.servers.entry(server.to_string()).or_default().channels;
        let last_export = channels
            .get(channel)
            .map_or(at, |previous| previous.last_export.max(at));
        channels.insert(
            channel.to_string(),
            ChannelRecord {
                last_export,
                last_message_id,
            },
        );
    }

    /// Record a successful capture of a thread.
    pub fn record_thread(&mut self, server: &str, forum: &str, thread_id: &str, mut record: ThreadRecord) {
        let threads = &mut self
            .servers
            .entry(server.to_string())
            .or_default()
            .forums
            .entry(forum.to_string())
            .or_default()
            .threads;
        if let Some(previous) = threads.get(thread_id) {
            record.last_export = record.last_export.max(previous.last_export);
        }
        threads.insert(thread_id.to_string(), record);
    }

    /// Group names known for a server.
    pub fn forum_names(&self, server: &str) -> Vec<String> {
        self.servers
            .get(server)
            .map(|s| s.forums.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of channel and thread records.
    pub fn entry_count(&self) -> usize {
        self.servers
            .values()
            .map(|s| {
                s.channels.len() + s.forums.values().map(|f| f.threads.len()).sum::<usize>()
            })
            .sum()
    }

    /// Combine two states, keeping the newer record wherever both have one.
    pub fn merge(ours: &SyncState, theirs: &SyncState) -> SyncState {
        let mut merged = ours.clone();
        for (server, their_server) in &theirs.servers {
            let target = merged.servers.entry(server.clone()).or_default();

            for (name, record) in &their_server.channels {
                match target.channels.get(name) {
                    Some(existing) if existing.last_export >= record.last_export => {}
                    _ => {
                        target.channels.insert(name.clone(), record.clone());
                    }
                }
            }

            for (forum, their_forum) in &their_server.forums {
                let threads = &mut target.forums.entry(forum.clone()).or_default().threads;
                for (id, record) in &their_forum.threads {
                    match threads.get(id) {
                        Some(existing) if existing.last_export >= record.last_export => {}
                        _ => {
                            threads.insert(id.clone(), record.clone());
                        }
                    }
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn thread(title: &str, at: &str) -> ThreadRecord {
        ThreadRecord {
            name: title.to_lowercase().replace(' ', "-"),
            title: title.into(),
            last_export: ts(at),
            last_message_id: None,
            archived: false,
        }
    }

    #[test]
    fn record_channel_is_monotonic() {
        let mut state = SyncState::default();
        state.record_channel("srv", "general", ts("2025-11-02T00:00:00Z"), None);
        state.record_channel("srv", "general", ts("2025-11-01T00:00:00Z"), Some("9".into()));

        let record = state.channel("srv", "general").unwrap();
        assert_eq!(record.last_export, ts("2025-11-02T00:00:00Z"));
        assert_eq!(record.last_message_id.as_deref(), Some("9"));
    }

    #[test]
    fn record_thread_creates_nested_maps() {
        let mut state = SyncState::default();
        state.record_thread("srv", "questions", "42", thread("How do I start", "2025-11-01T00:00:00Z"));

        assert_eq!(state.thread("srv", "questions", "42").unwrap().name, "how-do-i-start");
        assert_eq!(state.forum_names("srv"), vec!["questions"]);
        assert_eq!(state.entry_count(), 1);
    }

    #[test]
    fn serializes_to_documented_shape() {
        let mut state = SyncState::default();
        state.record_channel("srv", "general", ts("2025-11-01T00:00:00Z"), Some("100".into()));
        let value = serde_json::to_value(&state).unwrap();

        assert_eq!(
            value["srv"]["channels"]["general"]["last_message_id"],
            serde_json::json!("100")
        );
        assert!(value["srv"]["forums"].as_object().unwrap().is_empty());
    }

    #[test]
    fn merge_keeps_newer_entries() {
        let mut ours = SyncState::default();
        ours.record_channel("srv", "general", ts("2025-11-05T00:00:00Z"), None);
        ours.record_channel("srv", "random", ts("2025-11-01T00:00:00Z"), None);
        ours.record_thread("srv", "questions", "1", thread("Old", "2025-10-01T00:00:00Z"));

        let mut theirs = SyncState::default();
        theirs.record_channel("srv", "general", ts("2025-11-03T00:00:00Z"), None);
        theirs.record_channel("srv", "random", ts("2025-11-04T00:00:00Z"), None);
        theirs.record_thread("srv", "questions", "1", thread("New", "2025-11-01T00:00:00Z"));
        theirs.record_channel("other", "news", ts("2025-11-01T00:00:00Z"), None);

        let merged = SyncState::merge(&ours, &theirs);
        assert_eq!(
            merged.channel("srv", "general").unwrap().last_export,
            ts("2025-11-05T00:00:00Z")
        );
        assert_eq!(
            merged.channel("srv", "random").unwrap().last_export,
            ts("2025-11-04T00:00:00Z")
        );
        assert_eq!(merged.thread("srv", "questions", "1").unwrap().title, "New");
        assert!(merged.channel("other", "news").is_some());
        assert_eq!(merged.entry_count(), 4);
    }
}
