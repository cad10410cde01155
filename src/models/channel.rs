// src/models/channel.rs

//! Channel data structures.

use serde::{Deserialize, Serialize};

/// A channel as reported by the upstream listing, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredChannel {
    pub id: String,
    pub name: String,

    /// Name of the owning channel; only threads carry one
    #[serde(default)]
    pub parent: Option<String>,
}

impl DiscoveredChannel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// Classification decided once at discovery time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChannelKind {
    /// Ordinary channel, captured directly
    Plain,
    /// Forum-like container; never captured itself
    Group,
    /// Thread belonging to the named group
    Member { parent: String },
}

/// A classified channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
}
