// src/services/classifier.rs

//! Channel classification and thread name sanitizing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Channel, ChannelKind, DiscoveredChannel};

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("static pattern"));
static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("static pattern"));

const MAX_SLUG_LEN: usize = 100;
const MIN_SLUG_LEN: usize = 3;

/// Classify one channel against the full listing.
///
/// A parent reference always wins; then the configured forum list; then any
/// channel naming this one as its parent.
pub fn classify_channel(
    channel: &DiscoveredChannel,
    forum_list: &[String],
    all_channels: &[DiscoveredChannel],
) -> ChannelKind {
    if let Some(parent) = &channel.parent {
        return ChannelKind::Member {
            parent: parent.clone(),
        };
    }

    if forum_list.iter().any(|f| f == &channel.name) {
        return ChannelKind::Group;
    }

    let has_threads = all_channels
        .iter()
        .any(|other| other.parent.as_deref() == Some(channel.name.as_str()));
    if has_threads {
        return ChannelKind::Group;
    }

    ChannelKind::Plain
}

/// Classify a whole listing in one pass.
pub fn classify_all(channels: &[DiscoveredChannel], forum_list: &[String]) -> Vec<Channel> {
    let parents: HashSet<&str> = channels.iter().filter_map(|c| c.parent.as_deref()).collect();

    channels
        .iter()
        .map(|channel| {
            let kind = match &channel.parent {
                Some(parent) => ChannelKind::Member {
                    parent: parent.clone(),
                },
                None if forum_list.contains(&channel.name) => ChannelKind::Group,
                None if parents.contains(channel.name.as_str()) => ChannelKind::Group,
                None => ChannelKind::Plain,
            };
            Channel {
                id: channel.id.clone(),
                name: channel.name.clone(),
                kind,
            }
        })
        .collect()
}

/// Turn a thread title into a filesystem-safe directory name.
///
/// Titles that sanitize to fewer than three characters fall back to `thread-<id>`.
pub fn sanitize_thread_name(title: &str, thread_id: &str) -> String {
    let lowered = title.to_lowercase().replace(' ', "-");
    let stripped = NON_SLUG.replace_all(&lowered, "");
    let collapsed = HYPHEN_RUNS.replace_all(&stripped, "-");
    let trimmed = collapsed.trim_matches('-');
    let truncated: String = trimmed.chars().take(MAX_SLUG_LEN).collect();

    if truncated.len() < MIN_SLUG_LEN {
        return format!("thread-{thread_id}");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Vec<DiscoveredChannel> {
        vec![
            DiscoveredChannel::new("1", "general"),
            DiscoveredChannel::new("2", "questions"),
            DiscoveredChannel::new("3", "how-do-i-start").with_parent("questions"),
            DiscoveredChannel::new("4", "showcase"),
            DiscoveredChannel::new("5", "admin"),
        ]
    }

    #[test]
    fn test_parent_always_wins() {
        let channels = listing();
        let forums = vec!["how-do-i-start".to_string()];
        assert_eq!(
            classify_channel(&channels[2], &forums, &channels),
            ChannelKind::Member {
                parent: "questions".into()
            }
        );
    }

    #[test]
    fn test_configured_forum() {
        let channels = listing();
        let forums = vec!["showcase".to_string()];
        assert_eq!(classify_channel(&channels[3], &forums, &channels), ChannelKind::Group);
    }

    #[test]
    fn test_auto_detected_forum() {
        let channels = listing();
        assert_eq!(classify_channel(&channels[1], &[], &channels), ChannelKind::Group);
    }

    #[test]
    fn test_plain_channel() {
        let channels = listing();
        assert_eq!(classify_channel(&channels[0], &[], &channels), ChannelKind::Plain);
    }

    #[test]
    fn test_self_parent_is_member() {
        let channel = DiscoveredChannel::new("9", "loop").with_parent("loop");
        let channels = vec![channel.clone()];
        let forums = vec!["loop".to_string()];
        assert_eq!(
            classify_channel(&channel, &forums, &channels),
            ChannelKind::Member {
                parent: "loop".into()
            }
        );
    }

    #[test]
    fn test_classify_all_matches_single() {
        let channels = listing();
        let forums = vec!["showcase".to_string()];
        let classified = classify_all(&channels, &forums);

        for (channel, result) in channels.iter().zip(&classified) {
            assert_eq!(classify_channel(channel, &forums, &channels), result.kind);
        }
        assert_eq!(classified[1].kind, ChannelKind::Group);
    }

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_thread_name("How do I start?", "1"), "how-do-i-start");
        assert_eq!(
            sanitize_thread_name("  Tape-out -- schedule!! ", "1"),
            "tape-out-schedule"
        );
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(150);
        assert_eq!(sanitize_thread_name(&long, "1").len(), 100);
    }

    #[test]
    fn test_sanitize_short_falls_back_to_id() {
        assert_eq!(sanitize_thread_name("??", "123456"), "thread-123456");
        assert_eq!(sanitize_thread_name("ab", "7"), "thread-7");
        assert_eq!(sanitize_thread_name("abc", "7"), "abc");
    }
}
