// src/pipeline/sync.rs

//! Incremental synchronization of every configured server.
//!
//! Servers, channels and formats are processed strictly one after another.
//! The sync state is taken by value, updated only after successful captures
//! and handed back to the caller, which persists it once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;
use crate::models::{
    Channel, ChannelKind, Config, ServerConfig, SyncState, SyncSummary, ThreadRecord,
};
use crate::services::{
    ChannelExporter, ChannelFilter, ExportDocument, ExportOutcome, ExportRequest, classify_all,
    extract_thread_metadata, sanitize_thread_name,
};
use crate::storage::StateStore;
use crate::utils::report;

/// Where a unit's captures land and how its progress is keyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitTarget {
    /// Plain channel, keyed by name
    Channel,
    /// Thread of a group, keyed by thread id under the group
    Thread { group: String },
}

/// One unit to capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTask {
    pub channel_id: String,
    /// Channel name or thread title
    pub title: String,
    /// File stem of the raw captures
    pub slug: String,
    pub target: UnitTarget,
}

impl UnitTask {
    /// Human-readable unit name used in the run summary.
    pub fn label(&self) -> String {
        match &self.target {
            UnitTarget::Channel => self.title.clone(),
            UnitTarget::Thread { group } => format!("{group}/{}", self.title),
        }
    }
}

/// Scheduling decision for one discovered channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPlan {
    Capture(UnitTask),
    /// Group channel: only its directory is created
    Container { group: String },
    Skip { name: String, reason: &'static str },
}

/// Decide what to do with every classified channel of a server.
pub fn plan_server(channels: &[Channel], filter: &ChannelFilter) -> Vec<SyncPlan> {
    let mut plans: Vec<SyncPlan> = channels
        .iter()
        .map(|channel| match &channel.kind {
            ChannelKind::Group if filter.should_include(&channel.name) => SyncPlan::Container {
                group: channel.name.clone(),
            },
            ChannelKind::Plain if filter.should_include(&channel.name) => {
                SyncPlan::Capture(UnitTask {
                    channel_id: channel.id.clone(),
                    title: channel.name.clone(),
                    slug: channel.name.clone(),
                    target: UnitTarget::Channel,
                })
            }
            ChannelKind::Group | ChannelKind::Plain => SyncPlan::Skip {
                name: channel.name.clone(),
                reason: "excluded by pattern",
            },
            ChannelKind::Member { .. } if filter.is_excluded(&channel.name) => SyncPlan::Skip {
                name: channel.name.clone(),
                reason: "excluded by pattern",
            },
            ChannelKind::Member { parent } if !filter.should_include(parent) => SyncPlan::Skip {
                name: channel.name.clone(),
                reason: "group not selected",
            },
            ChannelKind::Member { parent } => SyncPlan::Capture(UnitTask {
                channel_id: channel.id.clone(),
                title: channel.name.clone(),
                slug: sanitize_thread_name(&channel.name, &channel.id),
                target: UnitTarget::Thread {
                    group: parent.clone(),
                },
            }),
        })
        .collect();
    dedupe_thread_slugs(&mut plans);
    plans
}

/// Threads of one group whose titles collapse to the same slug get the
/// thread id appended, first one keeps the plain slug.
fn dedupe_thread_slugs(plans: &mut [SyncPlan]) {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for plan in plans.iter_mut() {
        let SyncPlan::Capture(task) = plan else {
            continue;
        };
        let UnitTarget::Thread { group } = &task.target else {
            continue;
        };
        if !seen.insert((group.clone(), task.slug.clone())) {
            task.slug = format!("{}-{}", task.slug, task.channel_id);
            seen.insert((group.clone(), task.slug.clone()));
        }
    }
}

/// Drives the capture tool over every configured server.
pub struct SyncScheduler<'a> {
    config: &'a Config,
    exporter: &'a dyn ChannelExporter,
    exports_dir: PathBuf,
}

impl<'a> SyncScheduler<'a> {
    pub fn new(config: &'a Config, exporter: &'a dyn ChannelExporter) -> Self {
        Self {
            config,
            exporter,
            exports_dir: config.paths.exports_dir.clone(),
        }
    }

    /// Synchronize all servers, returning the updated state and the run summary.
    pub async fn run(&self, mut state: SyncState) -> (SyncState, SyncSummary) {
        let mut summary = SyncSummary::default();

        for (key, server) in &self.config.servers {
            report::separator();
            log::info!("Processing server: {}", self.config.server_display_name(key));
            if let Err(e) = self.sync_server(key, server, &mut state, &mut summary).await {
                log::error!("Server {key} aborted: {e}");
                summary.push_error(key.as_str(), "N/A", e.to_string());
            }
        }

        (state, summary)
    }

    async fn sync_server(
        &self,
        key: &str,
        server: &ServerConfig,
        state: &mut SyncState,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let filter = ChannelFilter::new(&server.include_channels, &server.exclude_channels)?;
        let server_dir = self.exports_dir.join(key);
        tokio::fs::create_dir_all(&server_dir).await?;

        let discovered = self.exporter.list_channels(&server.guild_id).await?;
        log::info!("Found {} channels", discovered.len());

        let channels = classify_all(&discovered, &server.forum_channels);
        for plan in plan_server(&channels, &filter) {
            match plan {
                SyncPlan::Container { group } => {
                    tokio::fs::create_dir_all(server_dir.join(&group)).await?;
                    log::info!("Created forum directory: {group}/");
                }
                SyncPlan::Skip { name, reason } => {
                    log::debug!("Skipping {name} ({reason})");
                }
                SyncPlan::Capture(task) => {
                    self.sync_unit(key, &server_dir, &task, state, summary).await;
                }
            }
        }
        Ok(())
    }

    /// Capture one unit in every configured format.
    ///
    /// The record advances only when every format succeeded; otherwise the
    /// unit is counted as failed and retried from the same point next run.
    async fn sync_unit(
        &self,
        server_key: &str,
        server_dir: &Path,
        task: &UnitTask,
        state: &mut SyncState,
        summary: &mut SyncSummary,
    ) {
        let export_dir = match &task.target {
            UnitTarget::Channel => server_dir.to_path_buf(),
            UnitTarget::Thread { group } => server_dir.join(group),
        };
        if let Err(e) = tokio::fs::create_dir_all(&export_dir).await {
            summary.push_error(task.label(), "N/A", e.to_string());
            summary.units_failed += 1;
            return;
        }

        let after = match &task.target {
            UnitTarget::Channel => state.channel(server_key, &task.title).map(|r| r.last_export),
            UnitTarget::Thread { group } => state
                .thread(server_key, group, &task.channel_id)
                .map(|r| r.last_export),
        };
        match after {
            Some(after) => log::info!("Exporting #{} (after {after})", task.label()),
            None => log::info!("Exporting #{} (full history)", task.label()),
        }

        let export = &self.config.export;
        let mut failures = 0;
        for format in &export.formats {
            let request = ExportRequest {
                channel_id: task.channel_id.clone(),
                output_path: export_dir.join(format!("{}.{}", task.slug, format.extension())),
                format: *format,
                after,
                media_dir: export
                    .download_media
                    .then(|| export_dir.join(format!("{}_media", task.slug))),
            };

            match self.exporter.export(&request).await {
                ExportOutcome::Exported => {
                    summary.total_format_exports += 1;
                    report::sub_item(&format!("✓ {}", format.extension().to_uppercase()));
                }
                ExportOutcome::GroupContainer if task.target == UnitTarget::Channel => {
                    // Forum that was not configured and has no listed threads yet.
                    if let Err(e) = tokio::fs::create_dir_all(server_dir.join(&task.slug)).await {
                        log::warn!("Cannot create forum directory {}: {e}", task.slug);
                    }
                    log::info!("{} is a forum, created directory only", task.title);
                    return;
                }
                ExportOutcome::GroupContainer => {
                    failures += 1;
                    summary.push_error(
                        task.label(),
                        format.extension(),
                        "thread reported as a forum container",
                    );
                }
                ExportOutcome::Failed(message) => {
                    failures += 1;
                    report::sub_item(&format!(
                        "✗ {} failed",
                        format.extension().to_uppercase()
                    ));
                    summary.push_error(task.label(), format.extension(), message);
                }
            }
        }

        if failures > 0 {
            summary.units_failed += 1;
            return;
        }

        self.record_success(server_key, &export_dir, task, state);
        summary.units_updated += 1;
    }

    fn record_success(
        &self,
        server_key: &str,
        export_dir: &Path,
        task: &UnitTask,
        state: &mut SyncState,
    ) {
        let now = Utc::now();
        let json_path = export_dir.join(format!("{}.json", task.slug));
        let fresh_id = ExportDocument::read(&json_path).and_then(|doc| doc.last_message_id());

        match &task.target {
            UnitTarget::Channel => {
                let previous_id = state
                    .channel(server_key, &task.title)
                    .and_then(|r| r.last_message_id.clone());
                state.record_channel(server_key, &task.title, now, fresh_id.or(previous_id));
            }
            UnitTarget::Thread { group } => {
                let previous = state.thread(server_key, group, &task.channel_id);
                let previous_id = previous.and_then(|r| r.last_message_id.clone());
                let archived = extract_thread_metadata(&json_path, now)
                    .map(|m| m.archived)
                    .or_else(|| previous.map(|r| r.archived))
                    .unwrap_or(false);
                let record = ThreadRecord {
                    name: task.slug.clone(),
                    title: task.title.clone(),
                    last_export: now,
                    last_message_id: fresh_id.or(previous_id),
                    archived,
                };
                state.record_thread(server_key, group, &task.channel_id, record);
            }
        }
    }
}

/// Run a full synchronization: load state, capture, persist state once.
pub async fn run_sync(config: &Config, exporter: &dyn ChannelExporter) -> Result<SyncSummary> {
    report::header("Synchronizing channels");

    let store = StateStore::new(&config.paths.state_file);
    let state = store.load().await?;
    log::info!(
        "Loaded sync state with {} records from {}",
        state.entry_count(),
        store.path().display()
    );

    let scheduler = SyncScheduler::new(config, exporter);
    let (state, summary) = scheduler.run(state).await;

    store.save(&state).await?;

    report::summary(
        "Export",
        &[
            ("Units updated", summary.units_updated.to_string()),
            ("Units failed", summary.units_failed.to_string()),
            ("Total exports", summary.total_format_exports.to_string()),
        ],
    );
    for error in &summary.errors {
        log::warn!("{} ({}): {}", error.unit, error.format, error.message);
    }

    Ok(summary)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    use crate::error::AppError;
    use crate::models::{DiscoveredChannel, ExportFormat};

    /// Records every invocation and writes a small JSON-lines file per export.
    #[derive(Default)]
    pub(crate) struct FakeExporter {
        pub channels: Vec<DiscoveredChannel>,
        pub failing: HashSet<(String, ExportFormat)>,
        pub forums: HashSet<String>,
        pub list_error: bool,
        pub calls: Mutex<Vec<ExportRequest>>,
    }

    impl FakeExporter {
        pub(crate) fn new(channels: Vec<DiscoveredChannel>) -> Self {
            Self {
                channels,
                ..Self::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<ExportRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn exported_ids(&self) -> HashSet<String> {
            self.calls().into_iter().map(|r| r.channel_id).collect()
        }
    }

    #[async_trait]
    impl ChannelExporter for FakeExporter {
        async fn list_channels(&self, guild_id: &str) -> crate::error::Result<Vec<DiscoveredChannel>> {
            if self.list_error {
                return Err(AppError::capture(guild_id, "listing refused"));
            }
            Ok(self.channels.clone())
        }

        async fn export(&self, request: &ExportRequest) -> ExportOutcome {
            self.calls.lock().unwrap().push(request.clone());
            if self.forums.contains(&request.channel_id) {
                return ExportOutcome::GroupContainer;
            }
            if self
                .failing
                .contains(&(request.channel_id.clone(), request.format))
            {
                return ExportOutcome::Failed("Export timed out after 300 seconds".into());
            }
            let body = format!(
                "{{\"id\":\"{0}01\",\"timestamp\":\"2025-11-01T10:00:00Z\"}}\n{{\"id\":\"{0}02\",\"timestamp\":\"2025-11-02T10:00:00Z\"}}\n",
                request.channel_id
            );
            std::fs::write(&request.output_path, body).unwrap();
            ExportOutcome::Exported
        }
    }

    pub(crate) fn scenario_channels() -> Vec<DiscoveredChannel> {
        vec![
            DiscoveredChannel::new("100", "general"),
            DiscoveredChannel::new("200", "questions"),
            DiscoveredChannel::new("300", "How do I start?").with_parent("questions"),
            DiscoveredChannel::new("400", "admin"),
        ]
    }

    pub(crate) fn scenario_config(root: &Path, formats: Vec<ExportFormat>) -> Config {
        let mut config = Config::default();
        config.export.formats = formats;
        config.paths.exports_dir = root.join("exports");
        config.paths.public_dir = root.join("public");
        config.paths.state_file = root.join("state.json");
        let mut servers = BTreeMap::new();
        servers.insert(
            "srv".to_string(),
            ServerConfig {
                guild_id: "42".into(),
                name: "Test Server".into(),
                include_channels: vec!["*".into()],
                exclude_channels: vec!["admin".into(), "private-*".into()],
                forum_channels: vec![],
            },
        );
        config.servers = servers;
        config
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_plan_scenario() {
        let channels = classify_all(&scenario_channels(), &[]);
        let filter = ChannelFilter::new(&["*".into()], &["admin".into()]).unwrap();
        let plans = plan_server(&channels, &filter);

        assert!(matches!(&plans[0], SyncPlan::Capture(t) if t.title == "general"));
        assert_eq!(
            plans[1],
            SyncPlan::Container {
                group: "questions".into()
            }
        );
        match &plans[2] {
            SyncPlan::Capture(task) => {
                assert_eq!(task.slug, "how-do-i-start");
                assert_eq!(
                    task.target,
                    UnitTarget::Thread {
                        group: "questions".into()
                    }
                );
                assert_eq!(task.label(), "questions/How do I start?");
            }
            other => panic!("unexpected plan {other:?}"),
        }
        assert!(matches!(&plans[3], SyncPlan::Skip { name, .. } if name == "admin"));
    }

    #[test]
    fn test_plan_member_of_unselected_group() {
        let channels = classify_all(&scenario_channels(), &[]);
        let filter = ChannelFilter::new(&["general".into()], &[]).unwrap();
        let plans = plan_server(&channels, &filter);

        assert!(matches!(&plans[1], SyncPlan::Skip { .. }));
        assert!(matches!(
            &plans[2],
            SyncPlan::Skip {
                reason: "group not selected",
                ..
            }
        ));
    }

    #[test]
    fn test_plan_colliding_thread_slugs() {
        let discovered = vec![
            DiscoveredChannel::new("200", "questions"),
            DiscoveredChannel::new("301", "Help!").with_parent("questions"),
            DiscoveredChannel::new("302", "help?").with_parent("questions"),
            DiscoveredChannel::new("400", "ideas"),
            DiscoveredChannel::new("401", "Help").with_parent("ideas"),
        ];
        let channels = classify_all(&discovered, &[]);
        let filter = ChannelFilter::new(&["*".into()], &[]).unwrap();

        let slugs: Vec<String> = plan_server(&channels, &filter)
            .into_iter()
            .filter_map(|plan| match plan {
                SyncPlan::Capture(task) => Some(task.slug),
                _ => None,
            })
            .collect();
        assert_eq!(slugs, vec!["help", "help-302", "help"]);
    }

    #[tokio::test]
    async fn test_colliding_threads_keep_separate_files() {
        let tmp = TempDir::new().unwrap();
        let config = scenario_config(tmp.path(), vec![ExportFormat::Json]);
        let exporter = FakeExporter::new(vec![
            DiscoveredChannel::new("200", "questions"),
            DiscoveredChannel::new("301", "Setup?").with_parent("questions"),
            DiscoveredChannel::new("302", "setup!").with_parent("questions"),
        ]);

        let scheduler = SyncScheduler::new(&config, &exporter);
        let (state, summary) = scheduler.run(SyncState::default()).await;

        assert_eq!(summary.units_updated, 2);
        assert!(tmp.path().join("exports/srv/questions/setup.json").is_file());
        assert!(tmp.path().join("exports/srv/questions/setup-302.json").is_file());
        assert_eq!(state.thread("srv", "questions", "302").unwrap().name, "setup-302");
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let tmp = TempDir::new().unwrap();
        let config = scenario_config(tmp.path(), vec![ExportFormat::Html, ExportFormat::Json]);
        let exporter = FakeExporter::new(scenario_channels());

        let scheduler = SyncScheduler::new(&config, &exporter);
        let (state, summary) = scheduler.run(SyncState::default()).await;

        let ids = exporter.exported_ids();
        assert_eq!(ids, HashSet::from(["100".to_string(), "300".to_string()]));
        assert_eq!(exporter.calls().len(), 4);

        assert!(tmp.path().join("exports/srv/questions").is_dir());
        assert!(tmp.path().join("exports/srv/general.html").is_file());
        assert!(tmp.path().join("exports/srv/questions/how-do-i-start.json").is_file());
        assert!(!tmp.path().join("exports/srv/admin.html").exists());

        assert_eq!(summary.units_updated, 2);
        assert_eq!(summary.units_failed, 0);
        assert_eq!(summary.total_format_exports, 4);
        assert!(summary.errors.is_empty());

        let general = state.channel("srv", "general").unwrap();
        assert_eq!(general.last_message_id.as_deref(), Some("10002"));
        let thread = state.thread("srv", "questions", "300").unwrap();
        assert_eq!(thread.name, "how-do-i-start");
        assert_eq!(thread.title, "How do I start?");
    }

    #[tokio::test]
    async fn test_incremental_uses_last_export() {
        let tmp = TempDir::new().unwrap();
        let config = scenario_config(tmp.path(), vec![ExportFormat::Json]);
        let exporter = FakeExporter::new(scenario_channels());

        let mut state = SyncState::default();
        state.record_channel("srv", "general", ts("2025-10-01T00:00:00Z"), Some("7".into()));

        let scheduler = SyncScheduler::new(&config, &exporter);
        let (state, _) = scheduler.run(state).await;

        let calls = exporter.calls();
        let general = calls.iter().find(|c| c.channel_id == "100").unwrap();
        assert_eq!(general.after, Some(ts("2025-10-01T00:00:00Z")));
        let thread = calls.iter().find(|c| c.channel_id == "300").unwrap();
        assert_eq!(thread.after, None);

        assert!(state.channel("srv", "general").unwrap().last_export > ts("2025-10-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_all_formats_failing_leaves_record_untouched() {
        let tmp = TempDir::new().unwrap();
        let config = scenario_config(tmp.path(), vec![ExportFormat::Html, ExportFormat::Json]);
        let mut exporter = FakeExporter::new(scenario_channels());
        exporter.failing.insert(("100".into(), ExportFormat::Html));
        exporter.failing.insert(("100".into(), ExportFormat::Json));

        let mut state = SyncState::default();
        state.record_channel("srv", "general", ts("2025-10-01T00:00:00Z"), None);
        let before = state.channel("srv", "general").cloned();

        let scheduler = SyncScheduler::new(&config, &exporter);
        let (state, summary) = scheduler.run(state).await;

        assert_eq!(state.channel("srv", "general").cloned(), before);
        assert_eq!(summary.units_failed, 1);
        assert_eq!(summary.units_updated, 1);
        assert_eq!(summary.errors.len(), 2);
        assert_eq!(summary.errors[0].unit, "general");
        assert_eq!(summary.errors[0].format, "html");
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_advance() {
        let tmp = TempDir::new().unwrap();
        let config = scenario_config(tmp.path(), vec![ExportFormat::Html, ExportFormat::Json]);
        let mut exporter = FakeExporter::new(scenario_channels());
        exporter.failing.insert(("300".into(), ExportFormat::Html));

        let scheduler = SyncScheduler::new(&config, &exporter);
        let (state, summary) = scheduler.run(SyncState::default()).await;

        assert!(state.thread("srv", "questions", "300").is_none());
        assert!(state.channel("srv", "general").is_some());
        assert_eq!(summary.units_failed, 1);
        assert_eq!(summary.total_format_exports, 3);
        assert_eq!(summary.errors[0].unit, "questions/How do I start?");
    }

    #[tokio::test]
    async fn test_unconfigured_forum_is_benign() {
        let tmp = TempDir::new().unwrap();
        let config = scenario_config(tmp.path(), vec![ExportFormat::Html, ExportFormat::Json]);
        let mut exporter = FakeExporter::new(vec![DiscoveredChannel::new("500", "showcase")]);
        exporter.forums.insert("500".into());

        let scheduler = SyncScheduler::new(&config, &exporter);
        let (state, summary) = scheduler.run(SyncState::default()).await;

        assert!(tmp.path().join("exports/srv/showcase").is_dir());
        assert_eq!(exporter.calls().len(), 1);
        assert!(summary.errors.is_empty());
        assert_eq!(summary.units_failed, 0);
        assert_eq!(summary.units_updated, 0);
        assert_eq!(state.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_listing_failure_is_isolated() {
        let tmp = TempDir::new().unwrap();
        let config = scenario_config(tmp.path(), vec![ExportFormat::Json]);
        let mut exporter = FakeExporter::new(scenario_channels());
        exporter.list_error = true;

        let scheduler = SyncScheduler::new(&config, &exporter);
        let (state, summary) = scheduler.run(SyncState::default()).await;

        assert_eq!(state, SyncState::default());
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].unit, "srv");
    }

    #[tokio::test]
    async fn test_run_sync_persists_state() {
        let tmp = TempDir::new().unwrap();
        let config = scenario_config(tmp.path(), vec![ExportFormat::Json]);
        let exporter = FakeExporter::new(scenario_channels());

        let summary = run_sync(&config, &exporter).await.unwrap();
        assert_eq!(summary.units_updated, 2);

        let saved = StateStore::new(&config.paths.state_file).load().await.unwrap();
        assert_eq!(saved.entry_count(), 2);
    }
}
