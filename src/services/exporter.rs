// src/services/exporter.rs

//! Client for the external capture tool.
//!
//! The tool is a black-box subprocess with two subcommands: `channels` lists a
//! server's channels (and threads), `export` writes one channel to one file in
//! one format. Every invocation is bounded by a timeout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::{CaptureConfig, DiscoveredChannel, ExportConfig, ExportFormat};

/// Output fragment the tool prints when asked to export a forum container.
const GROUP_CONTAINER_MARKER: &str = "cannot be exported directly";

/// Parameters of a single capture invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub channel_id: String,
    pub output_path: PathBuf,
    pub format: ExportFormat,
    /// Only capture content after this instant; `None` requests full history
    pub after: Option<DateTime<Utc>>,
    /// Directory for mirrored attachments, when enabled
    pub media_dir: Option<PathBuf>,
}

/// What happened to one capture invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The tool wrote the requested file
    Exported,
    /// The channel turned out to be a forum container
    GroupContainer,
    /// Non-zero exit, spawn failure or timeout
    Failed(String),
}

/// Seam between the scheduler and the capture tool.
#[async_trait]
pub trait ChannelExporter: Send + Sync {
    /// List every channel of a server, threads included.
    async fn list_channels(&self, guild_id: &str) -> Result<Vec<DiscoveredChannel>>;

    /// Run one capture.
    async fn export(&self, request: &ExportRequest) -> ExportOutcome;
}

/// Capture tool driven as a subprocess.
pub struct CliExporter {
    command: PathBuf,
    token: String,
    include_threads: bool,
    reuse_media: bool,
    export_timeout: Duration,
    list_timeout: Duration,
}

impl CliExporter {
    pub fn new(capture: &CaptureConfig, export: &ExportConfig, token: impl Into<String>) -> Self {
        Self {
            command: PathBuf::from(&capture.command),
            token: token.into(),
            include_threads: export.include_threads,
            reuse_media: export.reuse_media,
            export_timeout: Duration::from_secs(export.timeout_secs),
            list_timeout: Duration::from_secs(capture.list_timeout_secs),
        }
    }

    /// Run the tool, returning (success, combined output).
    async fn run(&self, args: &[String], limit: Duration) -> (bool, String) {
        log::debug!(
            "Running {} {}",
            self.command.display(),
            redact(args, &self.token).join(" ")
        );

        let mut command = Command::new(&self.command);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(limit, command.output()).await {
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                (output.status.success(), text)
            }
            Ok(Err(e)) => (false, format!("Export failed: {e}")),
            Err(_) => (
                false,
                format!("Export timed out after {} seconds", limit.as_secs()),
            ),
        }
    }
}

#[async_trait]
impl ChannelExporter for CliExporter {
    async fn list_channels(&self, guild_id: &str) -> Result<Vec<DiscoveredChannel>> {
        let mut args = vec![
            "channels".to_string(),
            "-t".to_string(),
            self.token.clone(),
            "-g".to_string(),
            guild_id.to_string(),
        ];
        if self.include_threads {
            args.extend(["--include-threads".to_string(), "All".to_string()]);
        }

        let (success, output) = self.run(&args, self.list_timeout).await;
        if !success {
            return Err(AppError::capture(
                format!("guild {guild_id}"),
                format!("failed to fetch channels: {}", output.trim()),
            ));
        }
        Ok(parse_channel_listing(&output))
    }

    async fn export(&self, request: &ExportRequest) -> ExportOutcome {
        let args = match build_export_args(&self.token, request, self.reuse_media) {
            Ok(args) => args,
            Err(e) => return ExportOutcome::Failed(e.to_string()),
        };

        let (success, output) = self.run(&args, self.export_timeout).await;
        classify_output(success, output)
    }
}

fn classify_output(success: bool, output: String) -> ExportOutcome {
    if success {
        ExportOutcome::Exported
    } else if output.contains(GROUP_CONTAINER_MARKER) {
        ExportOutcome::GroupContainer
    } else {
        ExportOutcome::Failed(output.trim().to_string())
    }
}

/// Build the argument vector of an `export` invocation.
pub fn build_export_args(
    token: &str,
    request: &ExportRequest,
    reuse_media: bool,
) -> Result<Vec<String>> {
    if request.channel_id.is_empty() || !request.channel_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation(format!(
            "Invalid channel id '{}': must be numeric",
            request.channel_id
        )));
    }

    let mut args = vec![
        "export".to_string(),
        "-t".to_string(),
        token.to_string(),
        "-c".to_string(),
        request.channel_id.clone(),
        "-f".to_string(),
        request.format.tool_name().to_string(),
        "-o".to_string(),
        path_arg(&request.output_path),
    ];

    if let Some(after) = request.after {
        args.push("--after".to_string());
        args.push(after.to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    if let Some(media_dir) = &request.media_dir {
        args.push("--media".to_string());
        args.push("--media-dir".to_string());
        args.push(path_arg(media_dir));
        if reuse_media {
            args.push("--reuse-media".to_string());
        }
    }

    Ok(args)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn redact(args: &[String], token: &str) -> Vec<String> {
    args.iter()
        .map(|a| {
            if !token.is_empty() && a == token {
                "***".to_string()
            } else {
                a.clone()
            }
        })
        .collect()
}

/// Parse the `channels` listing.
///
/// Lines look like `ID | Name` or `ID | Category / Name` (the category prefix
/// is dropped); threads are indented with `* ` and belong to the most recent
/// non-thread channel above them.
pub fn parse_channel_listing(output: &str) -> Vec<DiscoveredChannel> {
    let mut channels = Vec::new();
    let mut current_parent: Option<String> = None;

    for raw in output.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let is_thread = trimmed.starts_with("* ");
        let line = trimmed.trim_start_matches(['*', ' ']);

        let mut parts = line.split('|').map(str::trim);
        let (Some(id), Some(name_part)) = (parts.next(), parts.next()) else {
            continue;
        };
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let name = match name_part.split_once('/') {
            Some((_, rest)) => rest.trim().to_string(),
            None => name_part.to_string(),
        };
        if name.is_empty() {
            continue;
        }

        if is_thread {
            let Some(parent) = current_parent.clone() else {
                log::warn!("Thread {name} ({id}) listed before any channel, skipping");
                continue;
            };
            channels.push(DiscoveredChannel {
                id: id.to_string(),
                name,
                parent: Some(parent),
            });
        } else {
            current_parent = Some(name.clone());
            channels.push(DiscoveredChannel {
                id: id.to_string(),
                name,
                parent: None,
            });
        }
    }

    channels
}
