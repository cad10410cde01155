//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ExportFormat;
use crate::services::ChannelFilter;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Static site metadata used by the navigation pages
    #[serde(default)]
    pub site: SiteConfig,

    /// Export formats and partitioning
    #[serde(default)]
    pub export: ExportConfig,

    /// External capture tool settings
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Working directories and the state file
    #[serde(default)]
    pub paths: PathsConfig,

    /// Log verbosity
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Servers to archive, keyed by their directory name
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(AppError::validation("No servers defined"));
        }
        if self.export.formats.is_empty() {
            return Err(AppError::validation("export.formats is empty"));
        }
        if self.export.timeout_secs == 0 {
            return Err(AppError::validation("export.timeout_secs must be > 0"));
        }
        if self.capture.list_timeout_secs == 0 {
            return Err(AppError::validation(
                "capture.list_timeout_secs must be > 0",
            ));
        }
        if self.capture.command.trim().is_empty() {
            return Err(AppError::validation("capture.command is empty"));
        }
        for (key, server) in &self.servers {
            if server.guild_id.is_empty() || !server.guild_id.chars().all(|c| c.is_ascii_digit()) {
                return Err(AppError::validation(format!(
                    "servers.{key}.guild_id must be numeric"
                )));
            }
            ChannelFilter::new(&server.include_channels, &server.exclude_channels)?;
        }
        Ok(())
    }

    /// Display name for a server directory, falling back to a title-cased key.
    pub fn server_display_name(&self, key: &str) -> String {
        match self.servers.get(key) {
            Some(server) if !server.name.trim().is_empty() => server.name.clone(),
            _ => title_case(key),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            export: ExportConfig::default(),
            capture: CaptureConfig::default(),
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
            servers: BTreeMap::new(),
        }
    }
}

/// Static site metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "defaults::site_title")]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Public URL of the site; its host name is written to `CNAME`
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: defaults::site_title(),
            description: String::new(),
            base_url: None,
        }
    }
}

/// How captured content is partitioned into archive entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    #[default]
    Monthly,
    Yearly,
}

impl Partition {
    /// Period label for the given instant (`YYYY-MM` or `YYYY`).
    pub fn label(&self, at: chrono::DateTime<chrono::Utc>) -> String {
        match self {
            Partition::Monthly => at.format("%Y-%m").to_string(),
            Partition::Yearly => at.format("%Y").to_string(),
        }
    }
}

/// Export behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Formats requested from the capture tool, one invocation each
    #[serde(default = "defaults::formats")]
    pub formats: Vec<ExportFormat>,

    #[serde(default)]
    pub partition: Partition,

    /// Mirror attachments locally next to each export
    #[serde(default)]
    pub download_media: bool,

    /// Skip media that was already downloaded
    #[serde(default)]
    pub reuse_media: bool,

    /// Ask the capture tool to list threads as well as channels
    #[serde(default = "defaults::include_threads")]
    pub include_threads: bool,

    /// Upper bound for one capture invocation in seconds
    #[serde(default = "defaults::export_timeout")]
    pub timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            formats: defaults::formats(),
            partition: Partition::default(),
            download_media: false,
            reuse_media: false,
            include_threads: defaults::include_threads(),
            timeout_secs: defaults::export_timeout(),
        }
    }
}

/// Capture tool location and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "defaults::capture_command")]
    pub command: String,

    /// Environment variable that holds the access token
    #[serde(default = "defaults::token_env")]
    pub token_env: String,

    /// Upper bound for the channel listing call in seconds
    #[serde(default = "defaults::list_timeout")]
    pub list_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            command: defaults::capture_command(),
            token_env: defaults::token_env(),
            list_timeout_secs: defaults::list_timeout(),
        }
    }
}

/// Working directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::exports_dir")]
    pub exports_dir: PathBuf,

    #[serde(default = "defaults::public_dir")]
    pub public_dir: PathBuf,

    #[serde(default = "defaults::state_file")]
    pub state_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            exports_dir: defaults::exports_dir(),
            public_dir: defaults::public_dir(),
            state_file: defaults::state_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// One archived server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Upstream guild identifier (digits only)
    pub guild_id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Channel name globs to archive; `*` selects everything
    #[serde(default = "defaults::include_channels")]
    pub include_channels: Vec<String>,

    /// Channel name globs to skip; evaluated before includes
    #[serde(default)]
    pub exclude_channels: Vec<String>,

    /// Channels known to be forums
    #[serde(default)]
    pub forum_channels: Vec<String>,
}

fn title_case(key: &str) -> String {
    key.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

mod defaults {
    use std::path::PathBuf;

    use crate::models::ExportFormat;

    // Site defaults
    pub fn site_title() -> String {
        "Chat Archive".into()
    }

    // Export defaults
    pub fn formats() -> Vec<ExportFormat> {
        vec![
            ExportFormat::Html,
            ExportFormat::Txt,
            ExportFormat::Json,
            ExportFormat::Csv,
        ]
    }
    pub fn include_threads() -> bool {
        true
    }
    pub fn export_timeout() -> u64 {
        300
    }

    // Capture defaults
    pub fn capture_command() -> String {
        "bin/discord-exporter/DiscordChatExporter.Cli".into()
    }
    pub fn token_env() -> String {
        "DISCORD_BOT_TOKEN".into()
    }
    pub fn list_timeout() -> u64 {
        30
    }

    // Path defaults
    pub fn exports_dir() -> PathBuf {
        PathBuf::from("exports")
    }
    pub fn public_dir() -> PathBuf {
        PathBuf::from("public")
    }
    pub fn state_file() -> PathBuf {
        PathBuf::from("state.json")
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn include_channels() -> Vec<String> {
        vec!["*".into()]
    }
}
