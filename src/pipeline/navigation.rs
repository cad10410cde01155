// src/pipeline/navigation.rs

//! Navigation tree derived from the public layout.
//!
//! The tree is built in a single pass over `public/` and then rendered
//! bottom-up: threads, groups, channels, servers and finally the site index.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{ArchiveEntry, Config, ExportFormat, NavigationStats};
use crate::services::{count_messages, extract_thread_metadata};
use crate::utils::fs::{is_period_label, sorted_subdirs};
use crate::utils::{host_of, report};

use super::render;

/// Directory under the public root reserved for static assets.
const ASSETS_DIR: &str = "assets";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNode {
    pub name: String,
    /// Newest first
    pub archives: Vec<ArchiveEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadNode {
    pub slug: String,
    pub title: String,
    pub reply_count: usize,
    /// `YYYY-MM-DD` of the last message, or the newest period label
    pub last_activity: String,
    pub archived: bool,
    pub archives: Vec<ArchiveEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    pub name: String,
    /// Most recent activity first
    pub threads: Vec<ThreadNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNode {
    pub key: String,
    pub display_name: String,
    pub channels: Vec<ChannelNode>,
    pub groups: Vec<GroupNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteNode {
    pub servers: Vec<ServerNode>,
}

/// Latest-pointer formats of a unit: those present in its newest archive.
pub fn latest_formats(archives: &[ArchiveEntry]) -> &[ExportFormat] {
    archives
        .first()
        .map(|a| a.formats.as_slice())
        .unwrap_or_default()
}

impl ChannelNode {
    pub fn last_updated(&self) -> Option<&str> {
        self.archives.first().map(|a| a.date.as_str())
    }

    /// Message count of the newest archive.
    pub fn message_count(&self) -> usize {
        self.archives.first().map_or(0, |a| a.message_count)
    }
}

impl GroupNode {
    pub fn last_updated(&self) -> Option<&str> {
        self.threads
            .iter()
            .filter_map(|t| t.archives.first())
            .map(|a| a.date.as_str())
            .max()
    }
}

impl ServerNode {
    /// Newest period across every unit of the server.
    pub fn last_updated(&self) -> Option<&str> {
        self.channels
            .iter()
            .filter_map(ChannelNode::last_updated)
            .chain(self.groups.iter().filter_map(GroupNode::last_updated))
            .max()
    }

    pub fn thread_count(&self) -> usize {
        self.groups.iter().map(|g| g.threads.len()).sum()
    }
}

impl SiteNode {
    pub fn stats(&self) -> NavigationStats {
        NavigationStats {
            servers: self.servers.len(),
            channels: self.servers.iter().map(|s| s.channels.len()).sum(),
            groups: self.servers.iter().map(|s| s.groups.len()).sum(),
            threads: self.servers.iter().map(ServerNode::thread_count).sum(),
            pages_written: 0,
        }
    }
}

/// Scan `public_dir` into a navigation tree.
pub fn scan_public(public_dir: &Path, config: &Config, now: DateTime<Utc>) -> Result<SiteNode> {
    let mut site = SiteNode::default();

    for server_dir in sorted_subdirs(public_dir)? {
        let key = file_name(&server_dir);
        if key == ASSETS_DIR {
            continue;
        }

        let mut server = ServerNode {
            display_name: config.server_display_name(&key),
            key,
            channels: Vec::new(),
            groups: Vec::new(),
        };

        for dir in sorted_subdirs(&server_dir)? {
            let name = file_name(&dir);
            // A channel holds `<period>/<period>.<ext>` files directly; anything
            // else (including a forum with no threads yet) is a group.
            let archives = scan_archives(&dir)?;
            if !archives.is_empty() {
                server.channels.push(ChannelNode { name, archives });
            } else {
                server.groups.push(scan_group(&dir, name, now)?);
            }
        }

        site.servers.push(server);
    }

    Ok(site)
}

fn scan_group(dir: &Path, name: String, now: DateTime<Utc>) -> Result<GroupNode> {
    let mut threads = Vec::new();
    for thread_dir in sorted_subdirs(dir)? {
        let archives = scan_archives(&thread_dir)?;
        if archives.is_empty() {
            continue;
        }
        threads.push(thread_node(&thread_dir, archives, now));
    }
    // Empty activity strings sort last.
    threads.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
    Ok(GroupNode { name, threads })
}

fn thread_node(dir: &Path, archives: Vec<ArchiveEntry>, now: DateTime<Utc>) -> ThreadNode {
    let slug = file_name(dir);
    let newest = &archives[0];
    let json = dir
        .join(&newest.date)
        .join(format!("{}.json", newest.date));

    let metadata = extract_thread_metadata(&json, now);
    let (title, reply_count, last_activity, archived) = match metadata {
        Some(meta) => (
            meta.title.unwrap_or_else(|| slug.clone()),
            meta.reply_count,
            meta.last_activity.unwrap_or_else(|| newest.date.clone()),
            meta.archived,
        ),
        None => (slug.clone(), 0, newest.date.clone(), false),
    };

    ThreadNode {
        slug,
        title,
        reply_count,
        last_activity,
        archived,
        archives,
    }
}

/// Archive entries of a unit directory, newest first.
pub fn scan_archives(unit_dir: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut archives = Vec::new();
    for period_dir in sorted_subdirs(unit_dir)? {
        let date = file_name(&period_dir);
        if !is_period_label(&date) {
            continue;
        }

        let mut formats: Vec<ExportFormat> = ExportFormat::ALL
            .into_iter()
            .filter(|f| period_dir.join(format!("{date}.{}", f.extension())).is_file())
            .collect();
        if formats.is_empty() {
            continue;
        }
        formats.sort();

        let message_count = count_messages(&period_dir.join(format!("{date}.json")));
        archives.push(ArchiveEntry {
            date,
            formats,
            message_count,
        });
    }
    archives.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(archives)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Writes rendered pages and counts them.
struct PageWriter {
    written: usize,
}

impl PageWriter {
    fn write(&mut self, path: PathBuf, markup: maud::Markup) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, markup.into_string())?;
        log::debug!("Wrote {}", path.display());
        self.written += 1;
        Ok(())
    }
}

/// Render every index page of `site` under `public_dir`.
pub fn write_site(
    public_dir: &Path,
    site: &SiteNode,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<NavigationStats> {
    let mut pages = PageWriter { written: 0 };
    let generated_at = now.format("%Y-%m-%d %H:%M UTC").to_string();

    for server in &site.servers {
        let server_dir = public_dir.join(&server.key);

        for group in &server.groups {
            let group_dir = server_dir.join(&group.name);
            for thread in &group.threads {
                pages.write(
                    group_dir.join(&thread.slug).join("index.html"),
                    render::thread_page(&config.site, server, group, thread),
                )?;
            }
            pages.write(
                group_dir.join("index.html"),
                render::group_page(&config.site, server, group),
            )?;
            report::sub_item(&format!("{}: {} threads", group.name, group.threads.len()));
        }

        for channel in &server.channels {
            pages.write(
                server_dir.join(&channel.name).join("index.html"),
                render::channel_page(&config.site, server, channel),
            )?;
        }

        pages.write(
            server_dir.join("index.html"),
            render::server_page(&config.site, server),
        )?;
        log::info!("Generated index for {}", server.display_name);
    }

    pages.write(
        public_dir.join("index.html"),
        render::site_page(&config.site, site, &generated_at),
    )?;

    if let Some(base_url) = config.site.base_url.as_deref() {
        if let Some(host) = host_of(base_url)? {
            fs::write(public_dir.join("CNAME"), format!("{host}\n"))?;
            log::info!("Generated CNAME file for {host}");
        }
    }

    Ok(NavigationStats {
        pages_written: pages.written,
        ..site.stats()
    })
}

/// Rebuild all navigation pages from the public layout.
pub fn run_navigation(config: &Config) -> Result<NavigationStats> {
    report::header("Generating navigation");

    let public_dir = &config.paths.public_dir;
    if !public_dir.is_dir() {
        return Err(AppError::validation(format!(
            "{} not found, run organize first",
            public_dir.display()
        )));
    }

    let now = Utc::now();
    let site = scan_public(public_dir, config, now)?;
    if site.servers.is_empty() {
        log::warn!("No exports found under {}", public_dir.display());
    }
    let stats = write_site(public_dir, &site, config, now)?;

    report::summary(
        "Navigation",
        &[
            ("Servers", stats.servers.to_string()),
            ("Channels", stats.channels.to_string()),
            ("Forums", stats.groups.to_string()),
            ("Threads", stats.threads.to_string()),
            ("Pages written", stats.pages_written.to_string()),
        ],
    );
    Ok(stats)
}
