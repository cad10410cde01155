// src/pipeline/organize.rs

//! Move raw captures into the dated public layout.
//!
//! ```text
//! exports/<server>/<channel>.<ext>               -> public/<server>/<channel>/<period>/<period>.<ext>
//! exports/<server>/<group>/<thread>.<ext>        -> public/<server>/<group>/<thread>/<period>/<period>.<ext>
//! public/<server>/[<group>/]<unit>/latest.<ext>  -> <period>/<period>.<ext>
//! ```
//!
//! Only the current period's file and the `latest` pointers are written, so
//! earlier periods stay byte-identical.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, ExportFormat, OrganizeStats};
use crate::utils::fs::{copy_dir_all, point_latest, remove_if_exists, sorted_subdirs};
use crate::utils::report;

const MEDIA_SUFFIX: &str = "_media";

/// Raw files of one directory level, grouped by unit.
#[derive(Debug, Default)]
struct RawUnits {
    units: BTreeMap<String, Vec<(ExportFormat, PathBuf)>>,
}

impl RawUnits {
    fn collect(dir: &Path, stats: &mut OrganizeStats) -> Result<Self> {
        let mut raw = Self::default();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            match ExportFormat::from_extension(ext) {
                Some(format) => raw
                    .units
                    .entry(stem.to_string())
                    .or_default()
                    .push((format, path.clone())),
                None => {
                    log::warn!("Skipping unsupported file: {}", path.display());
                    stats.errors.push(format!("unsupported file {}", path.display()));
                }
            }
        }
        for files in raw.units.values_mut() {
            files.sort();
        }
        Ok(raw)
    }

    fn is_media_dir(&self, name: &str) -> bool {
        name.strip_suffix(MEDIA_SUFFIX)
            .is_some_and(|stem| self.units.contains_key(stem))
    }
}

/// Copy every raw capture under `exports_dir` into `public_dir` for `period`.
pub fn organize_exports(
    exports_dir: &Path,
    public_dir: &Path,
    period: &str,
    cleanup: bool,
) -> OrganizeStats {
    let mut stats = OrganizeStats::default();

    // The public root exists even when nothing was captured.
    if let Err(e) = fs::create_dir_all(public_dir) {
        stats.errors.push(format!("{}: {e}", public_dir.display()));
        return stats;
    }

    if !exports_dir.is_dir() {
        log::warn!("No exports found at {}", exports_dir.display());
        return stats;
    }

    let servers = match sorted_subdirs(exports_dir) {
        Ok(servers) => servers,
        Err(e) => {
            stats.errors.push(format!("{}: {e}", exports_dir.display()));
            return stats;
        }
    };

    for server_dir in servers {
        let Some(server) = dir_name(&server_dir) else {
            continue;
        };
        log::info!("Organizing server: {server}");
        let target = public_dir.join(&server);
        if let Err(e) = organize_server(&server_dir, &target, period, cleanup, &mut stats) {
            log::error!("Failed to organize {server}: {e}");
            stats.errors.push(format!("{server}: {e}"));
        }
    }

    stats
}

fn organize_server(
    server_dir: &Path,
    target: &Path,
    period: &str,
    cleanup: bool,
    stats: &mut OrganizeStats,
) -> Result<()> {
    let channels = RawUnits::collect(server_dir, stats)?;
    organize_level(server_dir, target, &channels, period, cleanup, stats);

    for sub in sorted_subdirs(server_dir)? {
        let Some(name) = dir_name(&sub) else {
            continue;
        };
        if channels.is_media_dir(&name) {
            continue;
        }

        // Group directory: created even when no thread has been captured yet.
        let group_target = target.join(&name);
        fs::create_dir_all(&group_target)?;
        let threads = RawUnits::collect(&sub, stats)?;
        organize_level(&sub, &group_target, &threads, period, cleanup, stats);
    }
    Ok(())
}

fn organize_level(
    raw_dir: &Path,
    target: &Path,
    raw: &RawUnits,
    period: &str,
    cleanup: bool,
    stats: &mut OrganizeStats,
) {
    for (unit, files) in &raw.units {
        let unit_dir = target.join(unit);
        let period_dir = unit_dir.join(period);
        if let Err(e) = fs::create_dir_all(&period_dir) {
            stats.errors.push(format!("{}: {e}", period_dir.display()));
            continue;
        }

        let mut organized = 0;
        for (format, source) in files {
            match place_file(source, &unit_dir, period, *format) {
                Ok(()) => {
                    organized += 1;
                    if cleanup {
                        if let Err(e) = remove_if_exists(source) {
                            log::warn!("Cannot remove {}: {e}", source.display());
                        }
                    }
                }
                Err(e) => {
                    log::error!("Failed to organize {}: {e}", source.display());
                    stats.errors.push(format!("{}: {e}", source.display()));
                }
            }
        }

        let media = raw_dir.join(format!("{unit}{MEDIA_SUFFIX}"));
        if media.is_dir() {
            match copy_dir_all(&media, &period_dir.join(format!("{unit}{MEDIA_SUFFIX}"))) {
                Ok(count) => {
                    log::debug!("Copied {count} media files for {unit}");
                    if cleanup {
                        if let Err(e) = remove_if_exists(&media) {
                            log::warn!("Cannot remove {}: {e}", media.display());
                        }
                    }
                }
                Err(e) => stats.errors.push(format!("{}: {e}", media.display())),
            }
        }

        if organized > 0 {
            report::sub_item(&format!("{unit}: {organized} files -> {period}"));
            stats.files_organized += organized;
            stats.units_processed += 1;
        }
    }
}

/// Copy one raw file to `<unit>/<period>/<period>.<ext>` and repoint `latest.<ext>`.
fn place_file(source: &Path, unit_dir: &Path, period: &str, format: ExportFormat) -> std::io::Result<()> {
    let ext = format.extension();
    let file_name = format!("{period}.{ext}");
    fs::copy(source, unit_dir.join(period).join(&file_name))?;
    point_latest(
        &unit_dir.join(format!("latest.{ext}")),
        &Path::new(period).join(&file_name),
    )
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
}

/// Organize raw captures for the current period.
pub fn run_organize(config: &Config, cleanup: bool) -> Result<OrganizeStats> {
    report::header("Organizing exports");

    let period = config.export.partition.label(Utc::now());
    log::info!("Current period: {period}");

    let stats = organize_exports(
        &config.paths.exports_dir,
        &config.paths.public_dir,
        &period,
        cleanup,
    );

    report::summary(
        "Organize",
        &[
            ("Files organized", stats.files_organized.to_string()),
            ("Units processed", stats.units_processed.to_string()),
            ("Errors", stats.errors.len().to_string()),
        ],
    );
    Ok(stats)
}
