// src/utils/fs.rs

//! Filesystem helpers shared by the organizer and navigation builder.

use std::fs;
use std::io;
use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Write bytes atomically (write to temp, then rename).
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Whether `name` is a period directory label (`YYYY-MM` or `YYYY`).
pub fn is_period_label(name: &str) -> bool {
    let bytes = name.as_bytes();
    let year_ok = |b: &[u8]| b.len() == 4 && b.iter().all(u8::is_ascii_digit);
    match bytes.len() {
        4 => year_ok(bytes),
        7 => {
            year_ok(&bytes[..4])
                && bytes[4] == b'-'
                && bytes[5..].iter().all(u8::is_ascii_digit)
                && matches!(&name[5..], "01" | "02" | "03" | "04" | "05" | "06" | "07" | "08" | "09" | "10" | "11" | "12")
        }
        _ => false,
    }
}

/// Remove a file or (possibly dangling) symlink if present.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Point `link` at `target` (relative to the link's directory).
///
/// Uses a symlink where the platform has one, a byte copy otherwise.
pub fn point_latest(link: &Path, target: &Path) -> io::Result<()> {
    remove_if_exists(link)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(not(unix))]
    {
        let base = link.parent().unwrap_or_else(|| Path::new("."));
        fs::copy(base.join(target), link).map(|_| ())
    }
}

/// Recursively copy a directory tree, overwriting files that already exist.
pub fn copy_dir_all(from: &Path, to: &Path) -> io::Result<usize> {
    fs::create_dir_all(to)?;
    let mut copied = 0;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_dir_all(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), dest)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Sorted directory entries that are themselves directories.
pub fn sorted_subdirs(dir: &Path) -> io::Result<Vec<std::path::PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}
