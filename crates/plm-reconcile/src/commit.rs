//! Output commit: optional snapshot of the target, then side file + rename.
//!
//! The target is never opened for writing. Content goes to a uniquely named
//! file next to it which is renamed over the target as the last step, so a
//! failure anywhere before that leaves the original bytes in place.

use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::LimitsError;

/// `<target>.<pid>.<YYYY-MM-DD@HH:MM:SS>~`
pub fn backup_path_for(target: &Path, pid: u32, at: DateTime<Utc>) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(format!(".{}.{}~", pid, at.format("%Y-%m-%d@%H:%M:%S")));
    PathBuf::from(name)
}

/// Copy the target to a timestamped sibling. Never overwrites an existing
/// backup: a name that is already taken, even by a file created a moment
/// ago, gets a numeric suffix.
pub fn snapshot(target: &Path) -> Result<PathBuf, LimitsError> {
    let base = backup_path_for(target, std::process::id(), Utc::now());
    let backup_err = |path: &Path, source| LimitsError::Backup {
        path: path.to_path_buf(),
        source,
    };

    let mut path = base.clone();
    let mut n = 1;
    let mut backup = loop {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => break file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let mut name = base.as_os_str().to_owned();
                name.push(format!("{n}"));
                path = PathBuf::from(name);
                n += 1;
            }
            Err(e) => return Err(backup_err(&path, e)),
        }
    };

    let copied = File::open(target)
        .and_then(|mut src| {
            let bytes = io::copy(&mut src, &mut backup)?;
            backup.sync_all()?;
            fs::set_permissions(&path, src.metadata()?.permissions())?;
            Ok(bytes)
        })
        .map_err(|e| {
            // Drop the partial copy; the name is ours.
            let _ = fs::remove_file(&path);
            backup_err(&path, e)
        })?;

    info!(path = %target.display(), backup = %path.display(), bytes = copied, "backup written");
    Ok(path)
}

/// Replace `target` with `content` in one rename, keeping its permission bits.
pub fn atomic_replace(target: &Path, content: &[u8]) -> Result<(), LimitsError> {
    let write_err = |source| LimitsError::Write {
        path: target.to_path_buf(),
        source,
    };

    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "limits".to_string());

    let permissions = fs::metadata(target).map_err(write_err)?.permissions();

    // Removed on drop if we bail before persist.
    let mut side = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;

    side.write_all(content).map_err(write_err)?;
    side.as_file().sync_all().map_err(write_err)?;
    fs::set_permissions(side.path(), permissions).map_err(write_err)?;

    side.persist(target).map_err(|e| write_err(e.error))?;
    info!(path = %target.display(), bytes = content.len(), "limits file replaced");
    Ok(())
}
