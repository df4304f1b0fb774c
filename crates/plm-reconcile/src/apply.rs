use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::commit::{atomic_replace, snapshot};
use crate::engine::reconcile;
use crate::error::LimitsError;
use crate::types::{ChangeRequest, ReconcileAction};

pub struct ApplyArgs<'a> {
    pub dest: &'a Path,
    pub request: &'a ChangeRequest,
    /// Snapshot the target before it is rewritten.
    pub backup: bool,
    /// Reconcile and report only; no backup, no write.
    pub check_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    pub dest: PathBuf,
    pub changed: bool,
    /// Final text of the affected record.
    #[serde(rename = "msg")]
    pub resulting_line: String,
    pub action: ReconcileAction,
    #[serde(rename = "backup_file", skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// A backup was requested but not taken because nothing was written.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub backup_skipped: bool,
    pub check_mode: bool,
    /// `true` when the target was actually replaced.
    pub written: bool,
    pub content_sha256_before: String,
    pub content_sha256_after: String,
}

/// Preconditions: the target is a regular file we can open for writing.
/// Opening in append mode checks access without touching the bytes.
fn check_target(dest: &Path) -> Result<(), LimitsError> {
    match fs::metadata(dest) {
        Ok(md) if md.is_file() => {}
        _ => return Err(LimitsError::TargetMissing(dest.to_path_buf())),
    }
    OpenOptions::new()
        .append(true)
        .open(dest)
        .map_err(|source| LimitsError::TargetNotWritable {
            path: dest.to_path_buf(),
            source,
        })?;
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Reconcile one directive in `dest`.
///
/// Order of effects:
/// 1. request + target preconditions (nothing read yet)
/// 2. read and reconcile in memory (parse errors stop here)
/// 3. backup, if requested and the content will change
/// 4. side file + atomic rename
///
/// The file is handled as bytes; lines that are not rewritten come back
/// unchanged whatever their encoding. Identical output is not rewritten
/// and not backed up (`backup_skipped`). Check mode stops after step 2.
pub fn apply(args: ApplyArgs<'_>) -> Result<ApplyOutcome, LimitsError> {
    let ApplyArgs {
        dest,
        request,
        backup,
        check_mode,
    } = args;

    request.validate()?;
    check_target(dest)?;

    let before = fs::read(dest).map_err(|source| LimitsError::Read {
        path: dest.to_path_buf(),
        source,
    })?;

    let rec = reconcile(&before, request)?;
    let needs_write = rec.content != before;
    debug!(
        dest = %dest.display(),
        key = %request.key,
        changed = rec.changed,
        needs_write,
        check_mode,
        "reconciled"
    );

    let mut backup_path = None;
    let mut written = false;
    if needs_write && !check_mode {
        if backup {
            backup_path = Some(snapshot(dest)?);
        }
        atomic_replace(dest, &rec.content)?;
        written = true;
    }
    let backup_skipped = backup && backup_path.is_none();
    if backup_skipped {
        debug!(dest = %dest.display(), check_mode, "backup skipped; target not rewritten");
    }

    info!(
        dest = %dest.display(),
        key = %request.key,
        changed = rec.changed,
        written,
        "directive applied"
    );

    Ok(ApplyOutcome {
        dest: dest.to_path_buf(),
        changed: rec.changed,
        resulting_line: rec.resulting_line,
        action: rec.action,
        backup_path,
        backup_skipped,
        check_mode,
        written,
        content_sha256_before: sha256_hex(&before),
        content_sha256_after: sha256_hex(&rec.content),
    })
}
