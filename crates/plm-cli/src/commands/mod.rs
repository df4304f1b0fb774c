//! Command handler modules for plm-cli.
//!
//! Shared result rendering lives here. Command-specific logic lives in the
//! submodules.

pub mod manifest;
pub mod set;

use anyhow::{Context, Result};
use plm_reconcile::{ApplyOutcome, ReconcileAction};

fn action_str(action: &ReconcileAction) -> &'static str {
    match action {
        ReconcileAction::Unchanged => "unchanged",
        ReconcileAction::Kept => "kept",
        ReconcileAction::Updated { .. } => "updated",
        ReconcileAction::Inserted => "inserted",
    }
}

/// One JSON object per line with `--json`, otherwise `key=value` lines.
pub fn print_outcome(outcome: &ApplyOutcome, json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(outcome).context("serialize outcome failed")?;
        println!("{line}");
        return Ok(());
    }

    println!("dest={}", outcome.dest.display());
    println!("changed={}", outcome.changed);
    println!("action={}", action_str(&outcome.action));
    if let ReconcileAction::Updated { previous } = outcome.action {
        println!("previous_value={previous}");
    }
    println!("msg={}", outcome.resulting_line);
    if let Some(b) = &outcome.backup_path {
        println!("backup_file={}", b.display());
    }
    if outcome.backup_skipped {
        println!("backup_skipped=true");
    }
    if outcome.check_mode {
        println!("check_mode=true");
    }
    println!("written={}", outcome.written);
    Ok(())
}
