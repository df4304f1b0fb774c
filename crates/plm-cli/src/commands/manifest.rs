//! `plm apply`: every directive of a layered manifest, in order.
//!
//! Each entry is an independent reconcile of the manifest's `dest`, so a
//! later entry sees what earlier ones wrote. In check mode nothing is
//! written and every entry is judged against the file as it is on disk.

use anyhow::{Context, Result};
use plm_config::{report_unused_keys, UnusedKeyPolicy};
use plm_reconcile::ApplyArgs;
use tracing::info;

use super::print_outcome;

pub fn run_apply(config_paths: Vec<String>, check: bool, json: bool, strict: bool) -> Result<()> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = plm_config::load_layered_yaml(&path_refs)?;

    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    report_unused_keys(&loaded.config_json, policy)?;

    let manifest = loaded.manifest()?;
    // Validate every entry before touching the file.
    let requests = manifest.requests()?;
    info!(
        config_hash = %loaded.config_hash,
        dest = %manifest.dest.display(),
        directives = requests.len(),
        "manifest loaded"
    );

    if !json {
        println!("config_hash={}", loaded.config_hash);
    }

    let mut changed_total = 0usize;
    for (i, request) in requests.iter().enumerate() {
        let outcome = plm_reconcile::apply(ApplyArgs {
            dest: &manifest.dest,
            request,
            backup: manifest.backup,
            check_mode: check,
        })
        .with_context(|| format!("limits[{i}] ({}) failed", request.key))?;

        if outcome.changed {
            changed_total += 1;
        }
        if !json {
            println!("directive={i} key={}", request.key);
        }
        print_outcome(&outcome, json)?;
    }

    if !json {
        println!("changed_total={changed_total}");
    }
    Ok(())
}
