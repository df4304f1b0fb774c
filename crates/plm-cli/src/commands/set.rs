//! `plm set`: reconcile a single directive given on the command line.

use anyhow::{Context, Result};
use plm_reconcile::{ApplyArgs, ChangeRequest, LimitItem, LimitKey, LimitType, MergePolicy};
use std::path::PathBuf;

use super::print_outcome;

pub struct SetArgs {
    pub domain: String,
    pub limit_type: LimitType,
    pub limit_item: LimitItem,
    pub value: i64,
    pub use_min: bool,
    pub use_max: bool,
    pub comment: Option<String>,
    pub backup: bool,
    pub dest: PathBuf,
    pub check: bool,
    pub json: bool,
}

pub fn run_set(args: SetArgs) -> Result<()> {
    // clap already rejects --use-min with --use-max; library callers rely on this check.
    let policy = MergePolicy::from_flags(args.use_min, args.use_max)?;

    let mut request = ChangeRequest::new(
        LimitKey::new(args.domain, args.limit_type, args.limit_item),
        args.value,
    )
    .with_policy(policy);
    if let Some(c) = args.comment {
        request = request.with_comment(c);
    }

    let outcome = plm_reconcile::apply(ApplyArgs {
        dest: &args.dest,
        request: &request,
        backup: args.backup,
        check_mode: args.check,
    })
    .with_context(|| format!("set {} failed", request.key))?;

    print_outcome(&outcome, args.json)
}
