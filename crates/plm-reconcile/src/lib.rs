//! plm-reconcile
//!
//! Reconciles one PAM limits directive (`domain type item value`) inside a
//! limits.conf-style file:
//! - the record with the same (domain, type, item) key is replaced, kept,
//!   or merged by keep-min / keep-max
//! - an absent key is appended
//! - every other line is copied byte-for-byte
//! - the `# End of file` marker stays last
//!
//! `engine` and `classify` are pure. `commit` and `apply` do the IO.

mod apply;
mod classify;
mod commit;
mod engine;
mod error;
mod types;

pub use apply::{apply, ApplyArgs, ApplyOutcome};
pub use classify::{classify, classify_line, ClassifiedLine, LineKind};
pub use commit::{atomic_replace, backup_path_for, snapshot};
pub use engine::reconcile;
pub use error::LimitsError;
pub use types::*;
