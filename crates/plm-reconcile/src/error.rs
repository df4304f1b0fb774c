use std::fmt;
use std::io;
use std::path::PathBuf;

/// Failures surfaced by [`crate::apply`] and the pure engine.
///
/// Grouped the way callers react to them:
/// - precondition errors: nothing was read or written;
/// - parse errors: the file was read but not touched;
/// - commit errors: the target is untouched unless the error says otherwise.
#[derive(Debug)]
pub enum LimitsError {
    // --- precondition ---
    TargetMissing(PathBuf),
    TargetNotWritable { path: PathBuf, source: io::Error },
    ConflictingPolicy,
    InvalidDomain(String),
    InvalidComment(String),
    UnknownLimitType(String),
    UnknownLimitItem(String),

    // --- parse ---
    /// A 4-field record line whose value is not a base-10 integer.
    InvalidValue { line_no: usize, value: String },

    // --- commit ---
    Read { path: PathBuf, source: io::Error },
    Backup { path: PathBuf, source: io::Error },
    Write { path: PathBuf, source: io::Error },
}

impl LimitsError {
    /// `true` when the request was rejected before the target was read.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            LimitsError::TargetMissing(_)
                | LimitsError::TargetNotWritable { .. }
                | LimitsError::ConflictingPolicy
                | LimitsError::InvalidDomain(_)
                | LimitsError::InvalidComment(_)
                | LimitsError::UnknownLimitType(_)
                | LimitsError::UnknownLimitItem(_)
        )
    }
}

impl fmt::Display for LimitsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitsError::TargetMissing(path) => write!(
                f,
                "{} is not visible (check presence, access rights, use sudo)",
                path.display()
            ),
            LimitsError::TargetNotWritable { path, .. } => {
                write!(f, "{} is not writable. Use sudo", path.display())
            }
            LimitsError::ConflictingPolicy => {
                write!(f, "cannot use use_min and use_max at the same time")
            }
            LimitsError::InvalidDomain(d) => write!(
                f,
                "invalid domain {d:?}: must be non-empty without whitespace or '#'"
            ),
            LimitsError::InvalidComment(_) => {
                write!(f, "invalid comment: must be a single line")
            }
            LimitsError::UnknownLimitType(t) => {
                write!(f, "unknown limit type {t:?}. expected one of: soft | hard | -")
            }
            LimitsError::UnknownLimitItem(i) => write!(f, "unknown limit item {i:?}"),
            LimitsError::InvalidValue { line_no, value } => write!(
                f,
                "line {line_no}: limit value {value:?} is not a base-10 integer"
            ),
            LimitsError::Read { path, .. } => write!(f, "failed to read {}", path.display()),
            LimitsError::Backup { path, .. } => {
                write!(f, "failed to write backup {}", path.display())
            }
            LimitsError::Write { path, .. } => {
                write!(f, "failed to replace {}", path.display())
            }
        }
    }
}

impl std::error::Error for LimitsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LimitsError::TargetNotWritable { source, .. }
            | LimitsError::Read { source, .. }
            | LimitsError::Backup { source, .. }
            | LimitsError::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}
