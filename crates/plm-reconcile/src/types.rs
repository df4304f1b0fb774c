use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LimitsError;

/// Marker line kept as the last line of a limits file.
pub const END_OF_FILE_MARKER: &str = "# End of file";

/// Default location of the PAM limits file.
pub const DEFAULT_LIMITS_CONF: &str = "/etc/security/limits.conf";

/// Severity class of a limit directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LimitType {
    #[serde(rename = "soft")]
    Soft,
    #[serde(rename = "hard")]
    Hard,
    /// `-`: applies to both soft and hard.
    #[serde(rename = "-")]
    Both,
}

impl LimitType {
    pub const ALL: [LimitType; 3] = [LimitType::Soft, LimitType::Hard, LimitType::Both];

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitType::Soft => "soft",
            LimitType::Hard => "hard",
            LimitType::Both => "-",
        }
    }
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitType {
    type Err = LimitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LimitType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| LimitsError::UnknownLimitType(s.to_string()))
    }
}

/// Resource bounded by a limit directive (see limits.conf(5)).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitItem {
    Core,
    Data,
    Fsize,
    Memlock,
    Nofile,
    Rss,
    Stack,
    Cpu,
    Nproc,
    As,
    Maxlogins,
    Maxsyslogins,
    Priority,
    Locks,
    Sigpending,
    Msgqueue,
    Nice,
    Rtprio,
    Chroot,
}

impl LimitItem {
    pub const ALL: [LimitItem; 19] = [
        LimitItem::Core,
        LimitItem::Data,
        LimitItem::Fsize,
        LimitItem::Memlock,
        LimitItem::Nofile,
        LimitItem::Rss,
        LimitItem::Stack,
        LimitItem::Cpu,
        LimitItem::Nproc,
        LimitItem::As,
        LimitItem::Maxlogins,
        LimitItem::Maxsyslogins,
        LimitItem::Priority,
        LimitItem::Locks,
        LimitItem::Sigpending,
        LimitItem::Msgqueue,
        LimitItem::Nice,
        LimitItem::Rtprio,
        LimitItem::Chroot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitItem::Core => "core",
            LimitItem::Data => "data",
            LimitItem::Fsize => "fsize",
            LimitItem::Memlock => "memlock",
            LimitItem::Nofile => "nofile",
            LimitItem::Rss => "rss",
            LimitItem::Stack => "stack",
            LimitItem::Cpu => "cpu",
            LimitItem::Nproc => "nproc",
            LimitItem::As => "as",
            LimitItem::Maxlogins => "maxlogins",
            LimitItem::Maxsyslogins => "maxsyslogins",
            LimitItem::Priority => "priority",
            LimitItem::Locks => "locks",
            LimitItem::Sigpending => "sigpending",
            LimitItem::Msgqueue => "msgqueue",
            LimitItem::Nice => "nice",
            LimitItem::Rtprio => "rtprio",
            LimitItem::Chroot => "chroot",
        }
    }
}

impl fmt::Display for LimitItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitItem {
    type Err = LimitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LimitItem::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| LimitsError::UnknownLimitItem(s.to_string()))
    }
}

/// Composite lookup key: (domain, type, item).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LimitKey {
    pub domain: String,
    pub limit_type: LimitType,
    pub limit_item: LimitItem,
}

impl LimitKey {
    pub fn new(domain: impl Into<String>, limit_type: LimitType, limit_item: LimitItem) -> Self {
        Self {
            domain: domain.into(),
            limit_type,
            limit_item,
        }
    }

    /// Text comparison against a record parsed from the file.
    pub fn matches(&self, record: &Record) -> bool {
        record.domain == self.domain
            && record.limit_type == self.limit_type.as_str()
            && record.limit_item == self.limit_item.as_str()
    }
}

impl fmt::Display for LimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.domain, self.limit_type, self.limit_item)
    }
}

/// How an existing value is merged with the desired one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Write the desired value unconditionally.
    #[default]
    Replace,
    /// Keep whichever of existing/desired is smaller.
    KeepMin,
    /// Keep whichever of existing/desired is larger.
    KeepMax,
}

impl MergePolicy {
    /// Map the `use_min` / `use_max` flag pair onto a policy.
    /// Both set is a precondition error.
    pub fn from_flags(use_min: bool, use_max: bool) -> Result<Self, LimitsError> {
        match (use_min, use_max) {
            (true, true) => Err(LimitsError::ConflictingPolicy),
            (true, false) => Ok(MergePolicy::KeepMin),
            (false, true) => Ok(MergePolicy::KeepMax),
            (false, false) => Ok(MergePolicy::Replace),
        }
    }

    pub fn resolve(&self, desired: i64, existing: i64) -> i64 {
        match self {
            MergePolicy::Replace => desired,
            MergePolicy::KeepMin => desired.min(existing),
            MergePolicy::KeepMax => desired.max(existing),
        }
    }
}

/// Desired state for one directive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub key: LimitKey,
    pub value: i64,
    pub policy: MergePolicy,
    /// Replaces the record's trailing comment when non-empty.
    pub comment: Option<String>,
}

impl ChangeRequest {
    pub fn new(key: LimitKey, value: i64) -> Self {
        Self {
            key,
            value,
            policy: MergePolicy::Replace,
            comment: None,
        }
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// The override comment, if one was given and is non-empty.
    pub fn comment_override(&self) -> Option<&str> {
        self.comment.as_deref().filter(|c| !c.is_empty())
    }

    /// Reject requests whose rendered line would not classify back as the
    /// same record.
    pub fn validate(&self) -> Result<(), LimitsError> {
        let d = &self.key.domain;
        // U+FFFD is what undecodable domain bytes in the file read as.
        if d.is_empty()
            || d.contains('#')
            || d.contains(char::REPLACEMENT_CHARACTER)
            || d.chars().any(char::is_whitespace)
        {
            return Err(LimitsError::InvalidDomain(d.clone()));
        }
        if let Some(c) = &self.comment {
            if c.contains('\n') || c.contains('\r') {
                return Err(LimitsError::InvalidComment(c.clone()));
            }
        }
        Ok(())
    }
}

/// A limit directive parsed out of a record line.
///
/// Type and item keep their file spelling; a file may carry values that are
/// not in [`LimitType`] / [`LimitItem`], which simply never match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub domain: String,
    pub limit_type: String,
    pub limit_item: String,
    pub value: i64,
    /// Raw bytes after the first `#`, line terminator removed.
    pub comment: Option<Vec<u8>>,
}

/// Render a record line: tab-separated fields, `\t#<comment>` when present.
pub fn render_record_line(key: &LimitKey, value: i64, comment: Option<&[u8]>) -> Vec<u8> {
    let mut line = format!(
        "{}\t{}\t{}\t{}",
        key.domain, key.limit_type, key.limit_item, value
    )
    .into_bytes();
    if let Some(c) = comment.filter(|c| !c.is_empty()) {
        line.extend_from_slice(b"\t#");
        line.extend_from_slice(c);
    }
    line.push(b'\n');
    line
}

/// What the policy engine did with the target key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileAction {
    /// Existing value already equal to the desired value.
    Unchanged,
    /// Policy kept the existing value (keep-min / keep-max).
    Kept,
    /// Existing line rewritten.
    Updated { previous: i64 },
    /// Key absent; a new line was appended.
    Inserted,
}

/// Result of one pass of the policy engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub content: Vec<u8>,
    pub changed: bool,
    /// Final text of the affected record, terminator stripped. Bytes that
    /// are not UTF-8 show as U+FFFD.
    pub resulting_line: String,
    /// Action on the last matching line (or `Inserted`).
    pub action: ReconcileAction,
    /// Number of record lines that carried the target key.
    pub matches: usize,
    pub had_sentinel: bool,
}
