use anyhow::{Context, Result};
use plm_reconcile::{
    ChangeRequest, LimitItem, LimitKey, LimitType, LimitsError, MergePolicy, DEFAULT_LIMITS_CONF,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_dest() -> PathBuf {
    PathBuf::from(DEFAULT_LIMITS_CONF)
}

/// Typed view of a merged manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsManifest {
    #[serde(default = "default_dest")]
    pub dest: PathBuf,
    #[serde(default)]
    pub backup: bool,
    #[serde(default)]
    pub limits: Vec<LimitEntry>,
}

/// One directive. `limit_type: "-"` must be quoted in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitEntry {
    pub domain: String,
    pub limit_type: LimitType,
    pub limit_item: LimitItem,
    pub value: i64,
    #[serde(default)]
    pub use_min: bool,
    #[serde(default)]
    pub use_max: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

impl LimitEntry {
    pub fn to_request(&self) -> Result<ChangeRequest, LimitsError> {
        let policy = MergePolicy::from_flags(self.use_min, self.use_max)?;
        let mut request = ChangeRequest::new(
            LimitKey::new(self.domain.clone(), self.limit_type, self.limit_item),
            self.value,
        )
        .with_policy(policy);
        if let Some(c) = &self.comment {
            request = request.with_comment(c.clone());
        }
        request.validate()?;
        Ok(request)
    }
}

impl LimitsManifest {
    /// All entries as validated requests, in manifest order. The first bad
    /// entry fails the whole manifest so nothing is applied half-way.
    pub fn requests(&self) -> Result<Vec<ChangeRequest>> {
        self.limits
            .iter()
            .enumerate()
            .map(|(i, e)| {
                e.to_request()
                    .with_context(|| format!("limits[{i}] ({} {} {})", e.domain, e.limit_type, e.limit_item))
            })
            .collect()
    }
}
