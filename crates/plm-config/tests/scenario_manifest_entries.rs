//! Manifest entries become validated change requests.

use plm_config::load_layered_yaml_from_strings;
use plm_reconcile::{LimitItem, LimitType, LimitsError, MergePolicy, DEFAULT_LIMITS_CONF};
use std::path::PathBuf;

#[test]
fn defaults_apply_when_keys_are_absent() {
    let loaded = load_layered_yaml_from_strings(&["{}"]).unwrap();
    let m = loaded.manifest().unwrap();
    assert_eq!(m.dest, PathBuf::from(DEFAULT_LIMITS_CONF));
    assert!(!m.backup);
    assert!(m.limits.is_empty());
    assert!(m.requests().unwrap().is_empty());
}

#[test]
fn entries_map_to_requests_in_order() {
    let yaml = r#"
limits:
  - domain: joe
    limit_type: soft
    limit_item: nofile
    value: 64000
    use_max: true
  - domain: "@dev"
    limit_type: "-"
    limit_item: as
    value: -1
    use_min: true
    comment: " unlimited address space"
  - domain: "1000:"
    limit_type: hard
    limit_item: maxlogins
    value: 4
"#;
    let m = load_layered_yaml_from_strings(&[yaml]).unwrap().manifest().unwrap();
    let reqs = m.requests().unwrap();

    assert_eq!(reqs.len(), 3);
    assert_eq!(reqs[0].policy, MergePolicy::KeepMax);
    assert_eq!(reqs[0].key.limit_item, LimitItem::Nofile);

    assert_eq!(reqs[1].key.limit_type, LimitType::Both);
    assert_eq!(reqs[1].key.limit_item, LimitItem::As);
    assert_eq!(reqs[1].policy, MergePolicy::KeepMin);
    assert_eq!(reqs[1].value, -1);
    assert_eq!(reqs[1].comment_override(), Some(" unlimited address space"));

    assert_eq!(reqs[2].key.domain, "1000:");
    assert_eq!(reqs[2].policy, MergePolicy::Replace);
}

#[test]
fn both_policy_flags_fail_the_manifest() {
    let yaml = r#"
limits:
  - domain: joe
    limit_type: soft
    limit_item: nofile
    value: 1
    use_min: true
    use_max: true
"#;
    let m = load_layered_yaml_from_strings(&[yaml]).unwrap().manifest().unwrap();
    let err = m.requests().unwrap_err();

    assert!(format!("{err:#}").contains("limits[0]"), "{err:#}");
    assert!(matches!(
        err.downcast_ref::<LimitsError>(),
        Some(LimitsError::ConflictingPolicy)
    ));
}

#[test]
fn unknown_item_or_entry_key_is_rejected() {
    let bad_item = r#"
limits:
  - domain: joe
    limit_type: soft
    limit_item: files
    value: 1
"#;
    assert!(load_layered_yaml_from_strings(&[bad_item]).unwrap().manifest().is_err());

    let bad_key = r#"
limits:
  - domain: joe
    limit_type: soft
    limit_item: nofile
    value: 1
    use_maximum: true
"#;
    assert!(load_layered_yaml_from_strings(&[bad_key]).unwrap().manifest().is_err());
}

#[test]
fn domain_with_whitespace_is_rejected() {
    let yaml = r#"
limits:
  - domain: "joe smith"
    limit_type: soft
    limit_item: nofile
    value: 1
"#;
    let m = load_layered_yaml_from_strings(&[yaml]).unwrap().manifest().unwrap();
    let err = m.requests().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LimitsError>(),
        Some(LimitsError::InvalidDomain(_))
    ));
}
