//! Everything that is not the target directive is copied byte-for-byte, the
//! end-of-file marker stays last, and absent keys are inserted before it.

use plm_reconcile::*;

fn text(r: &Reconciliation) -> &str {
    std::str::from_utf8(&r.content).expect("utf-8 output")
}

const LIMITS: &str = include_str!("fixtures/limits.conf");

fn key(domain: &str, t: LimitType, i: LimitItem) -> LimitKey {
    LimitKey::new(domain, t, i)
}

fn without_line<'a>(content: &'a str, needle: &str) -> Vec<&'a str> {
    content
        .split_inclusive('\n')
        .filter(|l| !l.starts_with(needle))
        .collect()
}

#[test]
fn non_matching_lines_are_byte_identical() {
    let r = reconcile(
        LIMITS,
        &ChangeRequest::new(key("joe", LimitType::Soft, LimitItem::Nofile), 65536),
    )
    .unwrap();

    assert!(r.changed);
    assert_eq!(
        without_line(text(&r), "joe"),
        without_line(LIMITS, "joe"),
        "every other line must be untouched"
    );
    assert!(text(&r).contains("joe\tsoft\tnofile\t65536\t# dev box\n"));
}

#[test]
fn five_field_line_is_never_matched() {
    // The fixture carries "@student hard nproc 20 extra # five fields".
    let r = reconcile(
        LIMITS,
        &ChangeRequest::new(key("@student", LimitType::Hard, LimitItem::Nproc), 20),
    )
    .unwrap();

    assert_eq!(r.matches, 0);
    assert_eq!(r.action, ReconcileAction::Inserted);
    assert!(r.changed);
    assert!(text(&r).contains(
        "@student        hard    nproc           20      extra   # five fields\n"
    ));
    assert!(text(&r).ends_with("@student\thard\tnproc\t20\n# End of file\n"));
}

#[test]
fn insertion_goes_before_end_of_file_marker() {
    let r = reconcile(
        LIMITS,
        &ChangeRequest::new(key("bob", LimitType::Both, LimitItem::Memlock), 64)
            .with_comment(" locked pages"),
    )
    .unwrap();

    assert!(r.changed);
    assert!(r.had_sentinel);
    assert_eq!(r.resulting_line, "bob\t-\tmemlock\t64\t# locked pages");

    let expected = format!(
        "{}bob\t-\tmemlock\t64\t# locked pages\n# End of file\n",
        LIMITS.strip_suffix("# End of file\n").unwrap()
    );
    assert_eq!(text(&r), expected);
}

#[test]
fn insertion_without_marker_appends_at_end() {
    let content = "# header\n* soft core 0\n";
    let r = reconcile(
        content,
        &ChangeRequest::new(key("joe", LimitType::Hard, LimitItem::Cpu), 60),
    )
    .unwrap();
    assert_eq!(text(&r), "# header\n* soft core 0\njoe\thard\tcpu\t60\n");
    assert!(!r.had_sentinel);
}

#[test]
fn insertion_after_unterminated_last_line_starts_a_new_line() {
    let r = reconcile(
        "* soft core 0",
        &ChangeRequest::new(key("joe", LimitType::Hard, LimitItem::Cpu), 60),
    )
    .unwrap();
    assert_eq!(text(&r), "* soft core 0\njoe\thard\tcpu\t60\n");
}

#[test]
fn insertion_into_empty_file() {
    let r = reconcile(
        "",
        &ChangeRequest::new(key("*", LimitType::Soft, LimitItem::Nofile), 1024),
    )
    .unwrap();
    assert_eq!(text(&r), "*\tsoft\tnofile\t1024\n");
    assert!(r.changed);
}

#[test]
fn marker_in_the_middle_moves_to_the_end() {
    let content = "# End of file\n* soft core 0\n";
    let r = reconcile(
        content,
        &ChangeRequest::new(key("*", LimitType::Soft, LimitItem::Core), 0),
    )
    .unwrap();

    assert!(!r.changed, "record itself is unchanged");
    assert_eq!(text(&r), "* soft core 0\n# End of file\n");
}

#[test]
fn unterminated_marker_is_kept_as_is() {
    let content = "* soft core 0\n# End of file";
    let r = reconcile(
        content,
        &ChangeRequest::new(key("*", LimitType::Soft, LimitItem::Core), 5),
    )
    .unwrap();
    assert_eq!(text(&r), "*\tsoft\tcore\t5\n# End of file");
}

#[test]
fn same_domain_other_type_or_item_is_not_a_match() {
    let content = "joe hard nofile 10\njoe soft nproc 10\n";
    let r = reconcile(
        content,
        &ChangeRequest::new(key("joe", LimitType::Soft, LimitItem::Nofile), 10),
    )
    .unwrap();
    assert_eq!(r.matches, 0);
    assert_eq!(text(&r), "joe hard nofile 10\njoe soft nproc 10\njoe\tsoft\tnofile\t10\n");
}

#[test]
fn invalid_value_aborts_without_output() {
    let content = "* soft core 0\n* hard core unlimited\n";
    let err = reconcile(
        content,
        &ChangeRequest::new(key("joe", LimitType::Hard, LimitItem::Cpu), 60),
    )
    .unwrap_err();
    match err {
        LimitsError::InvalidValue { line_no, value } => {
            assert_eq!(line_no, 2);
            assert_eq!(value, "unlimited");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn reconciling_twice_is_a_fixed_point() {
    let requests = [
        ChangeRequest::new(key("joe", LimitType::Soft, LimitItem::Nofile), 4096),
        ChangeRequest::new(key("@admins", LimitType::Hard, LimitItem::Nproc), 1000)
            .with_policy(MergePolicy::KeepMax),
        ChangeRequest::new(key("new", LimitType::Both, LimitItem::Rtprio), 99).with_comment("rt"),
    ];

    for request in &requests {
        let first = reconcile(LIMITS, request).unwrap();
        let second = reconcile(&first.content, request).unwrap();
        assert!(first.changed, "{}", request.key);
        assert!(!second.changed, "{}", request.key);
        assert_eq!(first.content, second.content, "{}", request.key);
        assert_eq!(first.resulting_line, second.resulting_line);
    }
}

#[test]
fn duplicate_keys_are_judged_line_by_line() {
    let content = "joe soft nofile 100\njoe soft nofile 900\n";
    let r = reconcile(
        content,
        &ChangeRequest::new(key("joe", LimitType::Soft, LimitItem::Nofile), 500)
            .with_policy(MergePolicy::KeepMax),
    )
    .unwrap();

    // 100 -> 500; 900 stays: no running maximum is carried across lines.
    assert_eq!(text(&r), "joe\tsoft\tnofile\t500\njoe soft nofile 900\n");
    assert_eq!(r.matches, 2);
    assert!(r.changed);
    assert_eq!(r.action, ReconcileAction::Kept);
    assert_eq!(r.resulting_line, "joe soft nofile 900");
}

#[test]
fn bad_domain_is_rejected_before_parsing() {
    // The file would fail to parse; the request check must come first.
    let err = reconcile(
        "* hard core unlimited\n",
        &ChangeRequest::new(key("two words", LimitType::Soft, LimitItem::Core), 1),
    )
    .unwrap_err();
    assert!(matches!(err, LimitsError::InvalidDomain(_)));
}

#[test]
fn non_utf8_lines_pass_through_byte_identical() {
    let content: &[u8] = b"# R\xe9glages\n* soft core 0\njoe soft nofile 10 # caf\xe9\n\xff\xfe junk\n# End of file\n";
    let r = reconcile(
        content,
        &ChangeRequest::new(key("*", LimitType::Hard, LimitItem::Core), 0),
    )
    .unwrap();

    assert_eq!(r.action, ReconcileAction::Inserted);
    assert_eq!(
        r.content,
        b"# R\xe9glages\n* soft core 0\njoe soft nofile 10 # caf\xe9\n\xff\xfe junk\n*\thard\tcore\t0\n# End of file\n"
    );
}

#[test]
fn rewritten_line_keeps_non_utf8_comment_bytes() {
    let r = reconcile(
        &b"joe soft nofile 10 # caf\xe9\n"[..],
        &ChangeRequest::new(key("joe", LimitType::Soft, LimitItem::Nofile), 20),
    )
    .unwrap();

    assert_eq!(r.content, b"joe\tsoft\tnofile\t20\t# caf\xe9\n");
    assert_eq!(r.resulting_line, "joe\tsoft\tnofile\t20\t# caf\u{fffd}");
}

#[test]
fn non_breaking_space_does_not_split_fields() {
    // Three fields once U+00A0 is not a separator, so the line never matches.
    let content = "joe\u{a0}soft nofile 10\n";
    let r = reconcile(
        content,
        &ChangeRequest::new(key("joe", LimitType::Soft, LimitItem::Nofile), 99),
    )
    .unwrap();

    assert_eq!(r.matches, 0);
    assert_eq!(text(&r), "joe\u{a0}soft nofile 10\njoe\tsoft\tnofile\t99\n");
}

#[test]
fn replacement_character_domain_cannot_match_undecodable_bytes() {
    let err = reconcile(
        &b"j\xffe soft nofile 10\n"[..],
        &ChangeRequest::new(key("j\u{fffd}e", LimitType::Soft, LimitItem::Nofile), 20),
    )
    .unwrap_err();
    assert!(matches!(err, LimitsError::InvalidDomain(_)));
}
