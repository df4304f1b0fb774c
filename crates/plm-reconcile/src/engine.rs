use tracing::{debug, warn};

use crate::classify::{classify, LineKind};
use crate::error::LimitsError;
use crate::types::{render_record_line, ChangeRequest, Reconciliation, ReconcileAction, Record};

/// Outcome of evaluating one matching line against the request.
struct LineDecision {
    text: Vec<u8>,
    action: ReconcileAction,
}

/// Exact-match short-circuit first, then the merge policy.
///
/// Each matching line is judged against its own value; nothing carries over
/// from an earlier duplicate.
fn decide(record: &Record, raw: &[u8], request: &ChangeRequest) -> LineDecision {
    if record.value == request.value {
        return LineDecision {
            text: raw.to_vec(),
            action: ReconcileAction::Unchanged,
        };
    }

    let resolved = request.policy.resolve(request.value, record.value);
    if resolved == record.value {
        return LineDecision {
            text: raw.to_vec(),
            action: ReconcileAction::Kept,
        };
    }

    let comment = request
        .comment_override()
        .map(str::as_bytes)
        .or(record.comment.as_deref());
    LineDecision {
        text: render_record_line(&request.key, resolved, comment),
        action: ReconcileAction::Updated {
            previous: record.value,
        },
    }
}

fn ensure_terminated(out: &mut Vec<u8>) {
    if !out.is_empty() && !out.ends_with(b"\n") {
        out.push(b'\n');
    }
}

fn strip_terminator(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Single forward pass over `content`:
/// - matching record lines are re-evaluated and possibly rewritten
/// - every other line is copied as raw bytes, in place
/// - an absent key is appended
/// - the `# End of file` sentinel, if present anywhere, is emitted last
///
/// Pure: no IO. A parse error aborts before any output exists.
pub fn reconcile(
    content: impl AsRef<[u8]>,
    request: &ChangeRequest,
) -> Result<Reconciliation, LimitsError> {
    request.validate()?;
    let content = content.as_ref();
    let lines = classify(content)?;

    let mut out = Vec::with_capacity(content.len() + 64);
    let mut sentinel: Option<&[u8]> = None;
    let mut changed = false;
    let mut match_count = 0usize;
    let mut last: Option<LineDecision> = None;

    for line in &lines {
        match &line.kind {
            LineKind::Sentinel => {
                if sentinel.is_none() {
                    sentinel = Some(line.raw);
                } else {
                    debug!(line_no = line.line_no, "extra end-of-file marker dropped");
                }
            }
            LineKind::Record(record) if request.key.matches(record) => {
                match_count += 1;
                if match_count > 1 {
                    warn!(
                        line_no = line.line_no,
                        key = %request.key,
                        "duplicate directive; evaluated against its own value"
                    );
                }

                let decision = decide(record, line.raw, request);
                debug!(
                    line_no = line.line_no,
                    existing = record.value,
                    desired = request.value,
                    policy = ?request.policy,
                    action = ?decision.action,
                    "matched directive"
                );
                if matches!(decision.action, ReconcileAction::Updated { .. }) {
                    changed = true;
                }
                out.extend_from_slice(&decision.text);
                last = Some(decision);
            }
            _ => out.extend_from_slice(line.raw),
        }
    }

    let decision = match last {
        Some(decision) => decision,
        None => {
            let text = render_record_line(
                &request.key,
                request.value,
                request.comment_override().map(str::as_bytes),
            );
            debug!(key = %request.key, value = request.value, "directive absent; appending");
            ensure_terminated(&mut out);
            out.extend_from_slice(&text);
            changed = true;
            LineDecision {
                text,
                action: ReconcileAction::Inserted,
            }
        }
    };

    if let Some(marker) = sentinel {
        ensure_terminated(&mut out);
        out.extend_from_slice(marker);
    }

    Ok(Reconciliation {
        content: out,
        changed,
        resulting_line: strip_terminator(&decision.text),
        action: decision.action,
        matches: match_count,
        had_sentinel: sentinel.is_some(),
    })
}
