//! Line classifier.
//!
//! Every physical line lands in exactly one category, tested in order:
//! sentinel, comment, blank, malformed, record. Normalization (whitespace
//! collapse, comment strip) is only used to decide the category and parse
//! fields; callers always re-emit `raw` for lines they do not rewrite.
//!
//! Lines are bytes. A limits file may carry comments in any encoding, and
//! only the fields of a record line are ever decoded.

use crate::error::LimitsError;
use crate::types::{Record, END_OF_FILE_MARKER};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    Sentinel,
    Comment,
    Blank,
    /// Record-looking line that does not split into exactly 4 fields.
    Malformed,
    Record(Record),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedLine<'a> {
    /// 1-based.
    pub line_no: usize,
    /// Original bytes including the terminator.
    pub raw: &'a [u8],
    pub kind: LineKind,
}

/// Classify one physical line (terminator included).
pub fn classify_line(line_no: usize, raw: &[u8]) -> Result<ClassifiedLine<'_>, LimitsError> {
    let kind = line_kind(line_no, raw)?;
    Ok(ClassifiedLine { line_no, raw, kind })
}

/// Classify a whole file. Fails on the first unparsable value, before the
/// caller has produced any output.
pub fn classify(content: &[u8]) -> Result<Vec<ClassifiedLine<'_>>, LimitsError> {
    content
        .split_inclusive(|b| *b == b'\n')
        .enumerate()
        .map(|(i, raw)| classify_line(i + 1, raw))
        .collect()
}

/// ASCII whitespace plus vertical tab. Non-ASCII spaces (U+00A0 and
/// friends) are part of a field.
fn is_separator(b: &u8) -> bool {
    b.is_ascii_whitespace() || *b == 0x0b
}

fn line_kind(line_no: usize, raw: &[u8]) -> Result<LineKind, LimitsError> {
    if raw.starts_with(END_OF_FILE_MARKER.as_bytes()) {
        return Ok(LineKind::Sentinel);
    }
    if raw.starts_with(b"#") {
        return Ok(LineKind::Comment);
    }

    let words: Vec<&[u8]> = raw
        .split(is_separator)
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return Ok(LineKind::Blank);
    }
    let normalized = words.join(&b' ');

    let body = match normalized.iter().position(|b| *b == b'#') {
        Some(at) => normalized[..at].trim_ascii_end(),
        None => normalized.as_slice(),
    };

    let fields: Vec<&[u8]> = body.split(|b| *b == b' ').collect();
    let &[domain, limit_type, limit_item, value] = fields.as_slice() else {
        return Ok(LineKind::Malformed);
    };

    let value = std::str::from_utf8(value)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| LimitsError::InvalidValue {
            line_no,
            value: String::from_utf8_lossy(value).into_owned(),
        })?;

    Ok(LineKind::Record(Record {
        domain: String::from_utf8_lossy(domain).into_owned(),
        limit_type: String::from_utf8_lossy(limit_type).into_owned(),
        limit_item: String::from_utf8_lossy(limit_item).into_owned(),
        value,
        comment: trailing_comment(raw),
    }))
}

/// Bytes after the first `#` of the raw line, without the line terminator.
fn trailing_comment(raw: &[u8]) -> Option<Vec<u8>> {
    let at = raw.iter().position(|b| *b == b'#')?;
    let comment = &raw[at + 1..];
    let comment = comment.strip_suffix(b"\n").unwrap_or(comment);
    let comment = comment.strip_suffix(b"\r").unwrap_or(comment);
    if comment.is_empty() {
        None
    } else {
        Some(comment.to_vec())
    }
}
