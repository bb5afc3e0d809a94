//! API utility functions
//!
//! Pure, stateless helpers for building download responses, kept apart from
//! services.rs so they can be unit tested.

use crate::media::OutputKind;

const MAX_FILENAME_STEM: usize = 120;

/// Reduce a title to a safe ASCII file stem.
///
/// Word characters and hyphens survive; whitespace runs become a single
/// underscore; everything else is dropped.
pub fn sanitize_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_space = false;

    for c in title.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push('_');
        }
        pending_space = false;
        out.push(c);
    }

    out.truncate(MAX_FILENAME_STEM);
    out
}

/// `<title>.<ext>`, or `<job_id>.<ext>` when the title sanitizes to nothing
pub fn download_filename(title: Option<&str>, job_id: &str, kind: OutputKind) -> String {
    let stem = title.map(sanitize_filename).unwrap_or_default();
    let stem = if stem.is_empty() { job_id } else { stem.as_str() };
    format!("{stem}.{}", kind.extension())
}

/// `<title>.<ext>` with the original characters kept, for `filename*`.
///
/// Control characters and path separators are dropped; `None` when nothing
/// printable is left.
pub fn display_filename(title: Option<&str>, kind: OutputKind) -> Option<String> {
    let stem: String = title?
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control() && *c != '/' && *c != '\\')
        .take(MAX_FILENAME_STEM)
        .collect();
    let stem = stem.trim();

    (!stem.is_empty()).then(|| format!("{stem}.{}", kind.extension()))
}

/// Content-Disposition value for an attachment.
///
/// `filename` must already be sanitized ASCII. `display_name` goes out as an
/// RFC 5987 `filename*` so clients that understand it keep non-Latin titles.
pub fn content_disposition(filename: &str, display_name: Option<&str>) -> String {
    match display_name {
        Some(name) => format!(
            "attachment; filename=\"{filename}\"; filename*=UTF-8''{}",
            urlencoding::encode(name)
        ),
        None => format!("attachment; filename=\"{filename}\""),
    }
}
