//! Content-type matching.

const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
    "text/csv",
];

/// Match a content type against an allow-list pattern.
///
/// Patterns are either exact (`image/png`) or a `type/*` wildcard, which
/// matches any content type starting with `type/`.
pub fn content_type_matches(pattern: &str, content_type: &str) -> bool {
    if pattern == content_type {
        return true;
    }

    match pattern.strip_suffix("/*") {
        Some(prefix) => content_type
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/')),
        None => false,
    }
}

pub fn is_image_type(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

pub fn is_document_type(content_type: &str) -> bool {
    DOCUMENT_TYPES.contains(&content_type)
}
