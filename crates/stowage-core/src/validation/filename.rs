//! Filename safety checks.

use chrono::Utc;

const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Split a filename into stem and extension (extension keeps its leading dot).
///
/// `"photo.tar.gz"` → `("photo.tar", ".gz")`, `"README"` → `("README", "")`.
/// Dots in a leading directory part are ignored.
pub fn split_extension(filename: &str) -> (&str, &str) {
    match filename
        .rfind('.')
        .filter(|&idx| !filename[idx..].contains('/'))
    {
        Some(idx) => filename.split_at(idx),
        None => (filename, ""),
    }
}

/// Lowercased extension including the dot, or an empty string.
pub fn file_extension(filename: &str) -> String {
    split_extension(filename).1.to_lowercase()
}

/// Whether a filename is safe to store: non-empty, no path separators or
/// traversal, no reserved characters, no control characters, and not a
/// Windows device name.
pub fn is_valid_filename(filename: &str) -> bool {
    if filename.trim().is_empty() {
        return false;
    }

    if filename.contains("..") {
        return false;
    }

    if filename
        .chars()
        .any(|c| INVALID_CHARS.contains(&c) || c.is_control())
    {
        return false;
    }

    let stem = split_extension(filename).0.to_uppercase();
    !RESERVED_NAMES.contains(&stem.as_str())
}

/// Replace unsafe characters so the result passes [`is_valid_filename`]
/// (reserved device names aside). An empty result becomes `file_<unix>`.
pub fn sanitize_filename(filename: &str) -> String {
    let replaced: String = filename
        .replace("..", "_")
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim().trim_matches('.');

    if trimmed.is_empty() {
        format!("file_{}", Utc::now().timestamp())
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_filenames() {
        assert!(is_valid_filename("photo.png"));
        assert!(is_valid_filename("my report (final).pdf"));
        assert!(is_valid_filename("console.log"));
    }

    #[test]
    fn test_invalid_filenames() {
        assert!(!is_valid_filename(""));
        assert!(!is_valid_filename("   "));
        assert!(!is_valid_filename("../etc/passwd"));
        assert!(!is_valid_filename("dir/file.png"));
        assert!(!is_valid_filename("dir\\file.png"));
        assert!(!is_valid_filename("what?.png"));
        assert!(!is_valid_filename("a|b"));
        assert!(!is_valid_filename("tab\there"));
    }

    #[test]
    fn test_reserved_device_names() {
        assert!(!is_valid_filename("CON"));
        assert!(!is_valid_filename("con.txt"));
        assert!(!is_valid_filename("Lpt1.log"));
        assert!(is_valid_filename("COM10.txt"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b\\c.png"), "a_b_c.png");
        assert_eq!(sanitize_filename("../secret.txt"), "__secret.txt");
        assert_eq!(sanitize_filename("  .hidden. "), "hidden");
        assert_eq!(sanitize_filename("what?.png"), "what_.png");
        assert!(is_valid_filename(&sanitize_filename("x<y>z:*.png")));
        assert!(sanitize_filename(".").starts_with("file_"));
        assert!(sanitize_filename("   ").starts_with("file_"));
    }

    #[test]
    fn test_extensions() {
        assert_eq!(split_extension("photo.tar.gz"), ("photo.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension("v1.2/README"), ("v1.2/README", ""));
        assert_eq!(file_extension("IMAGE.PNG"), ".png");
        assert_eq!(file_extension("noext"), "");
    }
}
