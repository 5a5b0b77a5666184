//! Helpers for validating identifiers used in filesystem paths.

/// Returns true if an id is safe to use as a single path component on all platforms.
///
/// Rules:
/// - Must be non-empty and not "." or ".."
/// - Must not contain path separators ('/' or '\\')
/// - Must not contain control characters or NUL
/// - Must not contain Windows-reserved filename characters
/// - Must not end with '.' or space (Windows restriction)
pub fn is_safe_path_component(id: &str) -> bool {
    if id.is_empty() || id == "." || id == ".." {
        return false;
    }

    if id.ends_with('.') || id.ends_with(' ') {
        return false;
    }

    id.chars().all(is_safe_char)
}

/// Replaces every character that [`is_safe_path_component`] would reject.
///
/// Used for externally supplied strings such as authority version strings,
/// where any stable mapping to a directory name will do.
pub fn sanitize_path_component(raw: &str) -> String {
    let mut out: String = raw
        .trim()
        .chars()
        .map(|c| if is_safe_char(c) && c != ' ' { c } else { '_' })
        .collect();
    while out.ends_with('.') {
        out.pop();
    }
    if out.is_empty() || out == "." || out == ".." {
        return "_".to_string();
    }
    out
}

fn is_safe_char(c: char) -> bool {
    !(c == '/' || c == '\\' || c == '\0' || c.is_control())
        && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|')
}
