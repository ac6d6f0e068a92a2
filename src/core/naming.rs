//! core::naming
//!
//! Sanitization of user-supplied destination names.
//!
//! Move, copy, translate and create take a destination directory and file
//! name from form input. Both are reduced to a restricted alphabet before
//! they are used to build a resource identity:
//! - Lowercase ASCII alphanumerics
//! - `-` as the word separator (spaces and `_` become `-`)
//! - `.` kept inside segments for file extensions
//! - `/` separates directory segments
//!
//! Empty, `.` and `..` segments are dropped, so a sanitized path can never
//! escape the mount root.

/// Sanitize a single path segment into kebab-case.
///
/// # Example
///
/// ```
/// use editflow::core::naming::sanitize_segment;
///
/// assert_eq!(sanitize_segment("About Us.MD"), "about-us.md");
/// assert_eq!(sanitize_segment("__init__"), "init");
/// assert_eq!(sanitize_segment("..."), "");
/// ```
pub fn sanitize_segment(segment: &str) -> String {
    let mapped: String = segment
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c == ' ' || c == '_' || c == '-' {
                Some('-')
            } else if c == '.' {
                Some('.')
            } else {
                None
            }
        })
        .collect();

    // Collapse runs of separators and trim them from both ends.
    let mut out = String::with_capacity(mapped.len());
    let mut last: Option<char> = None;
    for c in mapped.chars() {
        let is_sep = c == '-' || c == '.';
        if is_sep && (out.is_empty() || last == Some('-') || last == Some('.')) {
            if c == '.' && last == Some('-') {
                out.pop();
                out.push('.');
                last = Some('.');
            }
            continue;
        }
        out.push(c);
        last = Some(c);
    }
    while out.ends_with('-') || out.ends_with('.') {
        out.pop();
    }
    out
}

/// Sanitize a slash-delimited path segment by segment.
///
/// # Example
///
/// ```
/// use editflow::core::naming::sanitize_path;
///
/// assert_eq!(sanitize_path("/Blog Posts//2024/../Drafts/"), "blog-posts/2024/drafts");
/// assert_eq!(sanitize_path(""), "");
/// ```
pub fn sanitize_path(path: &str) -> String {
    path.split('/')
        .map(sanitize_segment)
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a string is already in sanitized form.
pub fn is_sanitized_path(path: &str) -> bool {
    sanitize_path(path) == path
}
