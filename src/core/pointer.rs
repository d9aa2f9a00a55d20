//! JSON Pointer (RFC 6901) handling.
//!
//! Canonical pointers start with `#`: the document root is `"#"`, children
//! are formed by appending `/` plus the escaped key or a numeric array
//! index (`#/paths/~1users~1{id}/get`). `~` escapes to `~0` and `/` to `~1`.

/// Escape a single pointer segment (`~` -> `~0`, `/` -> `~1`).
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Unescape a single pointer segment (`~1` -> `/`, `~0` -> `~`).
///
/// Order matters: `~1` must be replaced before `~0` so that `~01`
/// round-trips to `~1` and not `/`.
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Normalize any pointer-ish string to canonical `#`-prefixed form.
///
/// `"" -> "#"`, `"/x" -> "#/x"`, `"x/y" -> "#/x/y"`, `"#/x" -> "#/x"`.
/// Idempotent: `normalize_pointer(normalize_pointer(p)) == normalize_pointer(p)`.
pub fn normalize_pointer(ptr: &str) -> String {
    if ptr.is_empty() {
        return "#".to_string();
    }
    if let Some(rest) = ptr.strip_prefix('#') {
        if rest.is_empty() || rest.starts_with('/') {
            return ptr.to_string();
        }
        return format!("#/{}", rest);
    }
    if ptr.starts_with('/') {
        return format!("#{}", ptr);
    }
    format!("#/{}", ptr)
}

/// Split a canonical pointer into unescaped segments. `"#"` yields no segments.
pub fn split_pointer(ptr: &str) -> Vec<String> {
    let normalized = normalize_pointer(ptr);
    let rest = normalized.trim_start_matches('#');
    if rest.is_empty() {
        return Vec::new();
    }
    rest.split('/')
        .skip(1) // leading '/'
        .map(unescape_segment)
        .collect()
}

/// Append one (unescaped) segment to a canonical pointer.
pub fn join_pointer(base: &str, segment: &str) -> String {
    let normalized = normalize_pointer(base);
    format!("{}/{}", normalized, escape_segment(segment))
}

/// Append a numeric array index to a canonical pointer.
pub fn join_index(base: &str, index: usize) -> String {
    let normalized = normalize_pointer(base);
    format!("{}/{}", normalized, index)
}

/// Build a canonical pointer from unescaped segments.
pub fn pointer_from_segments<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ptr = String::from("#");
    for segment in segments {
        ptr.push('/');
        ptr.push_str(&escape_segment(segment.as_ref()));
    }
    ptr
}

/// The parent of a canonical pointer, or `None` for the root.
pub fn parent_pointer(ptr: &str) -> Option<String> {
    let normalized = normalize_pointer(ptr);
    if normalized == "#" {
        return None;
    }
    match normalized.rfind('/') {
        Some(0) | None => None,
        Some(idx) => {
            let parent = &normalized[..idx];
            if parent == "#" {
                Some("#".to_string())
            } else {
                Some(parent.to_string())
            }
        }
    }
}

/// The last (unescaped) segment of a canonical pointer, or `None` for the root.
pub fn last_segment(ptr: &str) -> Option<String> {
    split_pointer(ptr).pop()
}

/// True when `ptr` equals `prefix` or addresses a descendant of it.
pub fn is_self_or_descendant(ptr: &str, prefix: &str) -> bool {
    let ptr = normalize_pointer(ptr);
    let prefix = normalize_pointer(prefix);
    if prefix == "#" {
        return true;
    }
    ptr == prefix || ptr.starts_with(&format!("{}/", prefix))
}

/// Parse a segment as a non-negative array index.
pub fn as_array_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || (segment.len() > 1 && segment.starts_with('0')) {
        return None;
    }
    segment.parse::<usize>().ok()
}
