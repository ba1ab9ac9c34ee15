//! Matching helpers for the extension and MIME rules.

/// Returns `true` if `name` ends with one of `allowed` (case-insensitive).
///
/// Entries may be given with or without the leading dot. An empty list
/// accepts everything.
pub fn extension_allowed(name: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let name = name.to_ascii_lowercase();
    allowed.iter().any(|ext| {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        !ext.is_empty()
            && name.len() > ext.len()
            && name.ends_with(&ext)
            && name.as_bytes()[name.len() - ext.len() - 1] == b'.'
    })
}

/// Returns `true` if `mime` matches one of `patterns`.
///
/// `type/*` matches any subtype of `type`; anything else must match exactly.
/// An empty list accepts everything.
pub fn mime_allowed(mime: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    let mime = mime.trim().to_ascii_lowercase();
    let base = mime.split('/').next().unwrap_or_default();
    patterns.iter().any(|pattern| {
        let pattern = pattern.trim().to_ascii_lowercase();
        match pattern.strip_suffix("/*") {
            Some("*") => true,
            Some(wanted) => base == wanted,
            None => mime == pattern,
        }
    })
}

/// Formats a byte count with decimal units, one fractional digit at most.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [(&str, u64); 4] = [
        ("TB", 1_000_000_000_000),
        ("GB", 1_000_000_000),
        ("MB", 1_000_000),
        ("KB", 1_000),
    ];
    for (unit, factor) in UNITS {
        if bytes >= factor / 10 {
            let tenths = (bytes * 10 + factor / 2) / factor;
            return if tenths % 10 == 0 {
                format!("{} {unit}", tenths / 10)
            } else {
                format!("{}.{} {unit}", tenths / 10, tenths % 10)
            };
        }
    }
    format!("{bytes} B")
}
