//! Target filename sanitization

/// Used when nothing usable survives sanitization
pub const FALLBACK_NAME: &str = "download.bin";

const MAX_NAME_LEN: usize = 200;

/// Reduce an arbitrary resolver-supplied name to one safe path component.
///
/// Separators and control characters become `_`, leading dots are stripped
/// so the result can never be `.`/`..` or a hidden file.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.').trim();
    let truncated: String = cleaned.chars().take(MAX_NAME_LEN).collect();

    if truncated.is_empty() || truncated.chars().all(|c| c == '_') {
        FALLBACK_NAME.to_string()
    } else {
        truncated
    }
}
