//! Citation marker removal.

use regex::Regex;
use std::sync::LazyLock;

/// Inline source annotations such as `【4:0†source】`.
static CITATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"【[0-9]+:[0-9]+†source】").expect("citation pattern is valid"));

/// Strip every citation marker, leaving all other text untouched.
///
/// Repeats until no marker remains, so removing one marker can never expose
/// another and `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(text: &str) -> String {
    let mut current = text.to_string();
    while CITATION_MARKER.is_match(&current) {
        current = CITATION_MARKER.replace_all(&current, "").into_owned();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markers() {
        assert_eq!(sanitize("【0:1†source】hello"), "hello");
        assert_eq!(
            sanitize("Rust is fast【12:3†source】 and safe【4:0†source】."),
            "Rust is fast and safe."
        );
    }

    #[test]
    fn test_preserves_other_text() {
        let text = "No markers here: 【note】 [1:2] 【1:2†other】 †source";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn test_idempotent() {
        for text in [
            "plain",
            "a【1:2†source】b",
            "【【1:2†source】1:2†source】",
            "",
            "多字节【3:4†source】文本",
        ] {
            let once = sanitize(text);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn test_nested_marker_is_fully_removed() {
        assert_eq!(sanitize("x【【1:2†source】1:2†source】y"), "xy");
    }
}
