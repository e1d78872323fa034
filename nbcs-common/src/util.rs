//! String helpers shared by nbcs services.
//!
//! Lengths are counted in characters, not bytes, so multi-byte text (CJK,
//! emoji) never gets cut inside a code point.

/// Number of characters in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string so the result, ellipsis included, has at most
/// `max_chars` characters. Strings that already fit are returned unchanged.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    const ELLIPSIS: &str = "...";

    if char_len(s) <= max_chars {
        return s.to_string();
    }

    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// First `max_chars` characters of `s`, without an ellipsis.
pub fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 8), "hello...");
        assert_eq!(truncate_with_ellipsis("😀😀😀😀😀", 4), "😀...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
    }

    #[test]
    fn test_truncate_exact_fit() {
        let s = "a".repeat(1024);
        assert_eq!(truncate_with_ellipsis(&s, 1024), s);

        let s = "a".repeat(1025);
        let out = truncate_with_ellipsis(&s, 1024);
        assert_eq!(char_len(&out), 1024);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_take_chars() {
        assert_eq!(take_chars("你好世界", 2), "你好");
        assert_eq!(take_chars("abc", 10), "abc");
        assert_eq!(take_chars("abc", 0), "");
    }
}
