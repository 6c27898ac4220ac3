//! Search-filter sanitizer
//!
//! Escapes the characters that carry meaning inside an RFC 4515 assertion
//! value, so a submitted username can be embedded in a filter verbatim.

/// Escape a raw username for use in a search filter.
///
/// Backslash is escaped first so the backslashes introduced for the other
/// characters are not escaped again. Every occurrence is replaced.
pub fn sanitize(raw: &str) -> String {
    raw.replace('\\', "\\5C")
        .replace('\0', "\\00")
        .replace('*', "\\2A")
        .replace('(', "\\28")
        .replace(')', "\\29")
}

/// Equality filter `(<attribute>=<value>)` for an already sanitized value
pub fn equality_filter(attribute: &str, sanitized_value: &str) -> String {
    format!("({}={})", attribute, sanitized_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_username_is_unchanged() {
        assert_eq!(sanitize("jdoe"), "jdoe");
        assert_eq!(sanitize("j.doe@example.com"), "j.doe@example.com");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_each_special_character() {
        assert_eq!(sanitize("a\\b"), "a\\5Cb");
        assert_eq!(sanitize("a\0b"), "a\\00b");
        assert_eq!(sanitize("a*b"), "a\\2Ab");
        assert_eq!(sanitize("a(b"), "a\\28b");
        assert_eq!(sanitize("a)b"), "a\\29b");
    }

    #[test]
    fn test_every_occurrence_is_escaped() {
        assert_eq!(sanitize("**"), "\\2A\\2A");
        assert_eq!(sanitize("(a)(b)"), "\\28a\\29\\28b\\29");
        assert_eq!(sanitize("\\\\"), "\\5C\\5C");
        assert_eq!(sanitize("*)(uid=*"), "\\2A\\29\\28uid=\\2A");
    }

    #[test]
    fn test_backslash_escaped_before_others() {
        // the backslash introduced for '*' must not be escaped again
        assert_eq!(sanitize("\\*"), "\\5C\\2A");
    }

    #[test]
    fn test_second_pass_escapes_again() {
        let once = sanitize("a*");
        assert_eq!(once, "a\\2A");
        assert_eq!(sanitize(&once), "a\\5C2A");
    }

    #[test]
    fn test_equality_filter() {
        assert_eq!(equality_filter("uid", &sanitize("jdoe")), "(uid=jdoe)");
        assert_eq!(
            equality_filter("sAMAccountName", &sanitize("x)(cn=*")),
            "(sAMAccountName=x\\29\\28cn=\\2A)"
        );
    }
}
