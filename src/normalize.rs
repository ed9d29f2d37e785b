/// Collapse every whitespace run (newlines and tabs included) to one ASCII
/// space and trim both ends. Casing and punctuation are left alone.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Whitespace-split units, the token notion used by the length filter.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_mixed_whitespace() {
        assert_eq!(normalize("  Great \t\n drug!!\r\n"), "Great drug!!");
        assert_eq!(normalize("a\u{00A0}\u{2003}b"), "a b");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t "), "");
    }

    #[test]
    fn keeps_case_and_punctuation() {
        assert_eq!(normalize("Hello,  WORLD ?!"), "Hello, WORLD ?!");
    }

    #[test]
    fn is_idempotent_and_never_doubles_spaces() {
        let samples = [
            "  leading",
            "trailing \n",
            "a  b   c\t\td",
            "line one\nline two\r\n\r\nline three",
            "ünïcödé\u{3000}spaces",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
            assert!(!once.contains("  "), "{once:?}");
            assert!(!once.starts_with(' ') && !once.ends_with(' '));
        }
    }

    #[test]
    fn counts_tokens() {
        assert_eq!(token_count("one two  three"), 3);
        assert_eq!(token_count("   "), 0);
    }
}
