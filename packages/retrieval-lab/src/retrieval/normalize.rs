//! Query text normalisation applied before lexical and hybrid search.

/// Remove ASCII punctuation, leaving everything else untouched.
pub fn strip_punctuation(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_punctuation()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_ascii_punctuation_only() {
        assert_eq!(strip_punctuation("what's BM25? (k1=1.2)"), "whats BM25 k112");
        assert_eq!(strip_punctuation("café — naïve"), "café — naïve");
        assert_eq!(strip_punctuation(""), "");
    }
}
