//! Query and document tokenizer

use regex::Regex;
use std::sync::OnceLock;

/// Runs of two or more Unicode letters or digits. Underscore splits.
fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\W_]{2,}").expect("token pattern is valid"))
}

/// Lowercase `text` and split it into index terms
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_keys_on_underscore_and_dot() {
        assert_eq!(
            tokenize("FEE_STRUCTURE.Exam_Fee_Sem: 1200"),
            vec!["fee", "structure", "exam", "fee", "sem", "1200"]
        );
    }

    #[test]
    fn test_drops_single_characters() {
        assert_eq!(tokenize("a B cd 7 42"), vec!["cd", "42"]);
    }

    #[test]
    fn test_unicode_letters() {
        assert_eq!(tokenize("Café MÜNCHEN"), vec!["café", "münchen"]);
    }

    #[test]
    fn test_empty() {
        assert!(tokenize("  -- !! ").is_empty());
    }
}
