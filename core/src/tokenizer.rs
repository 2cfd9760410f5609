use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("valid regex");
}

/// Tokenize text into lowercase alphanumeric runs. Every maximal run of other characters
/// (punctuation, whitespace, underscores) acts as one separator.
///
/// The position of a token in the returned vector is its offset in the positional index, so
/// indexing, phrase matching and snippets must all go through this function.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    RE.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        assert_eq!(tokenize("A, b! c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_and_symbol_only_text() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" -- !! __ ").is_empty());
    }

    #[test]
    fn underscores_split_tokens() {
        assert_eq!(tokenize("snake_case"), vec!["snake", "case"]);
    }
}
