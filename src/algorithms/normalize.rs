//! String preparation shared by every metric
//!
//! All metrics compare [`prepare`]d text: trimmed, lowercased and NFC-composed,
//! so `"Й"` typed as a base letter plus combining breve equals the precomposed
//! letter. Tokenizers for the set-based metrics live here too.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Punctuation stripped from both ends of a word token.
pub const TOKEN_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '(', ')', '[', ']', '{', '}', '"', '\''];

/// Canonical form used before any comparison.
#[must_use]
pub fn prepare(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_ascii() {
        return trimmed.to_ascii_lowercase();
    }
    trimmed.nfc().collect::<String>().to_lowercase()
}

/// Prepare both sides of a pair.
#[must_use]
pub fn prepare_pair(a: &str, b: &str) -> (String, String) {
    (prepare(a), prepare(b))
}

/// Split prepared text on whitespace and strip surrounding punctuation.
///
/// Tokens left empty after stripping are dropped.
pub fn words(prepared: &str) -> impl Iterator<Item = &str> {
    prepared
        .split_whitespace()
        .map(|w| w.trim_matches(TOKEN_PUNCTUATION))
        .filter(|w| !w.is_empty())
}

/// Extra normalization applied on top of [`prepare`] by callers that need it
/// (for example before building prefix keys or rule fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Trim, lowercase, NFC
    #[default]
    Standard,
    /// Standard plus punctuation removal
    RemovePunctuation,
    /// Standard plus whitespace removal
    RemoveWhitespace,
    /// NFKD compatibility decomposition, lowercase, no punctuation or whitespace
    Strict,
}

/// Normalize a string according to the specified mode
#[must_use]
pub fn normalize_string(s: &str, mode: NormalizationMode) -> String {
    match mode {
        NormalizationMode::Standard => prepare(s),
        NormalizationMode::RemovePunctuation => prepare(s)
            .chars()
            .filter(|c| !is_punctuation(*c))
            .collect(),
        NormalizationMode::RemoveWhitespace => {
            prepare(s).chars().filter(|c| !c.is_whitespace()).collect()
        }
        NormalizationMode::Strict => s
            .nfkd()
            .collect::<String>()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect(),
    }
}

#[inline]
fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || matches!(c, '«' | '»' | '—' | '–' | '…' | '№')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_trims_and_lowercases() {
        assert_eq!(prepare("  Кабель ВВГнг  "), "кабель ввгнг");
        assert_eq!(prepare("\tHello\n"), "hello");
        assert_eq!(prepare("   "), "");
    }

    #[test]
    fn test_prepare_composes_decomposed_letters() {
        let decomposed = "\u{0418}\u{0306}"; // И + combining breve
        assert_eq!(prepare(decomposed), "й");
        assert_eq!(prepare(decomposed).chars().count(), 1);
    }

    #[test]
    fn test_words_strip_punctuation() {
        let text = prepare("ООО \"Рога и Копыта\", (Москва)");
        let tokens: Vec<&str> = words(&text).collect();
        assert_eq!(tokens, vec!["ооо", "рога", "и", "копыта", "москва"]);
    }

    #[test]
    fn test_words_keep_inner_punctuation() {
        let text = prepare("провод 3x2.5 мм.");
        let tokens: Vec<&str> = words(&text).collect();
        assert_eq!(tokens, vec!["провод", "3x2.5", "мм"]);
    }

    #[test]
    fn test_modes() {
        assert_eq!(
            normalize_string("Hello, World!", NormalizationMode::RemovePunctuation),
            "hello world"
        );
        assert_eq!(
            normalize_string(" Hello World ", NormalizationMode::RemoveWhitespace),
            "helloworld"
        );
        assert_eq!(
            normalize_string("  Hello, World!  ", NormalizationMode::Strict),
            "helloworld"
        );
        assert_eq!(normalize_string(" «Ёлка» ", NormalizationMode::RemovePunctuation), "ёлка");
    }
}
