//! Phonetic matching algorithms for Russian text
//!
//! These encode strings by how they sound, so spelling variants of the same
//! pronunciation ("Иванов" / "Иваноф") compare equal.
//!
//! # Algorithms
//! - **Soundex**: first letter + 3 digits. Cyrillic consonants are grouped by
//!   place and manner of articulation; Latin letters use the classic English
//!   digits.
//! - **Metaphone**: first letter + collapsed consonant classes, at most 6 chars.
//!
//! Only letters are encoded. A string without letters has an empty code and
//! scores 0.0 against everything, itself included.

use super::normalize::{prepare, words};
use super::numeric::count_ratio;
use super::Similarity;
use smallvec::SmallVec;

/// Length of every non-empty Soundex code.
pub const SOUNDEX_LENGTH: usize = 4;

/// Default Metaphone code cap.
pub const METAPHONE_MAX_LENGTH: usize = 6;

type LetterBuf = SmallVec<[char; 32]>;

/// Uppercased letters of `s`, everything else dropped.
fn letters(s: &str) -> LetterBuf {
    s.chars()
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_alphabetic())
        .collect()
}

// ============================================================================
// Soundex
// ============================================================================

/// Soundex phonetic encoder
///
/// Stateless encoder - all instances are equivalent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Soundex;

impl Soundex {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Encode a string to its Soundex code
    #[must_use]
    pub fn encode(&self, s: &str) -> String {
        soundex(s)
    }
}

impl Similarity for Soundex {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        soundex_similarity(a, b)
    }

    fn name(&self) -> &'static str {
        "soundex"
    }
}

/// Soundex digit of an uppercase letter; 0 means "not coded".
fn soundex_digit(c: char) -> u8 {
    match c {
        'Б' | 'П' | 'Ф' | 'В' => 1,
        'Г' | 'К' | 'Х' => 2,
        'Д' | 'Т' => 3,
        'Ж' | 'Ш' | 'Щ' | 'Ч' => 4,
        'З' | 'С' | 'Ц' => 5,
        'Л' => 6,
        'М' | 'Н' => 7,
        'Р' => 8,
        'Й' => 9,
        'B' | 'F' | 'P' | 'V' => 1,
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => 2,
        'D' | 'T' => 3,
        'L' => 4,
        'M' | 'N' => 5,
        'R' => 6,
        // vowels, soft/hard signs, anything else
        _ => 0,
    }
}

/// Encode a string using Russian Soundex.
///
/// The first letter is kept as is, then digits of following letters are
/// appended, skipping uncoded letters and repeats of the last appended digit.
/// The code is padded with `0` to four chars.
///
/// ```
/// use fuzzydedup::algorithms::phonetic::soundex;
///
/// assert_eq!(soundex("кабель"), "К160");
/// assert_eq!(soundex("Robert"), "R163");
/// assert_eq!(soundex("3x2.5"), "X000");
/// assert_eq!(soundex("2.5"), "");
/// ```
#[must_use]
pub fn soundex(s: &str) -> String {
    let letters = letters(s);
    let Some(&first) = letters.first() else {
        return String::new();
    };

    let mut code = String::with_capacity(SOUNDEX_LENGTH * 2);
    code.push(first);
    let mut last = soundex_digit(first);
    let mut len = 1;

    for &c in &letters[1..] {
        if len >= SOUNDEX_LENGTH {
            break;
        }
        let digit = soundex_digit(c);
        if digit == 0 || digit == last {
            continue;
        }
        code.push(char::from(b'0' + digit));
        last = digit;
        len += 1;
    }

    while len < SOUNDEX_LENGTH {
        code.push('0');
        len += 1;
    }
    code
}

/// Similarity of two Soundex codes: 1.0 when equal, else matching positions / 4.
#[must_use]
pub fn soundex_code_similarity(a: &str, b: &str) -> f64 {
    code_similarity(a, b, |_, _| SOUNDEX_LENGTH)
}

/// Soundex similarity of two strings.
#[must_use]
pub fn soundex_similarity(a: &str, b: &str) -> f64 {
    soundex_code_similarity(&soundex(a), &soundex(b))
}

// ============================================================================
// Metaphone
// ============================================================================

/// Metaphone phonetic encoder
///
/// # Parameters
/// - `max_length`: Maximum code length (default: 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metaphone {
    pub max_length: usize,
}

impl Default for Metaphone {
    fn default() -> Self {
        Self {
            max_length: METAPHONE_MAX_LENGTH,
        }
    }
}

impl Metaphone {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Encode a string to its Metaphone code
    #[must_use]
    pub fn encode(&self, s: &str) -> String {
        metaphone(s, self.max_length)
    }
}

impl Similarity for Metaphone {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        metaphone_code_similarity(&self.encode(a), &self.encode(b))
    }

    fn name(&self) -> &'static str {
        "metaphone"
    }
}

#[inline]
fn is_silent(c: char) -> bool {
    matches!(
        c,
        'А' | 'Е' | 'Ё' | 'И' | 'О' | 'У' | 'Ы' | 'Э' | 'Ю' | 'Я' | 'Ь' | 'Ъ'
    )
}

/// Consonant class of an uppercase letter.
fn metaphone_class(c: char) -> char {
    match c {
        'Б' | 'П' => 'П',
        'В' | 'Ф' => 'Ф',
        'Г' | 'К' | 'Х' => 'К',
        'Д' | 'Т' => 'Т',
        'Ж' | 'Ш' | 'Щ' | 'Ч' => 'Ш',
        'З' | 'С' | 'Ц' => 'С',
        other => other,
    }
}

/// Encode a string using Russian Metaphone.
///
/// The first letter is kept as is. Vowels and soft/hard signs are dropped and
/// break a run, so the same class on both sides of a vowel is kept twice.
///
/// ```
/// use fuzzydedup::algorithms::phonetic::metaphone;
///
/// assert_eq!(metaphone("кабель", 6), "КПЛ");
/// assert_eq!(metaphone("провод", 6), "ПРФТ");
/// ```
#[must_use]
pub fn metaphone(s: &str, max_length: usize) -> String {
    if max_length == 0 {
        return String::new();
    }
    let letters = letters(s);
    let Some(&first) = letters.first() else {
        return String::new();
    };

    let mut code = String::with_capacity(max_length * 2);
    code.push(first);
    let mut len = 1;
    let mut previous = Some(metaphone_class(first));

    for &c in &letters[1..] {
        if len >= max_length {
            break;
        }
        if is_silent(c) {
            previous = None;
            continue;
        }
        let class = metaphone_class(c);
        if previous != Some(class) {
            code.push(class);
            len += 1;
        }
        previous = Some(class);
    }
    code
}

/// Similarity of two Metaphone codes: 1.0 when equal, else matching
/// positions / longer length.
#[must_use]
pub fn metaphone_code_similarity(a: &str, b: &str) -> f64 {
    code_similarity(a, b, usize::max)
}

/// Metaphone similarity of two strings with the default code cap.
#[must_use]
pub fn metaphone_similarity(a: &str, b: &str) -> f64 {
    Metaphone::default().similarity(a, b)
}

fn code_similarity(a: &str, b: &str, denominator: impl Fn(usize, usize) -> usize) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let matches = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
    count_ratio(matches, denominator(a.chars().count(), b.chars().count()))
}

// ============================================================================
// Combined matcher
// ============================================================================

/// Soundex and Metaphone codes of one word.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WordCodes {
    soundex: String,
    metaphone: String,
}

impl WordCodes {
    fn similarity(&self, other: &WordCodes) -> f64 {
        (soundex_code_similarity(&self.soundex, &other.soundex)
            + metaphone_code_similarity(&self.metaphone, &other.metaphone))
            / 2.0
    }
}

/// Averages Soundex and Metaphone similarity, word by word.
///
/// Each side is split into words; words without letters are ignored. The
/// score is the mean, over both directions, of each word's best match on the
/// other side, so word order does not matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhoneticMatcher {
    metaphone: Metaphone,
}

impl Default for PhoneticMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PhoneticMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            metaphone: Metaphone::default(),
        }
    }

    #[must_use]
    pub fn encode_soundex(&self, s: &str) -> String {
        soundex(s)
    }

    #[must_use]
    pub fn encode_metaphone(&self, s: &str) -> String {
        self.metaphone.encode(s)
    }

    /// Phonetic similarity of two single words (or whole strings treated as one).
    #[must_use]
    pub fn word_similarity(&self, a: &str, b: &str) -> f64 {
        self.codes(a).similarity(&self.codes(b))
    }

    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let codes_a = self.word_codes(a);
        let codes_b = self.word_codes(b);
        if codes_a.is_empty() || codes_b.is_empty() {
            return 0.0;
        }
        (best_match_mean(&codes_a, &codes_b) + best_match_mean(&codes_b, &codes_a)) / 2.0
    }

    fn codes(&self, word: &str) -> WordCodes {
        WordCodes {
            soundex: soundex(word),
            metaphone: self.metaphone.encode(word),
        }
    }

    fn word_codes(&self, s: &str) -> Vec<WordCodes> {
        let prepared = prepare(s);
        words(&prepared)
            .map(|w| self.codes(w))
            .filter(|c| !c.soundex.is_empty())
            .collect()
    }
}

impl Similarity for PhoneticMatcher {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        PhoneticMatcher::similarity(self, a, b)
    }

    fn name(&self) -> &'static str {
        "phonetic"
    }
}

fn best_match_mean(from: &[WordCodes], to: &[WordCodes]) -> f64 {
    let total: f64 = from
        .iter()
        .map(|f| to.iter().map(|t| f.similarity(t)).fold(0.0, f64::max))
        .sum();
    total / from.len() as f64
}
