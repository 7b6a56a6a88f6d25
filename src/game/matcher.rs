use crate::dictionary::Dictionary;

const KATAKANA_FIRST: char = '\u{30A1}';
const KATAKANA_LAST: char = '\u{30F6}';
const KANA_OFFSET: u32 = 0x60;

/// Fold a katakana code point onto its hiragana twin. This is a reading
/// equivalence only, long vowel marks and other symbols pass through.
fn katakana_to_hiragana(c: char) -> char {
    if (KATAKANA_FIRST..=KATAKANA_LAST).contains(&c) {
        char::from_u32(c as u32 - KANA_OFFSET).unwrap_or(c)
    } else {
        c
    }
}

/// Canonical form used for every answer comparison
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(katakana_to_hiragana)
        .flat_map(char::to_lowercase)
        .collect()
}

/// Compares two normalized strings. Lengths are checked first so obviously
/// wrong answers never reach the string comparison.
pub fn matches(submission: &str, candidate: &str) -> bool {
    submission.chars().count() == candidate.chars().count()
        && (submission == candidate || submission.to_lowercase() == candidate.to_lowercase())
}

/// Position of the accepted answer matched by `submission`, if any
pub fn find_match(submission: &str, accepted: &[String]) -> Option<usize> {
    accepted
        .iter()
        .position(|candidate| matches(submission, candidate))
}

pub fn is_correct(submission: &str, accepted: &[String]) -> bool {
    find_match(submission, accepted).is_some()
}

/// A scramble answer is any dictionary word built from exactly the
/// target's letters.
pub fn is_scramble_solution(submission: &str, target: &str, dictionary: &Dictionary) -> bool {
    dictionary.anagrams(target).iter().any(|word| word == submission)
}
