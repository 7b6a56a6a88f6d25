use rand::{seq::IndexedRandom, Rng};

use super::shuffle;
use crate::{dictionary::Dictionary, models::Difficulty};

/// How many extra shuffles to try when the scramble is itself a real word
const MAX_REROLLS: usize = 3;

/// A word scramble question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScramblePuzzle {
    pub scrambled: String,
    pub word: String,
    /// Every dictionary word using exactly these letters
    pub solutions: Vec<String>,
}

impl ScramblePuzzle {
    /// Draw a new puzzle from the dictionary, None if no word fits the
    /// difficulty.
    pub fn generate<R: Rng + ?Sized>(
        dictionary: &Dictionary,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Option<Self> {
        let group = dictionary.random_group(&difficulty.word_lengths(), rng)?;
        let word = group.choose(rng)?.clone();

        let mut letters: Vec<char> = word.chars().collect();
        shuffle(&mut letters, rng);
        for _ in 0..MAX_REROLLS {
            if !dictionary.contains(&letters.iter().collect::<String>()) {
                break;
            }
            shuffle(&mut letters, rng);
        }

        Some(Self {
            scrambled: letters.into_iter().collect(),
            word,
            solutions: group.to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.word.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::sorted_letters;

    #[test]
    fn test_puzzle_uses_word_letters() {
        let dict = Dictionary::from_words(["planet", "platen", "cat"]);
        let mut rng = rand::rng();
        for _ in 0..20 {
            let puzzle = ScramblePuzzle::generate(&dict, Difficulty::Hard, &mut rng).unwrap();
            assert_eq!(puzzle.len(), 6);
            assert_eq!(sorted_letters(&puzzle.scrambled), sorted_letters(&puzzle.word));
            assert_eq!(puzzle.solutions, ["planet", "platen"]);
        }
    }

    #[test]
    fn test_no_puzzle_without_fitting_words() {
        let dict = Dictionary::from_words(["a", "ox"]);
        assert!(ScramblePuzzle::generate(&dict, Difficulty::Normal, &mut rand::rng()).is_none());
    }

    #[test]
    fn test_scramble_avoids_real_words_when_possible() {
        // "abcdefg" has 5040 orderings and only one of them is a word
        let dict = Dictionary::from_words(["abcdefg"]);
        let mut rng = rand::rng();
        let hits = (0..200)
            .filter_map(|_| ScramblePuzzle::generate(&dict, Difficulty::Normal, &mut rng))
            .filter(|puzzle| puzzle.scrambled == puzzle.word)
            .count();
        assert_eq!(hits, 0);
    }
}
