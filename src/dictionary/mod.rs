use anyhow::Result;
use rand::{seq::IndexedRandom, Rng};
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::path::Path;
use tokio::fs;

/// English word list for the scramble quiz, grouped by letter multiset so
/// every anagram of a puzzle can be found.
pub struct Dictionary {
    words: HashSet<String>,
    groups: HashMap<String, Vec<String>>,
}

/// Letters of a word in sorted order, the key shared by all its anagrams
pub fn sorted_letters(word: &str) -> String {
    let mut letters: Vec<char> = word.chars().collect();
    letters.sort_unstable();
    letters.into_iter().collect()
}

impl Dictionary {
    /// Load dictionary from a file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let dictionary = Self::from_words(content.lines());

        tracing::info!(
            "Loaded {} words in {} anagram groups into dictionary",
            dictionary.len(),
            dictionary.groups.len()
        );

        Ok(dictionary)
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: HashSet<String> = words
            .into_iter()
            .map(|line| line.as_ref().trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();

        let mut groups: HashMap<String, Vec<String>> = HashMap::new();
        for word in &words {
            groups
                .entry(sorted_letters(word))
                .or_default()
                .push(word.clone());
        }
        for group in groups.values_mut() {
            group.sort();
        }

        Self { words, groups }
    }

    /// Create an empty dictionary (for testing)
    pub fn empty() -> Self {
        Self {
            words: HashSet::new(),
            groups: HashMap::new(),
        }
    }

    /// Check if a word exists in the dictionary
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    /// All dictionary words made of exactly the letters of `word`
    pub fn anagrams(&self, word: &str) -> &[String] {
        self.groups
            .get(&sorted_letters(&word.to_lowercase()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Picks a random anagram group whose words have a length in `lengths`
    pub fn random_group<R: Rng + ?Sized>(
        &self,
        lengths: &RangeInclusive<usize>,
        rng: &mut R,
    ) -> Option<&[String]> {
        let eligible: Vec<&Vec<String>> = self
            .groups
            .iter()
            .filter(|(letters, _)| lengths.contains(&letters.chars().count()))
            .map(|(_, group)| group)
            .collect();

        eligible.choose(rng).copied().map(Vec::as_slice)
    }

    /// Get the number of words in the dictionary
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if dictionary is empty
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
