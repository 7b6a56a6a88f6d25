pub mod scramble;
pub mod validate;

use dashmap::DashMap;
use rand::Rng;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};
use tokio::fs;

use crate::{
    error::DeckError,
    models::{ChannelId, Deck},
};

pub use scramble::ScramblePuzzle;

/// Name of the pseudo-quiz replaying the cards nobody answered last time
pub const REVIEW_DECK: &str = "review";

/// Uniform Fisher-Yates shuffle
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Quiz storage: a list mapping quiz names to deck files in a folder
pub struct DeckStore {
    folder: PathBuf,
    list_path: PathBuf,
    quizzes: RwLock<HashMap<String, String>>,
    /// Missed cards of each channel's last quiz
    reviews: DashMap<ChannelId, Deck>,
}

impl DeckStore {
    pub fn new(folder: impl Into<PathBuf>, list_path: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            list_path: list_path.into(),
            quizzes: RwLock::new(HashMap::new()),
            reviews: DashMap::new(),
        }
    }

    /// Re-read the quiz list from disk, replacing the old one
    pub async fn reload(&self) -> Result<usize, DeckError> {
        let content = fs::read_to_string(&self.list_path).await?;
        let list: HashMap<String, String> = serde_json::from_str(&content)?;
        let count = list.len();

        *self.quizzes.write().unwrap_or_else(PoisonError::into_inner) = list;
        tracing::info!("Loaded {} quizzes from {}", count, self.list_path.display());

        Ok(count)
    }

    /// Sorted names of all known quizzes
    pub fn list_quiz_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .quizzes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn file_path(&self, id: &str) -> Option<PathBuf> {
        self.quizzes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|file| self.folder.join(file))
    }

    /// Read a deck in file order
    pub async fn read_deck(&self, id: &str) -> Result<Deck, DeckError> {
        let path = self
            .file_path(id)
            .ok_or_else(|| DeckError::Unknown(id.to_string()))?;
        read_deck_file(&path).await
    }

    /// Load a shuffled deck. Any failure yields an empty deck, so callers
    /// must check for emptiness.
    pub async fn load(&self, id: &str) -> Deck {
        match self.read_deck(id).await {
            Ok(mut deck) => {
                shuffle(&mut deck.cards, &mut rand::rng());
                deck
            }
            Err(e) => {
                tracing::warn!("Failed to load quiz '{}': {}", id, e);
                Deck::empty()
            }
        }
    }

    pub fn put_review(&self, channel: &str, deck: Deck) {
        self.reviews.insert(channel.to_string(), deck);
    }

    /// Take the channel's review deck, shuffled. Empty if there is none.
    pub fn take_review(&self, channel: &str) -> Deck {
        match self.reviews.remove(channel) {
            Some((_, mut deck)) => {
                shuffle(&mut deck.cards, &mut rand::rng());
                deck
            }
            None => Deck::empty(),
        }
    }
}

async fn read_deck_file(path: &Path) -> Result<Deck, DeckError> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}
