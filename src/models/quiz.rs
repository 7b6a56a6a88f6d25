use serde::{Deserialize, Serialize};

/// One question plus its accepted answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub question: String,
    pub answers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Card {
    pub fn new(question: impl Into<String>, answers: &[&str]) -> Self {
        Self {
            question: question.into(),
            answers: answers.iter().map(|a| a.to_string()).collect(),
            comment: None,
        }
    }

    /// Comment text if it carries anything worth showing
    pub fn note(&self) -> Option<&str> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|comment| !comment.is_empty())
    }
}

/// How a question is presented in chat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckKind {
    Image,
    #[default]
    #[serde(other)]
    Text,
}

/// A quiz file as stored on disk, and the card pile a run draws from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: DeckKind,
    /// Per-deck round timeout override, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(rename = "deck", default)]
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Takes the next card off the pile. Drawn cards are gone for this run.
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }
}
