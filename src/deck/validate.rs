use std::{collections::HashMap, path::PathBuf};
use tokio::fs;

use super::DeckStore;
use crate::{
    error::DeckError,
    models::{Card, Deck},
};

/// Problems found while checking a deck
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub duplicate_questions: Vec<String>,
    /// (question, answer) pairs listed more than once
    pub duplicate_answers: Vec<(String, String)>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_questions.is_empty() && self.duplicate_answers.is_empty()
    }
}

/// Merges cards sharing a question: answers are unioned in first-seen
/// order, distinct comments are joined with newlines.
pub fn merge_duplicates(deck: &Deck) -> (Deck, ValidationReport) {
    let mut report = ValidationReport::default();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut merged: Vec<(Card, Vec<String>)> = Vec::new();

    for card in &deck.cards {
        let slot = match index.get(card.question.as_str()) {
            Some(&slot) => {
                report.duplicate_questions.push(card.question.clone());
                slot
            }
            None => {
                index.insert(&card.question, merged.len());
                merged.push((
                    Card {
                        question: card.question.clone(),
                        answers: Vec::new(),
                        comment: None,
                    },
                    Vec::new(),
                ));
                merged.len() - 1
            }
        };

        let (target, comments) = &mut merged[slot];
        for answer in &card.answers {
            if target.answers.contains(answer) {
                report
                    .duplicate_answers
                    .push((card.question.clone(), answer.clone()));
            } else {
                target.answers.push(answer.clone());
            }
        }
        if let Some(note) = card.note() {
            if !comments.iter().any(|c| c == note) {
                comments.push(note.to_string());
            }
        }
    }

    let cards = merged
        .into_iter()
        .map(|(mut card, comments)| {
            if !comments.is_empty() {
                card.comment = Some(comments.join("\n"));
            }
            card
        })
        .collect();

    let fixed = Deck {
        description: deck.description.clone(),
        kind: deck.kind,
        timeout: deck.timeout,
        cards,
    };
    (fixed, report)
}

/// Check one quiz for duplicates. With `fix`, a merged copy is written
/// next to the deck file as `<file>.fix`.
pub async fn check_quiz(store: &DeckStore, id: &str, fix: bool) -> Result<ValidationReport, DeckError> {
    let deck = store.read_deck(id).await?;
    let (merged, report) = merge_duplicates(&deck);

    for question in &report.duplicate_questions {
        tracing::warn!("{}: duplicate question '{}'", id, question);
    }
    for (question, answer) in &report.duplicate_answers {
        tracing::warn!("{}: duplicate answer '{}' for '{}'", id, answer, question);
    }

    if report.is_clean() {
        tracing::info!("{}: {} cards, no problems", id, deck.len());
    } else if fix {
        let path = store
            .file_path(id)
            .ok_or_else(|| DeckError::Unknown(id.to_string()))?;
        let mut fixed_path = path.into_os_string();
        fixed_path.push(".fix");
        let fixed_path = PathBuf::from(fixed_path);
        fs::write(&fixed_path, serde_json::to_string_pretty(&merged)?).await?;
        tracing::info!("{}: wrote {} merged cards to {}", id, merged.len(), fixed_path.display());
    }

    Ok(report)
}
