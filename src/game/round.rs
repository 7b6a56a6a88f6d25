use super::matcher::{is_correct, is_scramble_solution, matches, normalize};
use crate::{
    deck::ScramblePuzzle,
    dictionary::Dictionary,
    models::{Card, UserId},
};

/// What a round asks
#[derive(Debug, Clone)]
pub enum Challenge {
    Card {
        card: Card,
        /// Normalized, deduplicated answers
        accepted: Vec<String>,
    },
    Scramble(ScramblePuzzle),
}

impl Challenge {
    pub fn from_card(card: Card) -> Self {
        let mut accepted: Vec<String> = Vec::with_capacity(card.answers.len());
        for answer in card.answers.iter().map(|a| normalize(a)) {
            if !answer.is_empty() && !accepted.contains(&answer) {
                accepted.push(answer);
            }
        }
        Self::Card { card, accepted }
    }

    /// Normalized answers of a card, empty for scrambles
    pub fn accepted(&self) -> &[String] {
        match self {
            Self::Card { accepted, .. } => accepted,
            Self::Scramble(_) => &[],
        }
    }

    /// Every accepted answer, for display once the round is over
    pub fn reveal(&self) -> String {
        match self {
            Self::Card { card, .. } => card.answers.join(", "),
            Self::Scramble(puzzle) => puzzle.solutions.join(", "),
        }
    }

    pub fn into_card(self) -> Option<Card> {
        match self {
            Self::Card { card, .. } => Some(card),
            Self::Scramble(_) => None,
        }
    }
}

/// How correct answers are credited within a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    /// Each player scores once for any accepted answer
    OncePerPlayer,
    /// Each distinct accepted answer scores once, for whoever gives it first
    OncePerAnswer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Responder {
    pub user_id: UserId,
    pub name: String,
    pub points: u32,
    pub answers: Vec<String>,
}

/// State of one question while answers come in
#[derive(Debug)]
pub struct Round {
    challenge: Challenge,
    scoring: Scoring,
    claimed: Vec<bool>,
    /// Correct responders in the order they were accepted
    responders: Vec<Responder>,
}

impl Round {
    pub fn new(challenge: Challenge, scoring: Scoring) -> Self {
        let claimed = match (&challenge, scoring) {
            (Challenge::Card { accepted, .. }, Scoring::OncePerAnswer) => vec![false; accepted.len()],
            _ => Vec::new(),
        };
        Self {
            challenge,
            scoring,
            claimed,
            responders: Vec::new(),
        }
    }

    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    /// Checks an answer and credits it. Returns true if it scored.
    pub fn judge(&mut self, user_id: &str, name: &str, text: &str, dictionary: &Dictionary) -> bool {
        let submission = normalize(text);
        if submission.is_empty() {
            return false;
        }
        let responded = self.responders.iter().any(|r| r.user_id == user_id);

        let correct = match (&self.challenge, self.scoring) {
            (Challenge::Card { accepted, .. }, Scoring::OncePerAnswer) => {
                let slot = accepted
                    .iter()
                    .zip(&self.claimed)
                    .position(|(candidate, claimed)| !claimed && matches(&submission, candidate));
                match slot {
                    Some(slot) => {
                        self.claimed[slot] = true;
                        true
                    }
                    None => false,
                }
            }
            (Challenge::Card { accepted, .. }, Scoring::OncePerPlayer) => {
                !responded && is_correct(&submission, accepted)
            }
            (Challenge::Scramble(puzzle), _) => {
                !responded && is_scramble_solution(&submission, &puzzle.word, dictionary)
            }
        };

        if correct {
            self.credit(user_id, name, submission);
        }
        correct
    }

    fn credit(&mut self, user_id: &str, name: &str, answer: String) {
        match self.responders.iter_mut().find(|r| r.user_id == user_id) {
            Some(responder) => {
                responder.points += 1;
                responder.answers.push(answer);
            }
            None => self.responders.push(Responder {
                user_id: user_id.to_string(),
                name: name.to_string(),
                points: 1,
                answers: vec![answer],
            }),
        }
    }

    /// A multi-answer round is over once every answer is claimed
    pub fn is_complete(&self) -> bool {
        self.scoring == Scoring::OncePerAnswer
            && !self.claimed.is_empty()
            && self.claimed.iter().all(|&claimed| claimed)
    }

    pub fn responders(&self) -> &[Responder] {
        &self.responders
    }

    /// Whoever was accepted first
    pub fn fastest(&self) -> Option<&Responder> {
        self.responders.first()
    }

    pub fn into_parts(self) -> (Challenge, Vec<Responder>) {
        (self.challenge, self.responders)
    }
}
