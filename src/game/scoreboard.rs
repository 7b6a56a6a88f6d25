use serde::Serialize;

use crate::models::{UserId, WinCondition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerScore {
    pub user_id: UserId,
    pub name: String,
    pub score: u32,
}

/// Final standings split at the win threshold
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct Standings {
    pub winners: Vec<PlayerScore>,
    pub participants: Vec<PlayerScore>,
}

/// Points per player for one quiz run. Players are kept in the order they
/// first scored, which is also the tie order of the ranking.
#[derive(Debug, Default)]
pub struct Scoreboard {
    players: Vec<PlayerScore>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add points to a player and return the new total
    pub fn add(&mut self, user_id: &str, name: &str, points: u32) -> u32 {
        match self.players.iter_mut().find(|p| p.user_id == user_id) {
            Some(player) => {
                player.score += points;
                player.score
            }
            None => {
                self.players.push(PlayerScore {
                    user_id: user_id.to_string(),
                    name: name.to_string(),
                    score: points,
                });
                points
            }
        }
    }

    /// Whether anybody has reached the target
    pub fn has_winner(&self, win: WinCondition) -> bool {
        self.players.iter().any(|p| win.is_met(p.score))
    }

    /// Players by score descending, stable on ties
    pub fn ranking(&self) -> Vec<PlayerScore> {
        let mut ranking = self.players.clone();
        ranking.sort_by(|a, b| b.score.cmp(&a.score));
        ranking
    }

    pub fn render(&self, win: WinCondition) -> Standings {
        let (winners, participants) = self
            .ranking()
            .into_iter()
            .partition(|p| win.is_met(p.score));
        Standings {
            winners,
            participants,
        }
    }
}
