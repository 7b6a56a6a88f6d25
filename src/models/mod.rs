pub mod quiz;
pub mod rules;

pub use quiz::{Card, Deck, DeckKind};
pub use rules::{Difficulty, Pacing, WinCondition};

/// Chat platform identifiers are opaque snowflake strings
pub type ChannelId = String;
pub type UserId = String;
