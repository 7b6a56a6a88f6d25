use once_cell::sync::Lazy;
use std::{collections::HashMap, ops::RangeInclusive, time::Duration};

/// Score needed to win when none is given
pub const DEFAULT_TARGET_SCORE: u32 = 10;
const MAX_TARGET_SCORE: i64 = 100;

/// Round pacing: how long others may still answer after the first correct
/// answer, and how long to wait before the next question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub answer_window: Duration,
    pub pause: Duration,
}

impl Pacing {
    pub const fn from_millis(answer_window: u64, pause: u64) -> Self {
        Self {
            answer_window: Duration::from_millis(answer_window),
            pause: Duration::from_millis(pause),
        }
    }

    /// Look up a named speed preset
    pub fn preset(name: &str) -> Option<Self> {
        PACING_PRESETS.get(name).copied()
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_millis(2000, 5000)
    }
}

/// Speed presets selectable by command name, in milliseconds (window, pause)
pub static PACING_PRESETS: Lazy<HashMap<&'static str, Pacing>> = Lazy::new(|| {
    HashMap::from([
        ("flash", Pacing::from_millis(250, 500)),
        ("mad", Pacing::from_millis(0, 5000)),
        ("fast", Pacing::from_millis(1000, 5000)),
        ("quiz", Pacing::from_millis(2000, 5000)),
        ("mild", Pacing::from_millis(3000, 5000)),
        ("slow", Pacing::from_millis(5000, 5000)),
        ("multi", Pacing::from_millis(1500, 5000)),
    ])
});

/// First player to reach `target` points wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinCondition {
    target: u32,
}

impl WinCondition {
    /// Any requested target is clamped into 1..=100
    pub fn new(target: i64) -> Self {
        Self {
            target: target.clamp(1, MAX_TARGET_SCORE) as u32,
        }
    }

    /// Parses a user supplied score limit, falling back to the default
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|raw| raw.parse::<i64>().ok())
            .map(Self::new)
            .unwrap_or_default()
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn is_met(&self, score: u32) -> bool {
        score >= self.target
    }
}

impl Default for WinCondition {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET_SCORE,
        }
    }
}

/// Word length band for scramble puzzles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Insane,
}

impl Difficulty {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "easy" => Some(Self::Easy),
            "normal" => Some(Self::Normal),
            "hard" => Some(Self::Hard),
            "insane" => Some(Self::Insane),
            _ => None,
        }
    }

    pub fn word_lengths(&self) -> RangeInclusive<usize> {
        match self {
            Self::Easy => 3..=5,
            Self::Normal => 3..=7,
            Self::Hard => 4..=9,
            Self::Insane => 5..=9999,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
            Self::Insane => "insane",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_condition_is_clamped() {
        assert_eq!(WinCondition::new(0).target(), 1);
        assert_eq!(WinCondition::new(-5).target(), 1);
        assert_eq!(WinCondition::new(42).target(), 42);
        assert_eq!(WinCondition::new(1000).target(), 100);
    }

    #[test]
    fn test_win_condition_parse() {
        assert_eq!(WinCondition::parse(None).target(), DEFAULT_TARGET_SCORE);
        assert_eq!(WinCondition::parse(Some("abc")).target(), DEFAULT_TARGET_SCORE);
        assert_eq!(WinCondition::parse(Some("3")).target(), 3);
        assert_eq!(WinCondition::parse(Some("500")).target(), 100);
    }

    #[test]
    fn test_win_condition_is_met() {
        let win = WinCondition::new(2);
        assert!(!win.is_met(1));
        assert!(win.is_met(2));
        assert!(win.is_met(3));
    }

    #[test]
    fn test_pacing_presets() {
        assert_eq!(Pacing::preset("mad").unwrap().answer_window, Duration::ZERO);
        assert_eq!(
            Pacing::preset("slow").unwrap(),
            Pacing::from_millis(5000, 5000)
        );
        assert!(Pacing::preset("turbo").is_none());
    }

    #[test]
    fn test_difficulty_ranges() {
        assert_eq!(Difficulty::default(), Difficulty::Normal);
        assert_eq!(Difficulty::parse("hard").unwrap().word_lengths(), 4..=9);
        assert!(Difficulty::parse("extreme").is_none());
        assert!(Difficulty::Insane.word_lengths().contains(&12));
    }
}
