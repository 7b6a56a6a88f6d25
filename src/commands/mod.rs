pub mod handler;

use crate::{
    game::QuizMode,
    models::{Difficulty, Pacing, WinCondition},
    session::QuizKind,
};

pub use handler::{Dispatcher, IncomingMessage};

/// A parsed bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    List,
    Quiz {
        deck: String,
        mode: QuizMode,
        win: WinCondition,
        pacing: Pacing,
    },
    Scramble {
        difficulty: Difficulty,
        win: WinCondition,
    },
    Gauntlet {
        deck: String,
    },
    Stop,
    Ongoing,
    Reload,
    Output,
}

impl Command {
    /// Commands reserved for the bot owner
    pub fn is_owner_only(&self) -> bool {
        matches!(self, Self::Ongoing | Self::Reload | Self::Output)
    }

    /// Kind of quiz the command starts, if any. These need a bot channel.
    pub fn quiz_kind(&self) -> Option<QuizKind> {
        match self {
            Self::Quiz { mode, .. } => Some(mode.kind()),
            Self::Scramble { .. } => Some(QuizKind::Scramble),
            Self::Gauntlet { .. } => Some(QuizKind::Gauntlet),
            _ => None,
        }
    }
}

/// Whether a message is addressed to the bot. The prefix is matched
/// case-insensitively.
pub fn is_command(prefix: &str, content: &str) -> bool {
    content
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Parse a message into a command. Unknown commands yield None, quiz
/// commands with a wrong argument count fall back to the quiz list.
pub fn parse(prefix: &str, content: &str) -> Option<Command> {
    if !is_command(prefix, content) {
        return None;
    }
    let lowered = content.trim().to_lowercase();
    let args: Vec<&str> = lowered.split_whitespace().collect();
    let name = args.first()?.get(prefix.len()..)?;

    let command = match name {
        "help" => Command::Help,
        "list" => Command::List,
        "stop" => Command::Stop,
        "ongoing" => Command::Ongoing,
        "reload" => Command::Reload,
        "output" => Command::Output,
        "quiz" | "flash" | "mad" | "fast" | "mild" | "slow" | "multi" => match args.len() {
            2 | 3 => Command::Quiz {
                deck: args[1].to_string(),
                mode: if name == "multi" {
                    QuizMode::Multi
                } else {
                    QuizMode::Standard
                },
                win: WinCondition::parse(args.get(2).copied()),
                pacing: Pacing::preset(name).unwrap_or_default(),
            },
            _ => Command::List,
        },
        "scramble" => match args.len() {
            1..=3 => Command::Scramble {
                difficulty: args
                    .get(1)
                    .and_then(|d| Difficulty::parse(d))
                    .unwrap_or_default(),
                win: WinCondition::parse(args.get(2).copied()),
            },
            _ => Command::List,
        },
        "gauntlet" => match args.get(1) {
            Some(deck) if args.len() == 2 => Command::Gauntlet {
                deck: deck.to_string(),
            },
            _ => Command::Help,
        },
        _ => return None,
    };
    Some(command)
}
