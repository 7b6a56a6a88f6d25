pub mod engine;
pub mod gauntlet;
pub mod matcher;
pub mod round;
pub mod scoreboard;
pub mod timer;

pub use engine::{EngineSettings, QuizEngine, QuizMode, QuizRequest, ScrambleRequest};
pub use gauntlet::GauntletRequest;
