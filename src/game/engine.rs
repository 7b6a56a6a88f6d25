use std::{sync::Arc, time::Duration};
use tokio::time::{sleep_until, Instant};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    round::{Challenge, Round, Scoring},
    scoreboard::{PlayerScore, Scoreboard, Standings},
    timer::RoundTimer,
};
use crate::{
    deck::{DeckStore, ScramblePuzzle, REVIEW_DECK},
    dictionary::Dictionary,
    models::{Card, Deck, DeckKind, Difficulty, Pacing, WinCondition},
    render::QuestionRenderer,
    session::{QuizEvent, QuizKind, Session, SessionRegistry},
    storage::Settings,
    transport::{CardField, Messenger, RichCard},
};

pub const DEFAULT_ROUND_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_SCRAMBLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_GAUNTLET_DURATION: Duration = Duration::from_secs(120);
/// Consecutive unanswered rounds before a quiz is called off
pub const DEFAULT_TIMEOUT_LIMIT: u32 = 5;

const RESULTS_COLOR: u32 = 0xFADE40;

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub round_timeout: Duration,
    pub scramble_timeout: Duration,
    pub gauntlet_duration: Duration,
    pub timeout_limit: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            round_timeout: DEFAULT_ROUND_TIMEOUT,
            scramble_timeout: DEFAULT_SCRAMBLE_TIMEOUT,
            gauntlet_duration: DEFAULT_GAUNTLET_DURATION,
            timeout_limit: DEFAULT_TIMEOUT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizMode {
    Standard,
    /// Every accepted answer of a card scores separately
    Multi,
}

impl QuizMode {
    pub fn kind(self) -> QuizKind {
        match self {
            Self::Standard => QuizKind::Standard,
            Self::Multi => QuizKind::Multi,
        }
    }

    fn scoring(self) -> Scoring {
        match self {
            Self::Standard => Scoring::OncePerPlayer,
            Self::Multi => Scoring::OncePerAnswer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuizRequest {
    pub deck: String,
    pub mode: QuizMode,
    pub win: WinCondition,
    pub pacing: Pacing,
}

#[derive(Debug, Clone)]
pub struct ScrambleRequest {
    pub difficulty: Difficulty,
    pub win: WinCondition,
    pub pacing: Pacing,
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    Exhausted,
    Won,
    Stopped,
    TimedOut,
}

/// Where the questions of a run come from
enum Questions<'a> {
    Deck(Deck),
    Scramble {
        dictionary: &'a Dictionary,
        difficulty: Difficulty,
    },
}

impl Questions<'_> {
    fn next(&mut self) -> Option<Challenge> {
        match self {
            Self::Deck(deck) => deck.draw().map(Challenge::from_card),
            Self::Scramble {
                dictionary,
                difficulty,
            } => ScramblePuzzle::generate(*dictionary, *difficulty, &mut rand::rng()).map(Challenge::Scramble),
        }
    }
}

struct RunSetup {
    scoring: Scoring,
    win: WinCondition,
    pacing: Pacing,
    timeout: Duration,
    kind: DeckKind,
}

struct RunOutcome {
    board: Scoreboard,
    missed: Vec<Card>,
    ending: Ending,
}

/// Runs quizzes, one task per channel
pub struct QuizEngine {
    pub(super) registry: Arc<SessionRegistry>,
    pub(super) decks: Arc<DeckStore>,
    pub(super) dictionary: Arc<Dictionary>,
    pub(super) renderer: Arc<dyn QuestionRenderer>,
    pub(super) settings: Arc<Settings>,
    pub(super) messenger: Messenger,
    pub(super) timing: EngineSettings,
}

impl QuizEngine {
    pub fn new(
        registry: Arc<SessionRegistry>,
        decks: Arc<DeckStore>,
        dictionary: Arc<Dictionary>,
        renderer: Arc<dyn QuestionRenderer>,
        settings: Arc<Settings>,
        messenger: Messenger,
        timing: EngineSettings,
    ) -> Self {
        Self {
            registry,
            decks,
            dictionary,
            renderer,
            settings,
            messenger,
            timing,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn decks(&self) -> &Arc<DeckStore> {
        &self.decks
    }

    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Run a deck quiz on a reserved channel to completion
    pub async fn run_quiz(self: Arc<Self>, session: Session, request: QuizRequest) {
        let span = tracing::info_span!("quiz", channel = %session.channel_id(), run = %Uuid::new_v4());
        self.quiz(session, request).instrument(span).await
    }

    async fn quiz(&self, mut session: Session, request: QuizRequest) {
        let channel_id = session.channel_id().to_string();
        let channel = channel_id.as_str();

        let deck = if request.deck == REVIEW_DECK {
            self.decks.take_review(channel)
        } else {
            self.decks.load(&request.deck).await
        };
        if deck.is_empty() {
            self.messenger
                .text(channel, &format!("Quiz '{}' not found.", request.deck))
                .await;
            return;
        }

        tracing::info!("Starting quiz '{}' with {} cards", request.deck, deck.len());
        self.messenger
            .text(
                channel,
                &format!(
                    "Starting a new quiz: **{}** ({} questions). First to {} points wins.",
                    deck.description,
                    deck.len(),
                    request.win.target()
                ),
            )
            .await;

        let title = deck.description.clone();
        let setup = RunSetup {
            scoring: request.mode.scoring(),
            win: request.win,
            pacing: request.pacing,
            timeout: deck
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(self.timing.round_timeout),
            kind: deck.kind,
        };
        let outcome = self
            .run_rounds(channel, &mut session, Questions::Deck(deck), &setup)
            .await;
        self.finish(channel, &title, &outcome, setup.win).await;

        if !outcome.missed.is_empty() {
            self.decks.put_review(
                channel,
                Deck {
                    description: format!("Review: {title}"),
                    kind: setup.kind,
                    cards: outcome.missed,
                    ..Deck::empty()
                },
            );
        }
    }

    /// Run a word scramble on a reserved channel to completion
    pub async fn run_scramble(self: Arc<Self>, session: Session, request: ScrambleRequest) {
        let span = tracing::info_span!("scramble", channel = %session.channel_id(), run = %Uuid::new_v4());
        self.scramble(session, request).instrument(span).await
    }

    async fn scramble(&self, mut session: Session, request: ScrambleRequest) {
        let channel_id = session.channel_id().to_string();
        let channel = channel_id.as_str();

        let difficulty = request.difficulty;
        let available = ScramblePuzzle::generate(&self.dictionary, difficulty, &mut rand::rng()).is_some();
        if !available {
            tracing::warn!("No dictionary words for {} scrambles", difficulty.name());
            self.messenger
                .text(channel, "No words available for a word scramble.")
                .await;
            return;
        }

        tracing::info!("Starting {} word scramble", difficulty.name());
        self.messenger
            .text(
                channel,
                &format!(
                    "Starting a new **{}** word scramble. First to {} points wins.",
                    difficulty.name(),
                    request.win.target()
                ),
            )
            .await;

        let setup = RunSetup {
            scoring: Scoring::OncePerPlayer,
            win: request.win,
            pacing: request.pacing,
            timeout: self.timing.scramble_timeout,
            kind: DeckKind::Text,
        };
        let questions = Questions::Scramble {
            dictionary: self.dictionary.as_ref(),
            difficulty,
        };
        let outcome = self
            .run_rounds(channel, &mut session, questions, &setup)
            .await;

        let title = format!("Word Scramble ({})", difficulty.name());
        self.finish(channel, &title, &outcome, setup.win).await;
    }

    async fn run_rounds(
        &self,
        channel: &str,
        session: &mut Session,
        mut questions: Questions<'_>,
        setup: &RunSetup,
    ) -> RunOutcome {
        let mut board = Scoreboard::new();
        let mut missed = Vec::new();
        let mut idle_rounds = 0;
        let mut number = 0;

        let ending = loop {
            let Some(challenge) = questions.next() else {
                break Ending::Exhausted;
            };
            // the first round only drains what queued up during the start
            let pause = if number == 0 { Duration::ZERO } else { setup.pacing.pause };
            if self.pause(session, pause).await {
                missed.extend(challenge.into_card());
                break Ending::Stopped;
            }
            number += 1;

            let mut round = Round::new(challenge, setup.scoring);
            self.announce(channel, round.challenge(), setup.kind, number).await;
            let mut timer = RoundTimer::arm(setup.timeout, setup.pacing.answer_window);
            let stopped = self.play_round(session, &mut round, &mut timer).await;

            self.messenger
                .text(channel, &round_summary(&round, setup.scoring))
                .await;
            let (challenge, responders) = round.into_parts();

            if responders.is_empty() {
                idle_rounds += 1;
                missed.extend(challenge.into_card());
            } else {
                idle_rounds = 0;
                for responder in &responders {
                    board.add(&responder.user_id, &responder.name, responder.points);
                }
            }

            if stopped {
                break Ending::Stopped;
            }
            if board.has_winner(setup.win) {
                break Ending::Won;
            }
            if idle_rounds >= self.timing.timeout_limit {
                break Ending::TimedOut;
            }
        };

        tracing::info!("Quiz ended ({:?}) after {} rounds", ending, number);
        RunOutcome {
            board,
            missed,
            ending,
        }
    }

    /// Post question `number`, as an image for image decks when the renderer
    /// produced one
    pub(super) async fn announce(&self, channel: &str, challenge: &Challenge, kind: DeckKind, number: usize) {
        match challenge {
            Challenge::Card { card, .. } => {
                if kind == DeckKind::Image {
                    let png = self.renderer.render_text(&card.question).await;
                    if !png.is_empty() {
                        self.messenger.image(channel, &png).await;
                        return;
                    }
                    tracing::debug!("Renderer produced nothing, sending question as text");
                }
                self.messenger
                    .text(channel, &format!("**Q{}:** {}", number, card.question))
                    .await;
            }
            Challenge::Scramble(puzzle) => {
                self.messenger
                    .text(
                        channel,
                        &format!("**Q{}:** Unscramble `{}` ({} letters)", number, puzzle.scrambled, puzzle.len()),
                    )
                    .await;
            }
        }
    }

    /// Collect answers until the round closes. Returns true on a stop signal.
    async fn play_round(&self, session: &mut Session, round: &mut Round, timer: &mut RoundTimer) -> bool {
        loop {
            if round.is_complete() {
                timer.close();
            }
            if timer.is_closed() {
                return false;
            }

            tokio::select! {
                biased;
                event = session.recv() => match event {
                    Some(QuizEvent::Answer(answer)) => {
                        if !timer.accepts(answer.received_at) {
                            // answers queue in arrival order, so the deadline has passed for good
                            tracing::debug!("Late answer from {} ignored", answer.user_name);
                            timer.expire(answer.received_at);
                        } else if round.judge(&answer.user_id, &answer.user_name, &answer.text, &self.dictionary) {
                            tracing::debug!("Accepted '{}' from {}", answer.text, answer.user_name);
                            if timer.on_accepted(answer.received_at) {
                                tracing::debug!("First correct answer, round timer is {:?}", timer.state());
                            }
                        }
                    }
                    Some(QuizEvent::Stop) | None => {
                        timer.close();
                        return true;
                    }
                },
                _ = sleep_until(timer.deadline()) => {
                    timer.expire(Instant::now());
                }
            }
        }
    }

    /// Wait between rounds. Answers are discarded, a stop ends the run.
    async fn pause(&self, session: &mut Session, duration: Duration) -> bool {
        let until = Instant::now() + duration;
        loop {
            tokio::select! {
                biased;
                event = session.recv() => match event {
                    Some(QuizEvent::Answer(_)) => {}
                    Some(QuizEvent::Stop) | None => return true,
                },
                _ = sleep_until(until) => return false,
            }
        }
    }

    async fn finish(&self, channel: &str, title: &str, outcome: &RunOutcome, win: WinCondition) {
        match outcome.ending {
            Ending::TimedOut => {
                self.messenger
                    .text(channel, "Too many timeouts in a row, stopping the quiz.")
                    .await;
            }
            Ending::Stopped => {
                self.messenger.text(channel, "Quiz stopped.").await;
            }
            Ending::Exhausted | Ending::Won => {}
        }
        let standings = outcome.board.render(win);
        self.messenger
            .card(channel, &results_card(title, &standings))
            .await;
    }
}

/// Text posted after each round
fn round_summary(round: &Round, scoring: Scoring) -> String {
    let challenge = round.challenge();
    let fastest = round.fastest().map(|responder| responder.user_id.as_str());
    let mut lines = Vec::new();
    if round.responders().is_empty() {
        lines.push(format!("Time's up! Answer: **{}**", challenge.reveal()));
    } else {
        let names: Vec<String> = round
            .responders()
            .iter()
            .map(|responder| {
                let mut entry = format!("**{}**", responder.name);
                if scoring == Scoring::OncePerAnswer {
                    entry.push_str(&format!(" ({})", responder.answers.join(", ")));
                }
                if fastest == Some(responder.user_id.as_str()) {
                    entry.push_str(" (fastest)");
                }
                entry
            })
            .collect();
        lines.push(format!("Correct: {}", names.join(", ")));
        lines.push(format!("Answer: **{}**", challenge.reveal()));
    }
    if let Challenge::Card { card, .. } = challenge {
        if let Some(note) = card.note() {
            lines.push(format!("> {}", note.replace('\n', "\n> ")));
        }
    }
    lines.join("\n")
}

fn score_lines(players: &[PlayerScore]) -> String {
    players
        .iter()
        .map(|p| format!("**{}**: {}", p.name, p.score))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Final scoreboard card
pub(super) fn results_card(title: &str, standings: &Standings) -> RichCard {
    let mut fields = Vec::new();
    if !standings.winners.is_empty() {
        fields.push(CardField::new("Winners", score_lines(&standings.winners)));
    }
    if !standings.participants.is_empty() {
        fields.push(CardField::new("Participants", score_lines(&standings.participants)));
    }
    RichCard {
        title: format!("Final score: {title}"),
        description: fields.is_empty().then(|| "Nobody scored.".to_string()),
        color: Some(RESULTS_COLOR),
        fields,
        footer: None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        deck::tests::store_with,
        render::TextOnly,
        session::Answer,
        transport::memory::{Outgoing, RecordingTransport},
    };
    use tokio::time::sleep;

    const FIRE: &str = r#"{"description": "Fire", "deck": [{"question": "火", "answers": ["ひ", "び"]}]}"#;

    fn numbers(count: usize) -> String {
        let cards: Vec<String> = (0..count)
            .map(|i| format!(r#"{{"question": "q{i}", "answers": ["a{i}"]}}"#))
            .collect();
        format!(r#"{{"description": "Numbers", "deck": [{}]}}"#, cards.join(","))
    }

    pub(crate) fn engine_with(
        decks: &[(&str, &str)],
        dictionary: Dictionary,
    ) -> (Arc<QuizEngine>, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let settings_path = std::env::temp_dir().join(format!("settings-{}.json", Uuid::new_v4()));
        let engine = QuizEngine::new(
            SessionRegistry::new(),
            Arc::new(store_with(decks)),
            Arc::new(dictionary),
            Arc::new(TextOnly),
            Arc::new(Settings::load(settings_path)),
            Messenger::new(transport.clone()),
            EngineSettings::default(),
        );
        (Arc::new(engine), transport)
    }

    fn request(deck: &str, win: i64, pacing: Pacing) -> QuizRequest {
        QuizRequest {
            deck: deck.to_string(),
            mode: QuizMode::Standard,
            win: WinCondition::new(win),
            pacing,
        }
    }

    /// Reserve the test channel
    pub(crate) fn session(engine: &QuizEngine, kind: QuizKind) -> Session {
        engine.registry.reserve("c1", kind).unwrap()
    }

    /// Start a standard quiz in the background
    fn spawn_quiz(engine: &Arc<QuizEngine>, request: QuizRequest) -> tokio::task::JoinHandle<()> {
        let session = session(engine, request.mode.kind());
        tokio::spawn(engine.clone().run_quiz(session, request))
    }

    async fn play_quiz(engine: &Arc<QuizEngine>, request: QuizRequest) {
        let session = session(engine, request.mode.kind());
        engine.clone().run_quiz(session, request).await
    }

    pub(crate) fn answer(engine: &QuizEngine, user: &str, text: &str) -> bool {
        engine
            .registry
            .route("c1", QuizEvent::Answer(Answer::new(user, user, text)))
    }

    fn questions(transport: &RecordingTransport) -> Vec<String> {
        transport
            .texts("c1")
            .into_iter()
            .filter(|text| text.starts_with("**Q"))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_card_quiz_with_instant_win() {
        let (engine, transport) = engine_with(&[("fire", FIRE)], Dictionary::empty());
        let run = spawn_quiz(&engine, request("fire", 1, Pacing::from_millis(0, 0)));

        sleep(Duration::from_millis(1)).await;
        assert_eq!(questions(&transport), ["**Q1:** 火"]);
        assert!(answer(&engine, "Alice", "ひ"));
        run.await.unwrap();

        let cards = transport.cards("c1");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].fields, [CardField::new("Winners", "**Alice**: 1")]);
        assert!(!engine.registry.is_active("c1"));
        // nothing missed, so no review deck
        assert!(engine.decks.take_review("c1").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_timeouts_abort() {
        let (engine, transport) = engine_with(&[("numbers", &numbers(8))], Dictionary::empty());
        play_quiz(&engine, request("numbers", 10, Pacing::default())).await;

        assert_eq!(questions(&transport).len(), 5);
        let texts = transport.texts("c1");
        assert!(texts.iter().any(|t| t.starts_with("Too many timeouts")));
        let cards = transport.cards("c1");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].description.as_deref(), Some("Nobody scored."));
        assert!(!engine.registry.is_active("c1"));
        assert_eq!(engine.decks.take_review("c1").len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_window_credits_only_timely_answers() {
        let (engine, transport) = engine_with(&[("numbers", &numbers(3))], Dictionary::empty());
        let run = spawn_quiz(&engine, request("numbers", 10, Pacing::from_millis(1000, 5000)));

        sleep(Duration::from_millis(1)).await;
        let reply = questions(&transport)[0].replace("**Q1:** q", "a");
        assert!(answer(&engine, "Alice", &reply));
        sleep(Duration::from_millis(500)).await;
        assert!(answer(&engine, "Bob", &reply));
        sleep(Duration::from_millis(1000)).await;
        // the quiz is still running, but the window closed at 1001ms
        assert!(answer(&engine, "Carol", &reply));
        sleep(Duration::from_millis(1)).await;
        assert!(engine.registry.route("c1", QuizEvent::Stop));
        run.await.unwrap();

        assert_eq!(questions(&transport).len(), 1);
        let summary = &transport.texts("c1")[2];
        assert_eq!(summary, &format!("Correct: **Alice** (fastest), **Bob**\nAnswer: **{reply}**"));
        let cards = transport.cards("c1");
        assert_eq!(
            cards[0].fields,
            [CardField::new("Participants", "**Alice**: 1\n**Bob**: 1")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_stamped_after_grace_is_not_credited() {
        let (engine, transport) = engine_with(&[("numbers", &numbers(3))], Dictionary::empty());
        let run = spawn_quiz(&engine, request("numbers", 10, Pacing::from_millis(1000, 5000)));

        sleep(Duration::from_millis(1)).await;
        let reply = questions(&transport)[0].replace("**Q1:** q", "a");
        assert!(answer(&engine, "Alice", &reply));
        sleep(Duration::from_millis(500)).await;
        assert!(answer(&engine, "Bob", &reply));
        // queued while the round is open, stamped after the window
        let carol = Answer {
            received_at: Instant::now() + Duration::from_millis(501),
            ..Answer::new("Carol", "Carol", &reply)
        };
        assert!(engine.registry.route("c1", QuizEvent::Answer(carol)));
        sleep(Duration::from_millis(1)).await;

        let summary = &transport.texts("c1")[2];
        assert_eq!(summary, &format!("Correct: **Alice** (fastest), **Bob**\nAnswer: **{reply}**"));
        assert!(engine.registry.route("c1", QuizEvent::Stop));
        run.await.unwrap();
        assert_eq!(
            transport.cards("c1")[0].fields,
            [CardField::new("Participants", "**Alice**: 1\n**Bob**: 1")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_stamped_after_deadline_closes_round() {
        let (engine, transport) = engine_with(&[("fire", FIRE)], Dictionary::empty());
        let run = spawn_quiz(&engine, request("fire", 1, Pacing::default()));

        sleep(Duration::from_millis(1)).await;
        let late = Answer {
            received_at: Instant::now() + DEFAULT_ROUND_TIMEOUT + Duration::from_secs(1),
            ..Answer::new("Alice", "Alice", "ひ")
        };
        assert!(engine.registry.route("c1", QuizEvent::Answer(late)));
        sleep(Duration::from_millis(1)).await;

        // closed on the late answer, not on the 20s timer
        assert_eq!(transport.texts("c1")[2], "Time's up! Answer: **ひ, び**");
        run.await.unwrap();
        assert_eq!(
            transport.cards("c1")[0].description.as_deref(),
            Some("Nobody scored.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_round_draws_a_new_card() {
        let (engine, transport) = engine_with(&[("numbers", &numbers(3))], Dictionary::empty());
        play_quiz(&engine, request("numbers", 10, Pacing::default())).await;

        let asked = questions(&transport);
        assert_eq!(asked.len(), 3);
        let mut unique = asked.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);
        assert!(!transport.texts("c1").iter().any(|t| t.starts_with("Too many")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_round() {
        let (engine, transport) = engine_with(&[("numbers", &numbers(5))], Dictionary::empty());
        let run = spawn_quiz(&engine, request("numbers", 10, Pacing::default()));

        sleep(Duration::from_secs(3)).await;
        assert!(engine.registry.route("c1", QuizEvent::Stop));
        run.await.unwrap();

        assert_eq!(questions(&transport).len(), 1);
        assert!(transport.texts("c1").contains(&"Quiz stopped.".to_string()));
        assert_eq!(transport.cards("c1").len(), 1);
        assert!(!engine.registry.is_active("c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_pause_keeps_scores() {
        let (engine, transport) = engine_with(&[("numbers", &numbers(5))], Dictionary::empty());
        let run = spawn_quiz(&engine, request("numbers", 10, Pacing::from_millis(0, 5000)));

        sleep(Duration::from_millis(1)).await;
        let asked = questions(&transport);
        let answer_text = asked[0].replace("**Q1:** q", "a");
        assert!(answer(&engine, "Alice", &answer_text));
        sleep(Duration::from_secs(1)).await;
        // in the pause now, answers go nowhere
        assert!(answer(&engine, "Bob", "a0"));
        assert!(engine.registry.route("c1", QuizEvent::Stop));
        run.await.unwrap();

        assert_eq!(questions(&transport).len(), 1);
        let cards = transport.cards("c1");
        assert_eq!(cards[0].fields, [CardField::new("Participants", "**Alice**: 1")]);

        // the card drawn for the next round was never asked
        let review = engine.decks.take_review("c1");
        assert_eq!(review.len(), 1);
        assert_ne!(format!("**Q1:** {}", review.cards[0].question), asked[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_queued_before_first_question() {
        let (engine, transport) = engine_with(&[("fire", FIRE)], Dictionary::empty());
        let session = session(&engine, QuizKind::Standard);
        assert!(engine.registry.route("c1", QuizEvent::Stop));
        engine
            .clone()
            .run_quiz(session, request("fire", 1, Pacing::default()))
            .await;

        assert!(questions(&transport).is_empty());
        assert!(transport.texts("c1").contains(&"Quiz stopped.".to_string()));
        assert!(!engine.registry.is_active("c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_quiz_is_reported() {
        let (engine, transport) = engine_with(&[], Dictionary::empty());
        play_quiz(&engine, request("nope", 1, Pacing::default())).await;
        assert_eq!(transport.texts("c1"), ["Quiz 'nope' not found."]);
        assert!(!engine.registry.is_active("c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_review_replays_missed_cards() {
        let (engine, transport) = engine_with(&[("fire", FIRE)], Dictionary::empty());
        play_quiz(&engine, request("fire", 1, Pacing::default())).await;

        let run = spawn_quiz(&engine, request(REVIEW_DECK, 1, Pacing::from_millis(0, 0)));
        sleep(Duration::from_millis(1)).await;
        assert!(answer(&engine, "Alice", "び"));
        run.await.unwrap();

        assert_eq!(questions(&transport), ["**Q1:** 火", "**Q1:** 火"]);
        assert!(transport.texts("c1")[3].contains("Review: Fire"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_answer_round_closes_when_all_claimed() {
        let (engine, transport) = engine_with(&[("fire", FIRE)], Dictionary::empty());
        let mut quiz = request("fire", 10, Pacing::from_millis(60_000, 0));
        quiz.mode = QuizMode::Multi;
        let start = Instant::now();
        let run = spawn_quiz(&engine, quiz);

        sleep(Duration::from_millis(1)).await;
        answer(&engine, "Alice", "ひ");
        answer(&engine, "Bob", "ひ");
        answer(&engine, "Bob", "ビ");
        run.await.unwrap();

        // closed long before the 60s window
        assert!(start.elapsed() < Duration::from_secs(1));
        let cards = transport.cards("c1");
        assert_eq!(
            cards[0].fields,
            [CardField::new("Participants", "**Alice**: 1\n**Bob**: 1")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scramble_accepts_anagrams() {
        let dictionary = Dictionary::from_words(["listen", "silent"]);
        let (engine, transport) = engine_with(&[], dictionary);
        let session = session(&engine, QuizKind::Scramble);
        let run = tokio::spawn(engine.clone().run_scramble(session, ScrambleRequest {
            difficulty: Difficulty::Normal,
            win: WinCondition::new(1),
            pacing: Pacing::from_millis(0, 0),
        }));

        sleep(Duration::from_millis(1)).await;
        assert!(questions(&transport)[0].contains("(6 letters)"));
        answer(&engine, "Alice", "Silent");
        run.await.unwrap();

        let cards = transport.cards("c1");
        assert_eq!(cards[0].title, "Final score: Word Scramble (normal)");
        assert_eq!(cards[0].fields, [CardField::new("Winners", "**Alice**: 1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scramble_without_words() {
        let (engine, transport) = engine_with(&[], Dictionary::empty());
        let session = session(&engine, QuizKind::Scramble);
        engine
            .clone()
            .run_scramble(session, ScrambleRequest {
                difficulty: Difficulty::Easy,
                win: WinCondition::default(),
                pacing: Pacing::default(),
            })
            .await;
        assert_eq!(transport.texts("c1"), ["No words available for a word scramble."]);
        assert!(matches!(transport.sent("c1")[0], Outgoing::Text(_)));
        assert!(!engine.registry.is_active("c1"));
    }

    #[test]
    fn test_round_summary_lists_note() {
        let card = Card {
            comment: Some("fire\nflame".to_string()),
            ..Card::new("火", &["ひ"])
        };
        let round = Round::new(Challenge::from_card(card), Scoring::OncePerPlayer);
        let summary = round_summary(&round, Scoring::OncePerPlayer);
        assert_eq!(summary, "Time's up! Answer: **ひ**\n> fire\n> flame");
    }

    #[test]
    fn test_round_summary_marks_fastest_claims() {
        let dictionary = Dictionary::empty();
        let mut round = Round::new(
            Challenge::from_card(Card::new("火", &["ひ", "び"])),
            Scoring::OncePerAnswer,
        );
        assert!(round.judge("u2", "Bob", "び", &dictionary));
        assert!(round.judge("u1", "Alice", "ひ", &dictionary));
        assert_eq!(
            round_summary(&round, Scoring::OncePerAnswer),
            "Correct: **Bob** (び) (fastest), **Alice** (ひ)\nAnswer: **ひ, び**"
        );
    }
}
