use std::sync::Arc;
use tokio::time::{sleep_until, Instant};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    engine::QuizEngine,
    matcher::{is_correct, normalize},
    round::Challenge,
};
use crate::{
    models::{Deck, UserId},
    session::{QuizEvent, Session},
    storage::OUTPUT_CHANNEL,
    transport::{CardField, RichCard},
};

const GAUNTLET_COLOR: u32 = 0x40DEFA;

#[derive(Debug, Clone)]
pub struct GauntletRequest {
    pub user_id: UserId,
    pub user_name: String,
    pub deck: String,
}

/// Running totals of a time trial
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GauntletTally {
    pub correct: u32,
    pub attempted: u32,
}

impl GauntletTally {
    pub fn record(&mut self, correct: bool) {
        self.attempted += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// correct² / attempted, so precision outweighs volume
    pub fn score(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        f64::from(self.correct).powi(2) / f64::from(self.attempted)
    }

    fn line(&self) -> String {
        format!(
            "{}/{} correct, score **{:.2}**",
            self.correct,
            self.attempted,
            self.score()
        )
    }
}

impl QuizEngine {
    /// Single player time trial over one deck
    pub async fn run_gauntlet(self: Arc<Self>, session: Session, request: GauntletRequest) {
        let span = tracing::info_span!("gauntlet", channel = %session.channel_id(), run = %Uuid::new_v4());
        self.gauntlet(session, request).instrument(span).await
    }

    async fn gauntlet(&self, mut session: Session, request: GauntletRequest) {
        let channel_id = session.channel_id().to_string();
        let channel = channel_id.as_str();

        let mut deck = self.decks.load(&request.deck).await;
        if deck.is_empty() {
            self.messenger
                .text(channel, &format!("Quiz '{}' not found.", request.deck))
                .await;
            return;
        }

        let duration = self.timing.gauntlet_duration;
        tracing::info!("Starting gauntlet '{}' for {}", request.deck, request.user_name);
        self.messenger
            .text(
                channel,
                &format!(
                    "**{}**, your gauntlet on **{}** starts now: {} seconds on the clock!",
                    request.user_name,
                    deck.description,
                    duration.as_secs()
                ),
            )
            .await;
        let mut tally = GauntletTally::default();
        let tally_message = self.messenger.text(channel, &tally.line()).await;

        let deadline = Instant::now() + duration;
        let mut missed = Vec::new();
        let mut number = 0;

        'run: while let Some(card) = deck.draw() {
            number += 1;
            let challenge = Challenge::from_card(card);
            self.announce(channel, &challenge, deck.kind, number).await;

            let correct = loop {
                tokio::select! {
                    biased;
                    event = session.recv() => match event {
                        Some(QuizEvent::Answer(answer)) if answer.user_id == request.user_id => {
                            if answer.received_at > deadline {
                                break 'run;
                            }
                            break is_correct(&normalize(&answer.text), challenge.accepted());
                        }
                        Some(QuizEvent::Answer(_)) => {}
                        Some(QuizEvent::Stop) | None => break 'run,
                    },
                    _ = sleep_until(deadline) => break 'run,
                }
            };

            tally.record(correct);
            if !correct {
                self.messenger
                    .text(channel, &format!("Answer: **{}**", challenge.reveal()))
                    .await;
                missed.extend(challenge.into_card());
            }
            if let Some(message_id) = &tally_message {
                self.messenger.edit(channel, message_id, &tally.line()).await;
            }
        }

        tracing::info!(
            "Gauntlet over: {}/{} correct, score {:.2}",
            tally.correct,
            tally.attempted,
            tally.score()
        );
        let card = gauntlet_card(&request, &deck.description, &tally);
        self.messenger.card(channel, &card).await;
        if let Some(output) = self.settings.get(OUTPUT_CHANNEL) {
            if output != channel {
                self.messenger.card(&output, &card).await;
            }
        }

        if !missed.is_empty() {
            self.decks.put_review(
                channel,
                Deck {
                    description: format!("Review: {}", deck.description),
                    kind: deck.kind,
                    cards: missed,
                    ..Deck::empty()
                },
            );
        }
    }
}

fn gauntlet_card(request: &GauntletRequest, description: &str, tally: &GauntletTally) -> RichCard {
    RichCard {
        title: format!("Gauntlet: {description}"),
        description: Some(format!("<@{}>", request.user_id)),
        color: Some(GAUNTLET_COLOR),
        fields: vec![
            CardField {
                inline: true,
                ..CardField::new("Correct", format!("{}/{}", tally.correct, tally.attempted))
            },
            CardField {
                inline: true,
                ..CardField::new("Score", format!("{:.2}", tally.score()))
            },
        ],
        footer: Some(request.user_name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dictionary::Dictionary,
        game::engine::tests::{answer, engine_with, session},
        session::QuizKind,
        transport::memory::{Outgoing, RecordingTransport},
    };
    use std::time::Duration;
    use tokio::time::sleep;

    fn numbers(count: usize) -> String {
        let cards: Vec<String> = (0..count)
            .map(|i| format!(r#"{{"question": "q{i}", "answers": ["a{i}"]}}"#))
            .collect();
        format!(r#"{{"description": "Numbers", "deck": [{}]}}"#, cards.join(","))
    }

    fn start(engine: &Arc<QuizEngine>, deck: &str) -> tokio::task::JoinHandle<()> {
        let session = session(engine, QuizKind::Gauntlet);
        tokio::spawn(engine.clone().run_gauntlet(session, request(deck)))
    }

    fn request(deck: &str) -> GauntletRequest {
        GauntletRequest {
            user_id: "Alice".to_string(),
            user_name: "Alice".to_string(),
            deck: deck.to_string(),
        }
    }

    #[test]
    fn test_score_rewards_precision() {
        let tally = GauntletTally {
            correct: 6,
            attempted: 10,
        };
        assert!((tally.score() - 3.6).abs() < 1e-9);
        assert_eq!(GauntletTally::default().score(), 0.0);
    }

    #[test]
    fn test_record() {
        let mut tally = GauntletTally::default();
        tally.record(true);
        tally.record(false);
        tally.record(true);
        assert_eq!(tally, GauntletTally { correct: 2, attempted: 3 });
    }

    /// Answer the question currently shown, correctly or not
    fn reply(engine: &QuizEngine, transport: &RecordingTransport, user: &str, right: bool) {
        let question = transport
            .texts("c1")
            .into_iter()
            .rev()
            .find(|t| t.starts_with("**Q"))
            .unwrap();
        let text = if right {
            question.split(" q").last().map(|n| format!("a{n}")).unwrap()
        } else {
            "wrong".to_string()
        };
        answer(engine, user, &text);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gauntlet_counts_attempts_until_time_runs_out() {
        let (engine, transport) = engine_with(&[("numbers", &numbers(50))], Dictionary::empty());
        let run = start(&engine, "numbers");

        for i in 0..10 {
            sleep(Duration::from_secs(1)).await;
            // other players cannot interfere
            answer(&engine, "Bob", "a1");
            sleep(Duration::from_millis(1)).await;
            reply(&engine, &transport, "Alice", i < 6);
        }
        run.await.unwrap();

        let cards = transport.cards("c1");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].fields[0].value, "6/10");
        assert_eq!(cards[0].fields[1].value, "3.60");
        assert!(transport
            .sent("c1")
            .iter()
            .any(|o| matches!(o, Outgoing::Edit { text, .. } if text.starts_with("6/10"))));
        assert!(!engine.registry.is_active("c1"));
        assert_eq!(engine.decks.take_review("c1").len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_go_to_output_channel() {
        let (engine, transport) = engine_with(&[("numbers", &numbers(3))], Dictionary::empty());
        engine.settings.put(OUTPUT_CHANNEL, "results").unwrap();
        let run = start(&engine, "numbers");

        sleep(Duration::from_millis(1)).await;
        assert!(engine.registry.route("c1", QuizEvent::Stop));
        run.await.unwrap();

        assert_eq!(transport.cards("c1").len(), 1);
        assert_eq!(transport.cards("results"), transport.cards("c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_deck() {
        let (engine, transport) = engine_with(&[], Dictionary::empty());
        start(&engine, "nope").await.unwrap();
        assert_eq!(transport.texts("c1"), ["Quiz 'nope' not found."]);
        assert!(!engine.registry.is_active("c1"));
    }
}
