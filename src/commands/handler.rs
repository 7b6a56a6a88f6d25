use dashmap::DashMap;
use std::sync::Arc;

use super::{parse, Command};
use crate::{
    game::{GauntletRequest, QuizEngine, QuizRequest, ScrambleRequest},
    models::{ChannelId, Pacing, UserId},
    session::{Answer, QuizEvent, Session},
    storage::OUTPUT_CHANNEL,
    transport::{retry_on_server_error, CardField, ChannelInfo, RichCard},
};

const HELP_COLOR: u32 = 0xFADE40;

/// A chat message as received from the gateway
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_name: String,
    pub content: String,
    pub author_is_bot: bool,
}

/// Turns chat messages into quiz answers and commands
pub struct Dispatcher {
    engine: Arc<QuizEngine>,
    prefix: String,
    owner_id: Option<UserId>,
    channels: DashMap<ChannelId, ChannelInfo>,
}

impl Dispatcher {
    pub fn new(engine: Arc<QuizEngine>, prefix: impl Into<String>, owner_id: Option<UserId>) -> Self {
        Self {
            engine,
            prefix: prefix.into(),
            owner_id,
            channels: DashMap::new(),
        }
    }

    /// Answers, stops and channel reservations happen right away so they
    /// keep their arrival order. Everything else runs on its own task.
    pub fn dispatch(self: &Arc<Self>, message: IncomingMessage) {
        if message.author_is_bot {
            return;
        }
        let channel = message.channel_id.as_str();
        match parse(&self.prefix, &message.content) {
            Some(Command::Stop) => self.stop(channel),
            Some(command) => {
                tracing::debug!("Command {:?} from {} in {}", command, message.author_name, channel);
                let session = match command.quiz_kind() {
                    Some(kind) => match self.engine.registry().reserve(channel, kind) {
                        Ok(session) => Some(session),
                        Err(e) => {
                            tracing::debug!("Ignoring start: {}", e);
                            return;
                        }
                    },
                    None => None,
                };
                let dispatcher = Arc::clone(self);
                tokio::spawn(async move { dispatcher.execute(command, session, &message).await });
            }
            None => {
                let answer = Answer::new(message.author_id, message.author_name, message.content);
                self.engine.registry().route(channel, QuizEvent::Answer(answer));
            }
        }
    }

    /// Run a command. Quiz commands come with the session reserved for them.
    pub async fn execute(&self, command: Command, session: Option<Session>, message: &IncomingMessage) {
        let channel = message.channel_id.as_str();
        let messenger = self.engine.messenger();

        if command.is_owner_only() && self.owner_id.as_deref() != Some(message.author_id.as_str()) {
            messenger
                .text(
                    channel,
                    &format!("Sorry, only the bot owner can do that, <@{}>.", message.author_id),
                )
                .await;
            return;
        }
        if session.is_some() && !self.is_bot_channel(channel).await {
            tracing::debug!("Ignoring quiz command outside a bot channel");
            return;
        }

        let engine = Arc::clone(&self.engine);
        match (command, session) {
            (
                Command::Quiz {
                    deck,
                    mode,
                    win,
                    pacing,
                },
                Some(session),
            ) => {
                let request = QuizRequest {
                    deck,
                    mode,
                    win,
                    pacing,
                };
                engine.run_quiz(session, request).await;
            }
            (Command::Scramble { difficulty, win }, Some(session)) => {
                let request = ScrambleRequest {
                    difficulty,
                    win,
                    pacing: Pacing::default(),
                };
                engine.run_scramble(session, request).await;
            }
            (Command::Gauntlet { deck }, Some(session)) => {
                let request = GauntletRequest {
                    user_id: message.author_id.clone(),
                    user_name: message.author_name.clone(),
                    deck,
                };
                engine.run_gauntlet(session, request).await;
            }
            (Command::Quiz { .. } | Command::Scramble { .. } | Command::Gauntlet { .. }, None) => {
                tracing::debug!("No channel reserved, not starting a quiz");
            }
            (Command::Help, _) => {
                messenger.card(channel, &self.help_card()).await;
            }
            (Command::List, _) => self.send_list(channel).await,
            (Command::Stop, _) => self.stop(channel),
            (Command::Ongoing, _) => {
                let sessions = self.engine.registry().summary();
                let text = if sessions.is_empty() {
                    "No quizzes running.".to_string()
                } else {
                    let list: Vec<String> = sessions
                        .iter()
                        .map(|s| format!("<#{}> ({:?})", s.channel_id, s.kind))
                        .collect();
                    format!("Ongoing quizzes: {}", list.join(", "))
                };
                messenger.text(channel, &text).await;
            }
            (Command::Reload, _) => match self.engine.decks().reload().await {
                Ok(_) => self.send_list(channel).await,
                Err(e) => {
                    tracing::error!("Failed to reload quiz list: {}", e);
                    messenger.text(channel, "Error: Failed to load quiz list!").await;
                }
            },
            (Command::Output, _) => match self.engine.settings().put(OUTPUT_CHANNEL, channel) {
                Ok(()) => {
                    messenger
                        .text(channel, "Gauntlet score output set to this channel.")
                        .await;
                }
                Err(e) => {
                    tracing::error!("Failed to store output channel: {}", e);
                    messenger.text(channel, "Error: Could not save the setting.").await;
                }
            },
        }
    }

    fn stop(&self, channel: &str) {
        if !self.engine.registry().route(channel, QuizEvent::Stop) {
            tracing::debug!("Stop requested but no quiz is running");
        }
    }

    /// Direct messages and channels named `bot*` only. Lookups are cached.
    async fn is_bot_channel(&self, channel_id: &str) -> bool {
        if let Some(info) = self.channels.get(channel_id) {
            return info.allows_quizzes();
        }
        let transport = self.engine.messenger().transport();
        match retry_on_server_error(|| transport.channel_info(channel_id)).await {
            Ok(info) => {
                let allowed = info.allows_quizzes();
                self.channels.insert(channel_id.to_string(), info);
                allowed
            }
            Err(e) => {
                tracing::error!("Could not look up channel {}: {}", channel_id, e);
                false
            }
        }
    }

    async fn send_list(&self, channel: &str) {
        let ids = self.engine.decks().list_quiz_ids();
        let text = format!(
            "Available quizzes: ```{}```\nUse `{p}quiz <deck> [max score]` to start or `{p}help` for more information.",
            ids.join(", "),
            p = self.prefix
        );
        self.engine.messenger().text(channel, &text).await;
    }

    fn help_card(&self) -> RichCard {
        let p = &self.prefix;
        RichCard {
            title: "Kanji Quiz Bot".to_string(),
            description: Some("Compete with other users on kanji readings!".to_string()),
            color: Some(HELP_COLOR),
            fields: vec![
                CardField::new(
                    "Starting a quiz",
                    format!(
                        "Type `{p}quiz <deck> [max score]` in a #bot channel or by DM.\nUse `{p}stop` to cancel a running quiz."
                    ),
                ),
                CardField::new("Available decks", format!("Use `{p}list` to see every deck.")),
                CardField::new(
                    "Other modes",
                    format!(
                        "`{p}flash/mad/fast/mild/slow <deck>` for other answer windows.\n\
                         `{p}multi <deck>` to score every answer of a question.\n\
                         `{p}gauntlet <deck>` for a solo time trial.\n\
                         `{p}scramble [easy/normal/hard/insane]` for an English word scramble."
                    ),
                ),
                CardField::new(
                    "Review",
                    format!("`{p}quiz review` replays the questions nobody got in the last quiz."),
                ),
            ],
            footer: self.owner_id.as_ref().map(|id| format!("Owner: {id}")),
        }
    }
}
