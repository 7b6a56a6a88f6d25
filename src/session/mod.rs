use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        watch,
    },
    time::Instant,
};

use crate::{
    error::SessionError,
    models::{ChannelId, UserId},
};

/// Capacity of each quiz's event buffer
pub const EVENT_BUFFER: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizKind {
    Standard,
    Multi,
    Scramble,
    Gauntlet,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub channel_id: ChannelId,
    pub kind: QuizKind,
    pub started_at: DateTime<Utc>,
}

/// A chat message forwarded to a running quiz
#[derive(Debug, Clone)]
pub struct Answer {
    pub user_id: UserId,
    pub user_name: String,
    pub text: String,
    pub received_at: Instant,
}

impl Answer {
    pub fn new(user_id: impl Into<UserId>, user_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            text: text.into(),
            received_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum QuizEvent {
    Answer(Answer),
    Stop,
}

/// Tracks the running quiz of every channel and routes chat events to it.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ChannelId, SessionInfo>>,
    routes: DashMap<ChannelId, mpsc::Sender<QuizEvent>>,
    presence: watch::Sender<usize>,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        let (presence, _) = watch::channel(0);
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            routes: DashMap::new(),
            presence,
        })
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<ChannelId, SessionInfo>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim a channel for a new quiz. Events routed to the channel queue up
    /// in the returned session from this point on, and dropping the session
    /// frees the channel.
    pub fn reserve(self: &Arc<Self>, channel_id: &str, kind: QuizKind) -> Result<Session, SessionError> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let count = {
            let mut sessions = self.sessions();
            if sessions.contains_key(channel_id) {
                return Err(SessionError::AlreadyActive(channel_id.to_string()));
            }
            sessions.insert(
                channel_id.to_string(),
                SessionInfo {
                    channel_id: channel_id.to_string(),
                    kind,
                    started_at: Utc::now(),
                },
            );
            self.routes.insert(channel_id.to_string(), tx.clone());
            sessions.len()
        };
        self.publish(count);
        tracing::info!("Reserved channel {} for a {:?} quiz", channel_id, kind);

        Ok(Session {
            registry: Arc::clone(self),
            channel_id: channel_id.to_string(),
            sender: tx,
            rx,
        })
    }

    /// Free a channel. Releasing an idle channel does nothing.
    pub fn release(&self, channel_id: &str) {
        let released = {
            let mut sessions = self.sessions();
            sessions.remove(channel_id).map(|_| sessions.len())
        };
        if let Some(count) = released {
            self.publish(count);
            tracing::info!("Released channel {}", channel_id);
        }
    }

    #[cfg(test)]
    pub fn is_active(&self, channel_id: &str) -> bool {
        self.sessions().contains_key(channel_id)
    }

    /// Active sessions, oldest first
    pub fn summary(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self.sessions().values().cloned().collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    fn publish(&self, count: usize) {
        self.presence.send_replace(count);
    }

    /// Live count of active quizzes
    pub fn presence(&self) -> watch::Receiver<usize> {
        self.presence.subscribe()
    }

    /// Hand an event to the channel's quiz. Returns false if nobody took it.
    pub fn route(&self, channel_id: &str, event: QuizEvent) -> bool {
        let Some(tx) = self.routes.get(channel_id).map(|tx| tx.clone()) else {
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Event buffer full for channel {}, dropping event", channel_id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Presence line for a number of running quizzes
pub fn presence_text(count: usize) -> Option<String> {
    match count {
        0 => None,
        1 => Some("1 quiz".to_string()),
        n => Some(format!("{n} quizzes")),
    }
}

/// A reserved channel and the queue of events routed to it
pub struct Session {
    registry: Arc<SessionRegistry>,
    channel_id: ChannelId,
    sender: mpsc::Sender<QuizEvent>,
    rx: mpsc::Receiver<QuizEvent>,
}

impl Session {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub async fn recv(&mut self) -> Option<QuizEvent> {
        self.rx.recv().await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // only remove our own route, a newer session may have replaced it
        self.registry
            .routes
            .remove_if(&self.channel_id, |_, tx| tx.same_channel(&self.sender));
        self.registry.release(&self.channel_id);
    }
}
