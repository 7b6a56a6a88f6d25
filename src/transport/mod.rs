pub mod discord;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use std::{future::Future, sync::Arc, time::Duration};

use crate::error::TransportError;

pub use discord::DiscordTransport;

/// Total tries for a call failing with a server error
pub const MAX_ATTEMPTS: usize = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

pub type MessageId = String;

/// Structured message with a title and named fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichCard {
    pub title: String,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<CardField>,
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl CardField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: String,
    pub name: Option<String>,
    /// Direct or group message channel
    pub is_direct: bool,
}

impl ChannelInfo {
    /// Quizzes may only run in direct messages or channels named `bot*`
    pub fn allows_quizzes(&self) -> bool {
        self.is_direct || self.name.as_deref().is_some_and(|name| name.starts_with("bot"))
    }
}

/// Outgoing side of the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<MessageId, TransportError>;

    async fn send_image(&self, channel_id: &str, png: &[u8], filename: &str) -> Result<MessageId, TransportError>;

    async fn send_rich_card(&self, channel_id: &str, card: &RichCard) -> Result<MessageId, TransportError>;

    async fn edit_text(&self, channel_id: &str, message_id: &str, text: &str) -> Result<(), TransportError>;

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo, TransportError>;
}

/// Run `op` until it succeeds, fails with anything but a server error, or
/// runs out of attempts.
pub async fn retry_on_server_error<T, F, Fut>(mut op: F) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_server_error() && attempt < MAX_ATTEMPTS => {
                tracing::warn!("Attempt {}/{} failed: {}, retrying", attempt, MAX_ATTEMPTS, e);
                tokio::time::sleep(RETRY_DELAY).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Fire-and-forget sending with retries. Failures are logged and the
/// message is dropped.
#[derive(Clone)]
pub struct Messenger {
    transport: Arc<dyn ChatTransport>,
}

impl Messenger {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn ChatTransport> {
        &self.transport
    }

    pub async fn text(&self, channel_id: &str, text: &str) -> Option<MessageId> {
        retry_on_server_error(|| self.transport.send_text(channel_id, text))
            .await
            .map_err(|e| tracing::error!("Could not send message to {}: {}", channel_id, e))
            .ok()
    }

    pub async fn image(&self, channel_id: &str, png: &[u8]) -> Option<MessageId> {
        retry_on_server_error(|| self.transport.send_image(channel_id, png, "question.png"))
            .await
            .map_err(|e| tracing::error!("Could not send image to {}: {}", channel_id, e))
            .ok()
    }

    pub async fn card(&self, channel_id: &str, card: &RichCard) -> Option<MessageId> {
        retry_on_server_error(|| self.transport.send_rich_card(channel_id, card))
            .await
            .map_err(|e| tracing::error!("Could not send card to {}: {}", channel_id, e))
            .ok()
    }

    pub async fn edit(&self, channel_id: &str, message_id: &str, text: &str) {
        if let Err(e) = retry_on_server_error(|| self.transport.edit_text(channel_id, message_id, text)).await {
            tracing::error!("Could not edit message {} in {}: {}", message_id, channel_id, e);
        }
    }
}
