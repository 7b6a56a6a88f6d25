use async_trait::async_trait;
use reqwest::StatusCode;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use super::{ChannelInfo, ChatTransport, MessageId, RichCard};
use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Image(usize),
    Card(RichCard),
    Edit { message_id: MessageId, text: String },
}

/// Transport that keeps everything it is asked to send
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, Outgoing)>>,
    channels: Mutex<HashMap<String, ChannelInfo>>,
    next_id: AtomicUsize,
    failures: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls fail with a 502
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn set_channel(&self, info: ChannelInfo) {
        self.channels.lock().unwrap().insert(info.id.clone(), info);
    }

    fn record(&self, channel_id: &str, outgoing: Outgoing) -> Result<MessageId, TransportError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Status {
                status: StatusCode::BAD_GATEWAY,
                body: "unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push((channel_id.to_string(), outgoing));
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst).to_string())
    }

    pub fn sent(&self, channel_id: &str) -> Vec<Outgoing> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(channel, _)| channel == channel_id)
            .map(|(_, outgoing)| outgoing.clone())
            .collect()
    }

    pub fn texts(&self, channel_id: &str) -> Vec<String> {
        self.sent(channel_id)
            .into_iter()
            .filter_map(|outgoing| match outgoing {
                Outgoing::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn cards(&self, channel_id: &str) -> Vec<RichCard> {
        self.sent(channel_id)
            .into_iter()
            .filter_map(|outgoing| match outgoing {
                Outgoing::Card(card) => Some(card),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<MessageId, TransportError> {
        self.record(channel_id, Outgoing::Text(text.to_string()))
    }

    async fn send_image(&self, channel_id: &str, png: &[u8], _filename: &str) -> Result<MessageId, TransportError> {
        self.record(channel_id, Outgoing::Image(png.len()))
    }

    async fn send_rich_card(&self, channel_id: &str, card: &RichCard) -> Result<MessageId, TransportError> {
        self.record(channel_id, Outgoing::Card(card.clone()))
    }

    async fn edit_text(&self, channel_id: &str, message_id: &str, text: &str) -> Result<(), TransportError> {
        self.record(
            channel_id,
            Outgoing::Edit {
                message_id: message_id.to_string(),
                text: text.to_string(),
            },
        )
        .map(|_| ())
    }

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo, TransportError> {
        let known = self.channels.lock().unwrap().get(channel_id).cloned();
        Ok(known.unwrap_or_else(|| ChannelInfo {
            id: channel_id.to_string(),
            name: Some("bot-test".to_string()),
            is_direct: false,
        }))
    }
}
