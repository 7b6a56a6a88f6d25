use serde::Deserialize;
use serde_json::{json, Value};

use crate::{commands::IncomingMessage, session::presence_text};

pub const OP_DISPATCH: u8 = 0;
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_IDENTIFY: u8 = 2;
pub const OP_PRESENCE_UPDATE: u8 = 3;
pub const OP_RECONNECT: u8 = 7;
pub const OP_INVALID_SESSION: u8 = 9;
pub const OP_HELLO: u8 = 10;

const INTENT_GUILD_MESSAGES: u64 = 1 << 9;
const INTENT_DIRECT_MESSAGES: u64 = 1 << 12;
const INTENT_MESSAGE_CONTENT: u64 = 1 << 15;

pub const INTENTS: u64 = INTENT_GUILD_MESSAGES | INTENT_DIRECT_MESSAGES | INTENT_MESSAGE_CONTENT;

/// Envelope of every gateway frame
#[derive(Debug, Deserialize)]
pub struct Payload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    pub s: Option<u64>,
    pub t: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Hello {
    pub heartbeat_interval: u64,
}

#[derive(Debug, Deserialize)]
pub struct Ready {
    pub user: Author,
}

#[derive(Debug, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Deserialize)]
pub struct MessageCreate {
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    pub author: Author,
}

impl From<MessageCreate> for IncomingMessage {
    fn from(message: MessageCreate) -> Self {
        let Author {
            id,
            username,
            global_name,
            bot,
        } = message.author;
        Self {
            channel_id: message.channel_id,
            author_id: id,
            author_name: global_name.unwrap_or(username),
            content: message.content,
            author_is_bot: bot,
        }
    }
}

pub fn identify(token: &str) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": env!("CARGO_PKG_NAME"),
                "device": env!("CARGO_PKG_NAME"),
            },
        },
    })
}

pub fn heartbeat(sequence: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": sequence })
}

/// Presence showing how many quizzes are running, cleared at zero
pub fn presence_update(active_quizzes: usize) -> Value {
    let activities: Vec<Value> = presence_text(active_quizzes)
        .map(|name| json!({ "name": name, "type": 0 }))
        .into_iter()
        .collect();
    json!({
        "op": OP_PRESENCE_UPDATE,
        "d": {
            "since": null,
            "activities": activities,
            "status": "online",
            "afk": false,
        },
    })
}
