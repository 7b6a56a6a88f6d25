use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    RequestBuilder,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use super::{ChannelInfo, ChatTransport, MessageId, RichCard};
use crate::error::TransportError;

/// Discord channel types that are private conversations
const DM_CHANNEL_TYPES: [u8; 2] = [1, 3];

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    id: String,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: u8,
}

/// Discord REST API v10 client authenticated as a bot
pub struct DiscordTransport {
    http_client: reqwest::Client,
    api_url: String,
    token: String,
}

impl DiscordTransport {
    pub fn new(http_client: reqwest::Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}/messages", self.api_url, channel_id)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TransportError> {
        let response = request
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        Ok(response.json::<T>().await?)
    }

    async fn post_message(&self, channel_id: &str, payload: &Value) -> Result<MessageId, TransportError> {
        let message: MessageResponse = self
            .call(self.http_client.post(self.messages_url(channel_id)).json(payload))
            .await?;
        Ok(message.id)
    }
}

/// Discord embed object for a rich card
fn embed(card: &RichCard) -> Value {
    let fields: Vec<Value> = card
        .fields
        .iter()
        .map(|field| {
            json!({
                "name": field.name,
                "value": field.value,
                "inline": field.inline,
            })
        })
        .collect();

    let mut embed = json!({
        "title": card.title,
        "fields": fields,
    });
    if let Some(description) = &card.description {
        embed["description"] = json!(description);
    }
    if let Some(color) = card.color {
        embed["color"] = json!(color);
    }
    if let Some(footer) = &card.footer {
        embed["footer"] = json!({ "text": footer });
    }
    embed
}

#[async_trait]
impl ChatTransport for DiscordTransport {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<MessageId, TransportError> {
        self.post_message(channel_id, &json!({ "content": text })).await
    }

    async fn send_image(&self, channel_id: &str, png: &[u8], filename: &str) -> Result<MessageId, TransportError> {
        let file = Part::bytes(png.to_vec())
            .file_name(filename.to_string())
            .mime_str("image/png")?;
        let form = Form::new().part("files[0]", file);

        let message: MessageResponse = self
            .call(self.http_client.post(self.messages_url(channel_id)).multipart(form))
            .await?;
        Ok(message.id)
    }

    async fn send_rich_card(&self, channel_id: &str, card: &RichCard) -> Result<MessageId, TransportError> {
        self.post_message(channel_id, &json!({ "embeds": [embed(card)] }))
            .await
    }

    async fn edit_text(&self, channel_id: &str, message_id: &str, text: &str) -> Result<(), TransportError> {
        let url = format!("{}/{}", self.messages_url(channel_id), message_id);
        let _: MessageResponse = self
            .call(self.http_client.patch(url).json(&json!({ "content": text })))
            .await?;
        Ok(())
    }

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo, TransportError> {
        let url = format!("{}/channels/{}", self.api_url, channel_id);
        let channel: ChannelResponse = self.call(self.http_client.get(url)).await?;
        Ok(ChannelInfo {
            id: channel.id,
            name: channel.name,
            is_direct: DM_CHANNEL_TYPES.contains(&channel.kind),
        })
    }
}
