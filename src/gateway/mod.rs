pub mod events;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    time::{interval_at, Instant},
};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::{commands::Dispatcher, error::GatewayError};
use events::{
    heartbeat, identify, presence_update, Hello, MessageCreate, Payload, Ready, OP_DISPATCH, OP_HEARTBEAT, OP_HELLO,
    OP_INVALID_SESSION, OP_RECONNECT,
};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Discord gateway client feeding chat messages to the dispatcher
pub struct Gateway {
    url: String,
    token: String,
    dispatcher: Arc<Dispatcher>,
    presence: watch::Receiver<usize>,
}

impl Gateway {
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        dispatcher: Arc<Dispatcher>,
        presence: watch::Receiver<usize>,
    ) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            dispatcher,
            presence,
        }
    }

    /// Stay connected for the life of the process
    pub async fn run(mut self) {
        loop {
            match self.connect().await {
                Ok(()) => tracing::info!("Gateway connection closed"),
                Err(e) => tracing::error!("Gateway connection failed: {}", e),
            }
            tracing::info!("Reconnecting to gateway in {:?}", RECONNECT_DELAY);
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn connect(&mut self) -> Result<(), GatewayError> {
        let (socket, _) = connect_async(self.url.as_str()).await?;
        let (mut sink, mut stream) = socket.split();
        tracing::info!("Connected to gateway");

        let hello = loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    let payload: Payload = serde_json::from_str(&text)?;
                    if payload.op != OP_HELLO {
                        return Err(GatewayError::Protocol(format!("expected HELLO, got op {}", payload.op)));
                    }
                    break serde_json::from_value::<Hello>(payload.d)?;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(GatewayError::Protocol("closed before HELLO".to_string())),
            }
        };
        sink.send(frame(&identify(&self.token))).await?;

        let period = Duration::from_millis(hello.heartbeat_interval);
        let mut heartbeats = interval_at(Instant::now() + period, period);
        let mut sequence = None;

        loop {
            tokio::select! {
                _ = heartbeats.tick() => {
                    sink.send(frame(&heartbeat(sequence))).await?;
                }
                changed = self.presence.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let count = *self.presence.borrow_and_update();
                    sink.send(frame(&presence_update(count))).await?;
                }
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let payload: Payload = serde_json::from_str(&text)?;
                        if payload.s.is_some() {
                            sequence = payload.s;
                        }
                        match payload.op {
                            OP_DISPATCH => {
                                if self.on_dispatch(payload) {
                                    let count = *self.presence.borrow();
                                    sink.send(frame(&presence_update(count))).await?;
                                }
                            }
                            OP_HEARTBEAT => sink.send(frame(&heartbeat(sequence))).await?,
                            OP_RECONNECT | OP_INVALID_SESSION => {
                                tracing::info!("Gateway asked for a new session (op {})", payload.op);
                                return Ok(());
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(close))) => {
                        tracing::info!("Gateway closed the connection: {:?}", close);
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                },
            }
        }
    }

    /// Handle a dispatch event. Returns true once the session is ready.
    fn on_dispatch(&self, payload: Payload) -> bool {
        match payload.t.as_deref() {
            Some("READY") => {
                match serde_json::from_value::<Ready>(payload.d) {
                    Ok(ready) => tracing::info!("Logged in as {} ({})", ready.user.username, ready.user.id),
                    Err(e) => tracing::warn!("Unreadable READY event: {}", e),
                }
                true
            }
            Some("MESSAGE_CREATE") => {
                match serde_json::from_value::<MessageCreate>(payload.d) {
                    Ok(message) => self.dispatcher.dispatch(message.into()),
                    Err(e) => tracing::warn!("Unreadable message event: {}", e),
                }
                false
            }
            _ => false,
        }
    }
}

fn frame(payload: &Value) -> Message {
    Message::text(payload.to_string())
}
