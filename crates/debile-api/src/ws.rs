//! WebSocket streaming of lifecycle events.
//!
//! A connection receives every event until it subscribes to a category;
//! from then on only subscribed categories are forwarded.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use debile_core::{Event, EventCategory};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let events = state.events.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, events))
}

async fn handle_socket(socket: WebSocket, mut events: broadcast::Receiver<Event>) {
    info!("WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let mut filter = Filter::default();

    loop {
        let reply = tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => filter.apply(&text),
                Some(Ok(Message::Close(_))) | None => {
                    info!("WebSocket connection closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    break;
                }
                Some(Ok(_)) => None,
            },
            event = events.recv() => match event {
                Ok(event) if filter.matches(event.category) => {
                    Some(WsMessage::Event { event })
                }
                Ok(_) => None,
                Err(RecvError::Lagged(skipped)) => Some(WsMessage::Lagged { skipped }),
                Err(RecvError::Closed) => break,
            },
        };

        let Some(reply) = reply else { continue };
        match serde_json::to_string(&reply) {
            Ok(json) => {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    debug!("WebSocket peer went away");
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode WebSocket message"),
        }
    }
}

/// Categories a connection asked for; empty means everything.
#[derive(Debug, Default)]
struct Filter {
    channels: HashSet<EventCategory>,
}

impl Filter {
    fn matches(&self, category: EventCategory) -> bool {
        self.channels.is_empty() || self.channels.contains(&category)
    }

    fn apply(&mut self, text: &str) -> Option<WsMessage> {
        let cmd = match serde_json::from_str::<WsCommand>(text) {
            Ok(cmd) => cmd,
            Err(e) => {
                return Some(WsMessage::Error {
                    message: format!("invalid command: {}", e),
                });
            }
        };

        match cmd {
            WsCommand::Subscribe { channel } => match channel.parse::<EventCategory>() {
                Ok(category) => {
                    info!(channel = %channel, "Client subscribed");
                    self.channels.insert(category);
                    Some(WsMessage::Subscribed { channel })
                }
                Err(e) => Some(WsMessage::Error {
                    message: e.to_string(),
                }),
            },
            WsCommand::Unsubscribe { channel } => {
                info!(channel = %channel, "Client unsubscribed");
                if let Ok(category) = channel.parse::<EventCategory>() {
                    self.channels.remove(&category);
                }
                Some(WsMessage::Unsubscribed { channel })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsCommand {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsMessage {
    Subscribed { channel: String },
    Unsubscribed { channel: String },
    Event { event: Event },
    Lagged { skipped: u64 },
    Error { message: String },
}
