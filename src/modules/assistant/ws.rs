// WebSocket chat endpoint.
//
// Each connection gets a session id and its own Conversation. The socket is
// split so one task drains the outbound channel while the main loop reads
// frames, drives the agent and keeps the connection alive: a ping every
// interval tick, and a close once the peer has been silent past the timeout.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code};
use axum::response::IntoResponse;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt, stream::SplitSink};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::modules::assistant::agent::{AgentError, Conversation, TurnEvent};
use crate::shell::state::AppState;

const OUTBOUND_BUFFER: usize = 128;

/// Registry of live chat sessions.
pub struct ChatSessions {
    sessions: DashMap<String, Instant>,
}

impl ChatSessions {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn register(&self, session_id: &str) {
        self.sessions.insert(session_id.to_string(), Instant::now());
    }

    pub fn deregister(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn active(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for ChatSessions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub query: Option<String>,
    pub resume_value: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SessionId { id: String },
    Interrupt { request: String, field: String },
    Response { text: String },
    End,
    Error { message: String },
}

impl ServerMessage {
    fn into_frame(self) -> Message {
        let text = serde_json::to_string(&self).unwrap_or_else(|_| {
            r#"{"type":"error","message":"serialization failed"}"#.to_string()
        });
        Message::Text(Utf8Bytes::from(text))
    }
}

pub async fn handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| chat_session(socket, state))
}

async fn chat_session(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4().to_string();
    state.chats.register(&session_id);
    info!(%session_id, active = state.chats.active(), "chat session opened");

    let (sink, stream) = socket.split();
    let (tx, rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);

    let mut send_task = tokio::spawn(drain_outbound(sink, rx));
    let mut recv_task = tokio::spawn(receive_loop(
        stream,
        tx,
        state.clone(),
        session_id.clone(),
    ));

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.chats.deregister(&session_id);
    info!(%session_id, active = state.chats.active(), "chat session closed");
}

async fn drain_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Message>,
) {
    while let Some(frame) = rx.recv().await {
        if sink.send(frame).await.is_err() {
            break;
        }
    }
}

async fn receive_loop(
    mut stream: futures::stream::SplitStream<WebSocket>,
    tx: mpsc::Sender<Message>,
    state: AppState,
    session_id: String,
) {
    let greeting = ServerMessage::SessionId {
        id: session_id.clone(),
    };
    if tx.send(greeting.into_frame()).await.is_err() {
        return;
    }

    let mut conversation = Conversation::new();
    let ping_interval = Duration::from_secs(state.settings.ws_ping_interval_secs);
    let idle_timeout = Duration::from_secs(state.settings.ws_ping_timeout_secs);
    let mut ticker = interval(ping_interval);
    ticker.tick().await;
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if last_seen.elapsed() >= idle_timeout {
                    debug!(%session_id, "peer silent past the timeout, closing");
                    let close = Message::Close(Some(CloseFrame {
                        code: close_code::NORMAL,
                        reason: Utf8Bytes::from_static("expired"),
                    }));
                    let _ = tx.send(close).await;
                    break;
                }
                if tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
            frame = stream.next() => {
                let Some(Ok(frame)) = frame else { break };
                last_seen = Instant::now();
                match frame {
                    Message::Text(text) => {
                        if !handle_text(&state, &tx, &mut conversation, &session_id, text.as_str())
                            .await
                        {
                            break;
                        }
                    }
                    Message::Ping(payload) => {
                        if tx.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Binary(_) => {
                        let error = ServerMessage::Error {
                            message: "binary frames are not supported".into(),
                        };
                        if tx.send(error.into_frame()).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                }
            }
        }
    }
}

/// Handles one text frame. Returns false when the session should close.
async fn handle_text(
    state: &AppState,
    tx: &mpsc::Sender<Message>,
    conversation: &mut Conversation,
    session_id: &str,
    raw: &str,
) -> bool {
    let message: ClientMessage = match serde_json::from_str(raw) {
        Ok(message) => message,
        Err(error) => {
            let reply = ServerMessage::Error {
                message: format!("invalid message: {error}"),
            };
            return tx.send(reply.into_frame()).await.is_ok();
        }
    };

    let turn = if message.kind.as_deref() == Some("resume") {
        let value = match message.resume_value {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => {
                let reply = ServerMessage::Error {
                    message: "resume messages need a resume_value".into(),
                };
                return tx.send(reply.into_frame()).await.is_ok();
            }
        };
        state.agent.resume(conversation, value).await
    } else {
        let Some(query) = message.query else {
            let reply = ServerMessage::Error {
                message: "messages need a query".into(),
            };
            return tx.send(reply.into_frame()).await.is_ok();
        };
        state.agent.handle_message(conversation, &query).await
    };

    match turn {
        Ok(events) => {
            for event in events {
                let frame = match event {
                    TurnEvent::Interrupt { field, request } => ServerMessage::Interrupt {
                        request,
                        field: field.wire_name().to_string(),
                    },
                    TurnEvent::Response { text } => ServerMessage::Response { text },
                    TurnEvent::End => ServerMessage::End,
                };
                if tx.send(frame.into_frame()).await.is_err() {
                    return false;
                }
            }
            true
        }
        Err(AgentError::NothingToResume) => {
            let reply = ServerMessage::Error {
                message: AgentError::NothingToResume.to_string(),
            };
            tx.send(reply.into_frame()).await.is_ok()
        }
        Err(AgentError::Model(error)) => {
            warn!(%session_id, %error, "agent turn failed");
            let reply = ServerMessage::Error {
                message: "An unexpected error occurred. Please try again.".into(),
            };
            let _ = tx.send(reply.into_frame()).await;
            false
        }
    }
}

#[cfg(test)]
mod ws_protocol_tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn it_should_tag_server_messages_by_type() {
        let frames = [
            (
                ServerMessage::SessionId { id: "abc".into() },
                json!({ "type": "session_id", "id": "abc" }),
            ),
            (
                ServerMessage::Interrupt {
                    request: "Your first name please".into(),
                    field: "user_Fname".into(),
                },
                json!({
                    "type": "interrupt",
                    "request": "Your first name please",
                    "field": "user_Fname",
                }),
            ),
            (
                ServerMessage::Response { text: "hi".into() },
                json!({ "type": "response", "text": "hi" }),
            ),
            (ServerMessage::End, json!({ "type": "end" })),
        ];
        for (message, expected) in frames {
            let serialized: Value =
                serde_json::from_str(&serde_json::to_string(&message).expect("serialize failed"))
                    .expect("parse failed");
            assert_eq!(serialized, expected);
        }
    }

    #[rstest]
    fn it_should_parse_query_and_resume_client_messages() {
        let query: ClientMessage =
            serde_json::from_str(r#"{"query":"hello"}"#).expect("parse failed");
        assert_eq!(query.query.as_deref(), Some("hello"));
        assert!(query.kind.is_none());

        let resume: ClientMessage =
            serde_json::from_str(r#"{"type":"resume","resume_value":"Pat"}"#)
                .expect("parse failed");
        assert_eq!(resume.kind.as_deref(), Some("resume"));
        assert_eq!(resume.resume_value, Some(json!("Pat")));
    }

    #[rstest]
    fn it_should_track_registered_sessions() {
        let sessions = ChatSessions::new();
        sessions.register("s-1");
        sessions.register("s-2");
        assert_eq!(sessions.active(), 2);
        sessions.deregister("s-1");
        assert_eq!(sessions.active(), 1);
    }
}
