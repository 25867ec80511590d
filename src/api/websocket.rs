//! WebSocket endpoint bridging the signal feed and the broadcast
//! manager.
//!
//! Clients connect to `/ws?userId=N`. Inbound text frames are
//! [`SignalFeed`] JSON messages and drive the evaluation pipeline;
//! outbound frames are [`RealtimeMessage`] envelopes fanned out by the
//! [`BroadcastManager`], including heartbeat pings.
//!
//! [`SignalFeed`]: crate::domain::message::SignalFeed
//! [`RealtimeMessage`]: crate::domain::message::RealtimeMessage
//! [`BroadcastManager`]: crate::realtime::BroadcastManager

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::state::AppState;
use crate::domain::message::{RealtimeMessage, SignalFeed};
use crate::domain::UserId;
use crate::realtime::ConnectionSink;
use crate::{HeartwatchError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    user_id: i64,
}

/// `GET /ws?userId=N`
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = UserId(query.user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

/// Adapts the send half of a websocket to the broadcast manager's
/// sink contract.
struct WsSink {
    sender: Mutex<SplitSink<WebSocket, Message>>,
    open: AtomicBool,
}

impl WsSink {
    fn new(sender: SplitSink<WebSocket, Message>) -> Arc<Self> {
        Arc::new(Self {
            sender: Mutex::new(sender),
            open: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl ConnectionSink for WsSink {
    async fn send(&self, message: &RealtimeMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        let mut sender = self.sender.lock().await;
        sender.send(Message::Text(json)).await.map_err(|err| {
            self.open.store(false, Ordering::SeqCst);
            HeartwatchError::Delivery(err.to_string())
        })
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let mut sender = self.sender.lock().await;
            let _ = sender.send(Message::Close(None)).await;
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: UserId) {
    let (sender, mut receiver) = socket.split();
    let sink = WsSink::new(sender);
    let connection = state.broadcast().subscribe(user_id, sink).await;

    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                debug!(connection = %connection, error = %err, "websocket receive error");
                break;
            }
        };

        state.broadcast().touch(connection);
        match message {
            Message::Text(text) => match serde_json::from_str::<SignalFeed>(&text) {
                Ok(feed) if feed.user_id() == user_id => {
                    state.ingest(feed).await;
                }
                Ok(feed) => {
                    warn!(
                        connection = %connection,
                        claimed = %feed.user_id(),
                        authorized = %user_id,
                        "feed message for another user rejected"
                    );
                }
                Err(err) => {
                    debug!(connection = %connection, error = %err, "unparseable feed message");
                }
            },
            Message::Close(_) => break,
            // Pings are answered by axum; pongs just refresh activity
            _ => {}
        }
    }

    info!(connection = %connection, user_id = %user_id, "websocket session ended");
    state.connection_closed(connection, user_id).await;
}
