//! Realtime fan-out of monitoring events to subscribed connections.
//!
//! Subscriptions are keyed per user; one user may hold several open
//! connections (phone, guardian dashboard). Delivery is at-least-once
//! to every open subscription; a closed or broken connection is pruned
//! lazily on the next send rather than treated as an error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::message::{RealtimeMessage, RealtimePayload};
use crate::domain::UserId;
use crate::Result;

/// Heartbeat ping period.
pub const HEARTBEAT_SECS: u64 = 30;
/// A connection silent for longer than this is force-closed.
pub const INACTIVITY_LIMIT_SECS: i64 = 120;

/// Identifier for one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    fn next() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Outbound transport for one connection. The websocket layer adapts
/// its sender half to this; tests use in-memory recorders.
#[async_trait]
pub trait ConnectionSink: Send + Sync {
    /// Send one serialized message. An error marks the connection dead.
    async fn send(&self, message: &RealtimeMessage) -> Result<()>;

    /// Whether the underlying transport is still open.
    fn is_open(&self) -> bool;

    /// Ask the transport to close. Best effort.
    async fn close(&self);
}

struct Subscription {
    user_id: UserId,
    sink: Arc<dyn ConnectionSink>,
    last_active: DateTime<Utc>,
}

/// Shared registry of realtime subscriptions.
///
/// The subscription map is the only state shared between connection
/// handlers; sinks are cloned out of the lock before any await so a
/// slow transport never holds the registry.
#[derive(Default)]
pub struct BroadcastManager {
    subscriptions: RwLock<HashMap<ConnectionId, Subscription>>,
}

impl BroadcastManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user's events and confirm the
    /// subscription over the new connection.
    pub async fn subscribe(&self, user_id: UserId, sink: Arc<dyn ConnectionSink>) -> ConnectionId {
        let id = ConnectionId::next();
        self.subscriptions.write().insert(
            id,
            Subscription {
                user_id,
                sink: sink.clone(),
                last_active: Utc::now(),
            },
        );
        info!(connection = %id, user_id = %user_id, "realtime subscription opened");

        let confirmation = RealtimeMessage::now(RealtimePayload::ConnectionStatus {
            status: "connected".to_string(),
            message: format!("subscribed to updates for user {user_id}"),
        });
        if let Err(err) = sink.send(&confirmation).await {
            warn!(connection = %id, error = %err, "connection died before confirmation");
            self.unsubscribe(id).await;
        }
        id
    }

    /// Remove a subscription. A no-op for unknown ids.
    pub async fn unsubscribe(&self, id: ConnectionId) {
        // Drop the write guard before closing; the close may suspend.
        let removed = self.subscriptions.write().remove(&id);
        if let Some(sub) = removed {
            info!(connection = %id, user_id = %sub.user_id, "realtime subscription closed");
            sub.sink.close().await;
        }
    }

    /// Record inbound traffic on a connection, deferring its
    /// inactivity deadline.
    pub fn touch(&self, id: ConnectionId) {
        if let Some(sub) = self.subscriptions.write().get_mut(&id) {
            sub.last_active = Utc::now();
        }
    }

    /// Fan a message out to every open connection of `user_id`.
    /// Returns the number of successful deliveries. Dead connections
    /// are pruned, never reported as errors.
    pub async fn publish(&self, user_id: UserId, payload: RealtimePayload) -> usize {
        let message = RealtimeMessage::now(payload);
        let targets: Vec<(ConnectionId, Arc<dyn ConnectionSink>)> = {
            let subs = self.subscriptions.read();
            subs.iter()
                .filter(|(_, sub)| sub.user_id == user_id)
                .map(|(id, sub)| (*id, sub.sink.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, sink) in targets {
            if !sink.is_open() {
                dead.push(id);
                continue;
            }
            match sink.send(&message).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    debug!(connection = %id, error = %err, "send to dead connection, pruning");
                    dead.push(id);
                }
            }
        }
        for id in dead {
            self.unsubscribe(id).await;
        }
        delivered
    }

    /// Number of open subscriptions for a user.
    pub fn connection_count(&self, user_id: UserId) -> usize {
        self.subscriptions
            .read()
            .values()
            .filter(|sub| sub.user_id == user_id)
            .count()
    }

    /// Total open subscriptions.
    pub fn total_connections(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// One heartbeat round: ping every connection and force-close any
    /// that has been silent past the inactivity limit.
    pub async fn heartbeat_round(&self) {
        let now = Utc::now();
        let (stale, live): (Vec<_>, Vec<_>) = {
            let subs = self.subscriptions.read();
            let mut stale = Vec::new();
            let mut live = Vec::new();
            for (id, sub) in subs.iter() {
                let idle = (now - sub.last_active).num_seconds();
                if idle > INACTIVITY_LIMIT_SECS {
                    stale.push(*id);
                } else {
                    live.push((*id, sub.sink.clone()));
                }
            }
            (stale, live)
        };

        for id in stale {
            warn!(connection = %id, "connection inactive past limit, closing");
            self.unsubscribe(id).await;
        }

        let ping = RealtimeMessage::now(RealtimePayload::Ping);
        let mut dead = Vec::new();
        for (id, sink) in live {
            if sink.send(&ping).await.is_err() {
                dead.push(id);
            }
        }
        for id in dead {
            self.unsubscribe(id).await;
        }
    }

    /// Spawn the periodic heartbeat task. The task runs until aborted
    /// via the returned handle.
    pub fn spawn_heartbeat(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(HEARTBEAT_SECS));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.heartbeat_round().await;
            }
        })
    }
}
