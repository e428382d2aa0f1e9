//! Live websocket fanout.
//!
//! The broadcaster owns the set of connected dashboard subscribers.
//! Each subscriber gets a bounded event queue drained by its own socket
//! task, so one slow or dead client never stalls ingestion or the other
//! subscribers. A failed delivery (queue full or receiver gone) removes
//! the subscriber from the live set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use crowdshield_core::LiveEvent;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};

use crate::state::AppState;

pub type SubscriberId = u64;

pub struct LiveBroadcaster {
    next_id: AtomicU64,
    queue_depth: usize,
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<LiveEvent>>>,
}

impl LiveBroadcaster {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            queue_depth,
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new subscriber. Called after the websocket handshake
    /// has completed; the returned receiver is drained by the socket task.
    pub async fn connect(&self) -> (SubscriberId, mpsc::Receiver<LiveEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_depth);
        self.subscribers.write().await.insert(id, tx);
        tracing::info!(subscriber_id = id, "live subscriber connected");
        (id, rx)
    }

    /// Remove a subscriber. Idempotent.
    pub async fn disconnect(&self, id: SubscriberId) {
        if self.subscribers.write().await.remove(&id).is_some() {
            tracing::info!(subscriber_id = id, "live subscriber disconnected");
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Deliver `event` to every current subscriber. Delivery is a
    /// non-blocking enqueue; subscribers whose queue is full or whose
    /// socket task is gone are pruned, and the broadcast continues to
    /// the rest.
    pub async fn broadcast(&self, event: &LiveEvent) {
        let snapshot: Vec<(SubscriberId, mpsc::Sender<LiveEvent>)> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        let mut failed = Vec::new();
        for (id, tx) in snapshot {
            if tx.try_send(event.clone()).is_err() {
                failed.push(id);
            }
        }

        for id in failed {
            tracing::warn!(subscriber_id = id, "dropping unresponsive live subscriber");
            self.disconnect(id).await;
        }
    }
}

/// `GET /ws/live` upgrade handler.
pub async fn ws_live(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (id, mut events) = state.broadcaster.connect().await;
    let (mut sink, mut inbound) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!("live event serialization failed: {}", e);
                        continue;
                    }
                };
                if sink.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            // Client traffic is keep-alive only; anything other than a
            // liveness frame ends the connection.
            msg = inbound.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.broadcaster.disconnect(id).await;
}
