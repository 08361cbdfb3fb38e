//! Room-scoped pub/sub relay for chat messages and lifecycle notifications.
//!
//! Nothing here is persisted and delivery is best-effort to currently
//! connected subscribers only; a publish with no listeners is dropped
//! silently, and delivery failure is never surfaced to the request that
//! triggered the event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::marketplace::identity::UserId;
use crate::marketplace::posts::{ApplicationStatus, PostId};

/// Room that every connected client implicitly listens to for new posts.
pub const BROADCAST_ROOM: &str = "marketplace";

const ROOM_CAPACITY: usize = 64;

pub fn guardian_room(id: UserId) -> String {
    format!("guardian_{id}")
}

pub fn tutor_room(id: UserId) -> String {
    format!("tutor_{id}")
}

/// Lifecycle events the post service emits through the relay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MarketplaceEvent {
    NewTuitionPost {
        post_id: PostId,
        title: String,
    },
    NewApplication {
        post_id: PostId,
        guardian_id: UserId,
        tutor_id: UserId,
    },
    ApplicationStatusUpdate {
        post_id: PostId,
        tutor_id: UserId,
        status: ApplicationStatus,
    },
}

impl MarketplaceEvent {
    /// The room this event is addressed to; `None` means broadcast to all.
    pub fn room(&self) -> Option<String> {
        match self {
            MarketplaceEvent::NewTuitionPost { .. } => None,
            MarketplaceEvent::NewApplication { guardian_id, .. } => {
                Some(guardian_room(*guardian_id))
            }
            MarketplaceEvent::ApplicationStatusUpdate { tutor_id, .. } => {
                Some(tutor_room(*tutor_id))
            }
        }
    }
}

/// Outbound notification hook the post service depends on. Infallible by
/// contract: implementations swallow and log delivery problems.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: MarketplaceEvent);
}

/// In-process fan-out keyed by opaque room identifiers, one broadcast
/// channel per room. Rooms are created on first touch and never reaped;
/// the id space is bounded by users and chats actually used.
#[derive(Default)]
pub struct RoomRelay {
    rooms: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl RoomRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, room: &str) -> broadcast::Receiver<String> {
        let mut rooms = self.rooms.lock().expect("relay mutex poisoned");
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Best-effort delivery; a room with no subscribers drops the frame.
    pub fn publish_to(&self, room: &str, frame: String) {
        let sender = {
            let rooms = self.rooms.lock().expect("relay mutex poisoned");
            rooms.get(room).cloned()
        };
        match sender {
            Some(sender) => {
                if sender.send(frame).is_err() {
                    debug!(room, "relay frame dropped: no live subscribers");
                }
            }
            None => debug!(room, "relay frame dropped: room never joined"),
        }
    }
}

impl EventPublisher for RoomRelay {
    fn publish(&self, event: MarketplaceEvent) {
        let room = event.room().unwrap_or_else(|| BROADCAST_ROOM.to_string());
        match serde_json::to_string(&event) {
            Ok(frame) => self.publish_to(&room, frame),
            Err(error) => debug!(%error, "relay event serialization failed"),
        }
    }
}

/// Frames a websocket client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    JoinRoom {
        room: String,
    },
    SendMessage {
        room: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

/// Router exposing the websocket relay endpoint.
pub fn relay_router(relay: Arc<RoomRelay>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(relay)
}

async fn ws_handler(State(relay): State<Arc<RoomRelay>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, relay))
}

async fn client_session(socket: WebSocket, relay: Arc<RoomRelay>) {
    let (mut sink, mut stream) = socket.split();

    // All room subscriptions funnel through one channel so a single task
    // owns the socket sink.
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    // Every client hears broadcast events without an explicit join.
    spawn_room_forwarder(&relay, BROADCAST_ROOM, outbound.clone());

    while let Some(Ok(message)) = stream.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(frame) = serde_json::from_str::<ClientFrame>(&text) else {
            debug!("discarding malformed relay frame");
            continue;
        };
        match frame {
            ClientFrame::JoinRoom { room } => {
                spawn_room_forwarder(&relay, &room, outbound.clone());
            }
            ClientFrame::SendMessage { room, payload } => {
                let frame = json!({
                    "event": "receive_message",
                    "room": room,
                    "payload": payload,
                });
                relay.publish_to(&room, frame.to_string());
            }
        }
    }

    // Dropping the writer tears down every forwarder on its next send.
    writer.abort();
}

fn spawn_room_forwarder(
    relay: &Arc<RoomRelay>,
    room: &str,
    outbound: mpsc::UnboundedSender<String>,
) {
    let mut receiver = relay.subscribe(room);
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(frame) => {
                    if outbound.send(frame).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscribed_room_receives_published_frames() {
        let relay = RoomRelay::new();
        let mut receiver = relay.subscribe("guardian_abc");
        relay.publish_to("guardian_abc", "hello".to_string());
        let frame = receiver.recv().await.expect("frame delivered");
        assert_eq!(frame, "hello");
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let relay = RoomRelay::new();
        relay.publish_to("tutor_missing", "dropped".to_string());
    }

    #[tokio::test]
    async fn lifecycle_events_route_to_expected_rooms() {
        let relay = RoomRelay::new();
        let guardian = UserId(Uuid::new_v4());
        let tutor = UserId(Uuid::new_v4());
        let post_id = PostId(Uuid::new_v4());

        let mut lobby = relay.subscribe(BROADCAST_ROOM);
        let mut guardian_rx = relay.subscribe(&guardian_room(guardian));
        let mut tutor_rx = relay.subscribe(&tutor_room(tutor));

        relay.publish(MarketplaceEvent::NewTuitionPost {
            post_id,
            title: "Algebra tutor needed".to_string(),
        });
        relay.publish(MarketplaceEvent::NewApplication {
            post_id,
            guardian_id: guardian,
            tutor_id: tutor,
        });
        relay.publish(MarketplaceEvent::ApplicationStatusUpdate {
            post_id,
            tutor_id: tutor,
            status: ApplicationStatus::Accepted,
        });

        let lobby_frame = lobby.recv().await.expect("broadcast frame");
        assert!(lobby_frame.contains("new_tuition_post"));

        let guardian_frame = guardian_rx.recv().await.expect("guardian frame");
        assert!(guardian_frame.contains("new_application"));

        let tutor_frame = tutor_rx.recv().await.expect("tutor frame");
        assert!(tutor_frame.contains("application_status_update"));
        assert!(tutor_frame.contains("accepted"));
    }
}
