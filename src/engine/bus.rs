//! Room-based real-time fan-out. The core depends only on the
//! `RealtimeChannel` publish capability; `EventBus` is the in-process
//! implementation used by tests and single-node deployments. A production
//! transport (websocket gateway, message broker) implements the same trait.

use tokio::sync::broadcast;

use crate::error::AppError;

/// Room key namespaces. One room per user, board and team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Room {
    User(String),
    Board(String),
    Team(String),
}

impl Room {
    pub fn key(&self) -> String {
        match self {
            Room::User(id) => format!("user:{id}"),
            Room::Board(id) => format!("board:{id}"),
            Room::Team(id) => format!("team:{id}"),
        }
    }
}

/// An ephemeral event. No acknowledgement, no retry, no delivery guarantee;
/// disconnected clients rely on the persisted notification trail.
#[derive(Debug, Clone)]
pub struct RealtimeEvent {
    pub room: String,
    pub event: String,
    pub payload: serde_json::Value,
}

pub trait RealtimeChannel: Send + Sync {
    fn emit_to_room(
        &self,
        room: &Room,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), AppError>;
}

/// Single broadcast channel; subscribers filter on `RealtimeEvent::room`.
pub struct EventBus {
    tx: broadcast::Sender<RealtimeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl RealtimeChannel for EventBus {
    fn emit_to_room(
        &self,
        room: &Room,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), AppError> {
        // A send error just means nobody is listening right now.
        let _ = self.tx.send(RealtimeEvent {
            room: room.key(),
            event: event.to_string(),
            payload,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_keys_are_namespaced() {
        assert_eq!(Room::User("u1".into()).key(), "user:u1");
        assert_eq!(Room::Board("b1".into()).key(), "board:b1");
        assert_eq!(Room::Team("t1".into()).key(), "team:t1");
    }

    #[test]
    fn subscribers_receive_emitted_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit_to_room(
            &Room::Board("b1".into()),
            "task-created",
            serde_json::json!({"id": "t1"}),
        )
        .unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.room, "board:b1");
        assert_eq!(event.event, "task-created");
        assert_eq!(event.payload["id"], "t1");
    }

    #[test]
    fn emit_without_subscribers_is_fire_and_forget() {
        let bus = EventBus::new(16);
        assert!(bus
            .emit_to_room(&Room::User("u1".into()), "ping", serde_json::Value::Null)
            .is_ok());
    }
}
