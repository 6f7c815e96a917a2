//! Dispatch event types and the event bus
//!
//! Every dispatcher transition publishes a [`DispatchEvent`]. Events are
//! serialized for the SSE stream; publishing never blocks or fails a
//! transition.

use crate::duck::DuckPercent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Announcement lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DispatchEvent {
    /// Player process launched for a button (or an ad-hoc file)
    AnnouncementStarted {
        session_id: Uuid,
        /// Originating button, `None` for ad-hoc plays
        slot: Option<usize>,
        label: String,
        file: String,
        duck: DuckPercent,
        process_id: u32,
        timestamp: DateTime<Utc>,
    },

    /// Session ended by an explicit Stop
    AnnouncementStopped {
        session_id: Uuid,
        slot: Option<usize>,
        process_id: u32,
        timestamp: DateTime<Utc>,
    },

    /// Session killed to make room for a newer Play
    AnnouncementPreempted {
        session_id: Uuid,
        slot: Option<usize>,
        process_id: u32,
        timestamp: DateTime<Utc>,
    },

    /// Player exited on its own (observed on the next command or status query)
    AnnouncementFinished {
        session_id: Uuid,
        slot: Option<usize>,
        process_id: u32,
        exit_code: Option<i32>,
        timestamp: DateTime<Utc>,
    },

    /// A Play or Stop command failed
    AnnouncementFailed {
        slot: Option<usize>,
        /// Machine-readable error code
        error: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl DispatchEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            DispatchEvent::AnnouncementStarted { .. } => "AnnouncementStarted",
            DispatchEvent::AnnouncementStopped { .. } => "AnnouncementStopped",
            DispatchEvent::AnnouncementPreempted { .. } => "AnnouncementPreempted",
            DispatchEvent::AnnouncementFinished { .. } => "AnnouncementFinished",
            DispatchEvent::AnnouncementFailed { .. } => "AnnouncementFailed",
        }
    }
}

/// Broadcast bus for [`DispatchEvent`]s
///
/// Uses `tokio::sync::broadcast`: publishing never waits on subscribers, and
/// slow subscribers observe a lag instead of blocking producers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DispatchEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DispatchEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_harmless() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit_lossy(DispatchEvent::AnnouncementFailed {
            slot: Some(0),
            error: "NoFileAssigned".to_string(),
            message: "No audio file assigned to this button".to_string(),
            timestamp: Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        let session_id = Uuid::new_v4();

        bus.emit_lossy(DispatchEvent::AnnouncementStopped {
            session_id,
            slot: Some(2),
            process_id: 4242,
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            DispatchEvent::AnnouncementStopped { session_id: id, slot, .. } => {
                assert_eq!(id, session_id);
                assert_eq!(slot, Some(2));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_serialized_with_type_tag() {
        let event = DispatchEvent::AnnouncementFinished {
            session_id: Uuid::nil(),
            slot: None,
            process_id: 7,
            exit_code: Some(0),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "AnnouncementFinished");
        assert_eq!(json["exit_code"], 0);
        assert_eq!(event.event_type(), "AnnouncementFinished");
    }
}
