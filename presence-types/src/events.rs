use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{RoomId, UserId};

/// What the gateway told us happened to a user's voice presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PresenceKind {
    /// User appeared in a room.
    Join,
    /// User switched rooms without leaving voice.
    Move,
    /// User left voice deliberately.
    Leave,
    /// Connection dropped; may be a transient glitch.
    Disconnect,
    /// Liveness ping while present.
    Heartbeat,
}

/// One notification from the presence source. `room_id` is `None` for
/// leave/disconnect/heartbeat events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub user_id: UserId,
    pub room_id: Option<RoomId>,
    pub kind: PresenceKind,
    pub at: DateTime<Utc>,
}

impl PresenceEvent {
    pub fn join(user_id: UserId, room_id: RoomId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            room_id: Some(room_id),
            kind: PresenceKind::Join,
            at,
        }
    }

    pub fn moved(user_id: UserId, room_id: RoomId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            room_id: Some(room_id),
            kind: PresenceKind::Move,
            at,
        }
    }

    pub fn leave(user_id: UserId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            room_id: None,
            kind: PresenceKind::Leave,
            at,
        }
    }

    pub fn disconnect(user_id: UserId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            room_id: None,
            kind: PresenceKind::Disconnect,
            at,
        }
    }
}
