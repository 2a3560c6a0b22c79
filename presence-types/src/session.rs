use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{RoomId, UserId};

/// A user who is (or was recently, within grace) present in a voice room.
/// At most one exists per user at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSession {
    /// Stable identity for the whole session, minted at join and kept
    /// across moves and grace-period reconnects. Reused as the
    /// ClosedSession identity so crediting can be idempotent.
    pub id: Uuid,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat_at: DateTime<Utc>,
    /// Set while the user is in the disconnected-grace window; cleared on
    /// reconnect. The value is `disconnect time + grace window`.
    pub grace_deadline: Option<DateTime<Utc>>,
}

impl ActiveSession {
    pub fn new(user_id: UserId, room_id: RoomId, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            room_id,
            started_at: at,
            last_heartbeat_at: at,
            grace_deadline: None,
        }
    }

    pub fn in_grace(&self) -> bool {
        self.grace_deadline.is_some()
    }
}

/// A finished session, handed to the points engine exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedSession {
    pub id: Uuid,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub credited_minutes: i64,
}

/// Presence lifecycle of a single user. An absent user has no session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Absent,
    Present,
    DisconnectedGrace,
}
