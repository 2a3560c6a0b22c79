use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};
use tracing::warn;

use presence_types::{PresenceEvent, RoomId, UserId};

/// One user currently in voice, per the authoritative gateway scan.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentUser {
    pub user_id: UserId,
    pub room_id: RoomId,
}

impl PresentUser {
    pub fn new(user_id: UserId, room_id: impl Into<RoomId>) -> Self {
        Self {
            user_id,
            room_id: room_id.into(),
        }
    }
}

/// On-demand "who is present right now" query against the chat platform.
/// The gateway integration lives outside this engine; reconciliation only
/// needs this one call.
#[async_trait]
pub trait PresenceSource: Send + Sync {
    async fn scan(&self) -> anyhow::Result<Vec<PresentUser>>;
}

/// Gateway stand-in backed by an in-memory presence list, owning the
/// sender side of the presence event channel. The real platform
/// integration replaces this: it answers scans and submits events through
/// the same seam. Dropping the source closes the event loop.
pub struct StaticPresenceSource {
    present: RwLock<Vec<PresentUser>>,
    events: mpsc::UnboundedSender<PresenceEvent>,
}

impl StaticPresenceSource {
    pub fn new(events: mpsc::UnboundedSender<PresenceEvent>) -> Self {
        Self {
            present: RwLock::new(Vec::new()),
            events,
        }
    }

    pub async fn set_present(&self, present: Vec<PresentUser>) {
        *self.present.write().await = present;
    }

    /// Push one event toward the session table's event loop.
    pub fn submit(&self, event: PresenceEvent) {
        if self.events.send(event).is_err() {
            warn!("Presence event loop stopped; dropping event");
        }
    }
}

#[async_trait]
impl PresenceSource for StaticPresenceSource {
    async fn scan(&self) -> anyhow::Result<Vec<PresentUser>> {
        Ok(self.present.read().await.clone())
    }
}
