use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::presence::PresentUser;
use presence_core::{
    GracePolicy, begin_grace, clear_grace, close_expired, close_session, grace_expired,
};
use presence_types::{
    ActiveSession, ClosedSession, PresenceEvent, PresenceKind, RoomId, SessionPhase, UserId,
};

/// What reconcile did, for startup logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub opened: usize,
    pub resumed: usize,
    pub closed: usize,
}

type Slot = Arc<Mutex<Option<ActiveSession>>>;

/// The in-memory table of who is present, since when, where.
///
/// One slot per user; every mutation takes only that user's lock, so a
/// burst of unrelated joins never serializes. Slots stay in the map once
/// created (an absent user is a slot holding `None`) so that a stale slot
/// handle can never race a fresh insertion for the same user.
pub struct SessionTable {
    slots: DashMap<UserId, Slot>,
    policy: GracePolicy,
    closed_tx: mpsc::UnboundedSender<ClosedSession>,
}

impl SessionTable {
    pub fn new(policy: GracePolicy, closed_tx: mpsc::UnboundedSender<ClosedSession>) -> Self {
        Self {
            slots: DashMap::new(),
            policy,
            closed_tx,
        }
    }

    fn slot(&self, user_id: UserId) -> Slot {
        // Clone the Arc out of the shard before locking: slot locks are
        // held across awaits and must not pin a dashmap shard.
        self.slots
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    fn hand_off(&self, closed: ClosedSession) {
        debug!(
            "Closed session {} for user {}: {} credited minutes",
            closed.id, closed.user_id, closed.credited_minutes
        );
        if self.closed_tx.send(closed).is_err() {
            warn!("Points engine channel closed; dropping closed session");
        }
    }

    /// A join either opens a fresh session or, for a user still inside the
    /// grace window, resumes the existing one with `started_at` untouched.
    pub async fn on_join(&self, user_id: UserId, room_id: RoomId, at: DateTime<Utc>) {
        let slot = self.slot(user_id);
        let mut guard = slot.lock().await;
        match guard.as_mut() {
            None => {
                *guard = Some(ActiveSession::new(user_id, room_id, at));
            }
            Some(session) if session.in_grace() => {
                clear_grace(session, at);
                session.room_id = room_id;
            }
            Some(session) => {
                // Duplicate join while present: trust the newer room
                session.room_id = room_id;
                session.last_heartbeat_at = at;
            }
        }
    }

    /// Room changes never close or reopen a session.
    pub async fn on_move(&self, user_id: UserId, new_room_id: RoomId, at: DateTime<Utc>) {
        let slot = self.slot(user_id);
        let mut guard = slot.lock().await;
        match guard.as_mut() {
            Some(session) => {
                if session.in_grace() {
                    // A move proves presence; the disconnect was transient
                    clear_grace(session, at);
                }
                session.room_id = new_room_id;
                session.last_heartbeat_at = at;
            }
            None => {
                // Move without a prior join: a missed event, treat as fresh
                warn!("Move for user {} with no session; treating as join", user_id);
                *guard = Some(ActiveSession::new(user_id, new_room_id, at));
            }
        }
    }

    /// Deliberate departure closes immediately.
    pub async fn on_leave(&self, user_id: UserId, at: DateTime<Utc>) {
        let slot = self.slot(user_id);
        let closed = {
            let mut guard = slot.lock().await;
            guard.take().map(|session| close_session(&session, at))
        };
        if let Some(closed) = closed {
            self.hand_off(closed);
        }
    }

    /// A disconnect starts the grace window instead of closing. Repeated
    /// disconnects keep the deadline of the first one.
    pub async fn on_disconnect(&self, user_id: UserId, at: DateTime<Utc>) {
        let slot = self.slot(user_id);
        let mut guard = slot.lock().await;
        if let Some(session) = guard.as_mut() {
            if !session.in_grace() {
                begin_grace(session, at, &self.policy);
            }
        }
    }

    pub async fn on_heartbeat(&self, user_id: UserId, at: DateTime<Utc>) {
        let slot = self.slot(user_id);
        let mut guard = slot.lock().await;
        if let Some(session) = guard.as_mut() {
            if !session.in_grace() {
                session.last_heartbeat_at = at;
            }
        }
    }

    pub async fn apply(&self, event: PresenceEvent) {
        match event.kind {
            PresenceKind::Join => {
                if let Some(room) = event.room_id {
                    self.on_join(event.user_id, room, event.at).await;
                }
            }
            PresenceKind::Move => {
                if let Some(room) = event.room_id {
                    self.on_move(event.user_id, room, event.at).await;
                }
            }
            PresenceKind::Leave => self.on_leave(event.user_id, event.at).await,
            PresenceKind::Disconnect => self.on_disconnect(event.user_id, event.at).await,
            PresenceKind::Heartbeat => self.on_heartbeat(event.user_id, event.at).await,
        }
    }

    /// Close every session whose grace deadline has elapsed, ending each at
    /// its original disconnect time. Locks are taken one user at a time so
    /// the sweep never starves event ingestion.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let user_ids: Vec<UserId> = self.slots.iter().map(|entry| *entry.key()).collect();

        let mut swept = 0;
        for user_id in user_ids {
            let slot = self.slot(user_id);
            let closed = {
                let mut guard = slot.lock().await;
                match guard.as_ref() {
                    Some(session) if grace_expired(session, now) => {
                        let closed = close_expired(session, &self.policy);
                        *guard = None;
                        Some(closed)
                    }
                    _ => None,
                }
            };
            if let Some(closed) = closed {
                swept += 1;
                self.hand_off(closed);
            }
        }

        if swept > 0 {
            info!("Grace sweep closed {} expired sessions", swept);
        }
        swept
    }

    /// Reinsert persisted sessions on startup. A user who somehow already
    /// has a live session keeps it; the snapshot row loses.
    pub async fn restore_sessions(&self, sessions: Vec<ActiveSession>) -> usize {
        let mut restored = 0;
        for session in sessions {
            let slot = self.slot(session.user_id);
            let mut guard = slot.lock().await;
            if guard.is_none() {
                *guard = Some(session);
                restored += 1;
            }
        }
        restored
    }

    /// Bring the table in line with an authoritative presence scan: open
    /// sessions for present users we are not tracking, resume users we
    /// thought were in grace, and close sessions for users present
    /// nowhere, using their last heartbeat as the approximate end.
    pub async fn reconcile(&self, present: &[PresentUser], at: DateTime<Utc>) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for entry in present {
            let slot = self.slot(entry.user_id);
            let mut guard = slot.lock().await;
            match guard.as_mut() {
                None => {
                    // Present with no session or snapshot: a fresh join,
                    // start time unknown beyond "now"
                    *guard = Some(ActiveSession::new(entry.user_id, entry.room_id.clone(), at));
                    report.opened += 1;
                }
                Some(session) => {
                    if session.in_grace() {
                        clear_grace(session, at);
                    }
                    session.room_id = entry.room_id.clone();
                    report.resumed += 1;
                }
            }
        }

        let tracked: Vec<UserId> = self.slots.iter().map(|entry| *entry.key()).collect();
        for user_id in tracked {
            if present.iter().any(|p| p.user_id == user_id) {
                continue;
            }
            let slot = self.slot(user_id);
            let closed = {
                let mut guard = slot.lock().await;
                guard
                    .take()
                    .map(|session| close_session(&session, session.last_heartbeat_at))
            };
            if let Some(closed) = closed {
                report.closed += 1;
                self.hand_off(closed);
            }
        }

        info!(
            "Reconcile: {} opened, {} resumed, {} closed",
            report.opened, report.resumed, report.closed
        );
        report
    }

    /// Copy of every live session, for the persistence tick. Takes slot
    /// locks one at a time, never the whole table.
    pub async fn snapshot_sessions(&self) -> Vec<ActiveSession> {
        let user_ids: Vec<UserId> = self.slots.iter().map(|entry| *entry.key()).collect();

        let mut sessions = Vec::new();
        for user_id in user_ids {
            let slot = self.slot(user_id);
            let guard = slot.lock().await;
            if let Some(session) = guard.as_ref() {
                sessions.push(session.clone());
            }
        }
        sessions
    }

    pub async fn phase_of(&self, user_id: UserId) -> SessionPhase {
        let slot = self.slot(user_id);
        let guard = slot.lock().await;
        match guard.as_ref() {
            None => SessionPhase::Absent,
            Some(session) if session.in_grace() => SessionPhase::DisconnectedGrace,
            Some(_) => SessionPhase::Present,
        }
    }

    pub async fn get_session(&self, user_id: UserId) -> Option<ActiveSession> {
        let slot = self.slot(user_id);
        let guard = slot.lock().await;
        guard.clone()
    }

    pub async fn active_count(&self) -> usize {
        self.snapshot_sessions().await.len()
    }
}

/// Pump presence events from the gateway channel into the table until the
/// sender side hangs up.
pub async fn run_event_loop(table: Arc<SessionTable>, mut rx: mpsc::UnboundedReceiver<PresenceEvent>) {
    while let Some(event) = rx.recv().await {
        table.apply(event).await;
    }
    info!("Presence event channel closed; ingestion stopped");
}
