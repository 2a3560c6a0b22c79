use chrono::{DateTime, Duration, Utc};

use crate::accrual::MINUTE_ROUNDING;
use presence_types::{ActiveSession, ClosedSession};

/// How disconnects are absorbed. A disconnect opens a bounded window in
/// which a reconnect continues the session; only once the window elapses
/// does the session actually close.
#[derive(Debug, Clone, PartialEq)]
pub struct GracePolicy {
    pub window: Duration,
    /// Whether the disconnect-to-deadline gap itself is credited when a
    /// session closes via grace expiry. Off: the session ends at the
    /// moment the user disconnected, not at the sweep.
    pub credit_grace_outage: bool,
}

impl Default for GracePolicy {
    fn default() -> Self {
        Self {
            window: Duration::minutes(5),
            credit_grace_outage: false,
        }
    }
}

impl GracePolicy {
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    pub fn deadline_after(&self, disconnected_at: DateTime<Utc>) -> DateTime<Utc> {
        disconnected_at + self.window
    }

    /// When a grace-expired session should be considered ended.
    pub fn ended_at_for_expiry(&self, deadline: DateTime<Utc>) -> DateTime<Utc> {
        if self.credit_grace_outage {
            deadline
        } else {
            deadline - self.window
        }
    }
}

/// Convert an active session into its closed form. `ended_at` earlier than
/// `started_at` clamps to zero credited minutes rather than going negative.
pub fn close_session(session: &ActiveSession, ended_at: DateTime<Utc>) -> ClosedSession {
    let elapsed_seconds = (ended_at - session.started_at).num_seconds();
    ClosedSession {
        id: session.id,
        user_id: session.user_id,
        room_id: session.room_id.clone(),
        started_at: session.started_at,
        ended_at,
        credited_minutes: MINUTE_ROUNDING.minutes_from_seconds(elapsed_seconds),
    }
}

/// Mark a session disconnected: the grace deadline starts ticking but
/// nothing closes yet.
pub fn begin_grace(session: &mut ActiveSession, at: DateTime<Utc>, policy: &GracePolicy) {
    session.grace_deadline = Some(policy.deadline_after(at));
    session.last_heartbeat_at = at;
}

/// A reconnect inside the window resumes the session uninterrupted:
/// started_at is untouched, the deadline is dropped.
pub fn clear_grace(session: &mut ActiveSession, at: DateTime<Utc>) {
    session.grace_deadline = None;
    session.last_heartbeat_at = at;
}

pub fn grace_expired(session: &ActiveSession, now: DateTime<Utc>) -> bool {
    match session.grace_deadline {
        Some(deadline) => deadline <= now,
        None => false,
    }
}

/// Close a session whose grace window elapsed without a reconnect. The end
/// time derives from the original disconnect, never from when the sweep
/// happened to run.
pub fn close_expired(session: &ActiveSession, policy: &GracePolicy) -> ClosedSession {
    let deadline = session
        .grace_deadline
        .unwrap_or(session.last_heartbeat_at + policy.window);
    close_session(session, policy.ended_at_for_expiry(deadline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn session_at(start: &str) -> ActiveSession {
        ActiveSession::new(Uuid::new_v4(), "lounge".to_string(), utc(start))
    }

    #[test]
    fn test_close_credits_floor_minutes() {
        let session = session_at("2024-05-01T10:00:00Z");
        let closed = close_session(&session, utc("2024-05-01T10:30:45Z"));
        assert_eq!(closed.credited_minutes, 30);
        assert_eq!(closed.id, session.id);
    }

    #[test]
    fn test_close_before_start_clamps_to_zero() {
        let session = session_at("2024-05-01T10:00:00Z");
        let closed = close_session(&session, utc("2024-05-01T09:59:00Z"));
        assert_eq!(closed.credited_minutes, 0);
    }

    #[test]
    fn test_grace_deadline_and_expiry() {
        let policy = GracePolicy::default();
        let mut session = session_at("2024-05-01T10:00:00Z");

        begin_grace(&mut session, utc("2024-05-01T10:20:00Z"), &policy);
        assert_eq!(session.grace_deadline, Some(utc("2024-05-01T10:25:00Z")));
        assert!(!grace_expired(&session, utc("2024-05-01T10:24:59Z")));
        assert!(grace_expired(&session, utc("2024-05-01T10:25:00Z")));

        // Expiry closes at the disconnect time, not the deadline
        let closed = close_expired(&session, &policy);
        assert_eq!(closed.ended_at, utc("2024-05-01T10:20:00Z"));
        assert_eq!(closed.credited_minutes, 20);
    }

    #[test]
    fn test_reconnect_clears_grace_and_keeps_start() {
        let policy = GracePolicy::default();
        let mut session = session_at("2024-05-01T10:00:00Z");
        let started = session.started_at;

        begin_grace(&mut session, utc("2024-05-01T10:20:00Z"), &policy);
        clear_grace(&mut session, utc("2024-05-01T10:20:01Z"));

        assert!(session.grace_deadline.is_none());
        assert_eq!(session.started_at, started);
    }

    #[test]
    fn test_outage_crediting_flag() {
        let policy = GracePolicy {
            credit_grace_outage: true,
            ..GracePolicy::default()
        };
        let mut session = session_at("2024-05-01T10:00:00Z");
        begin_grace(&mut session, utc("2024-05-01T10:20:00Z"), &policy);

        let closed = close_expired(&session, &policy);
        assert_eq!(closed.ended_at, utc("2024-05-01T10:25:00Z"));
        assert_eq!(closed.credited_minutes, 25);
    }
}
