use chrono::{DateTime, Utc};
use presence_core::{
    AccrualSchedule, GracePolicy, apply_credit, begin_grace, clear_grace, close_expired,
    close_session,
};
use presence_types::{ActiveSession, UserCounters};
use uuid::Uuid;

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

#[test]
fn test_disconnect_reconnect_leave_is_one_session() {
    // disconnect at t+300s, reconnect one second later, leave at t+600s:
    // a single closed session covering the full 600 seconds.
    let policy = GracePolicy::default();
    let mut session = ActiveSession::new(Uuid::new_v4(), "study-hall".into(), utc("2024-05-01T12:00:00Z"));

    begin_grace(&mut session, utc("2024-05-01T12:05:00Z"), &policy);
    clear_grace(&mut session, utc("2024-05-01T12:05:01Z"));
    let closed = close_session(&session, utc("2024-05-01T12:10:00Z"));

    assert_eq!(closed.credited_minutes, 10);
    assert_eq!(closed.started_at, utc("2024-05-01T12:00:00Z"));
}

#[test]
fn test_gap_longer_than_grace_splits_presence() {
    // A gap that outlives the grace window produces two sessions whose
    // summed minutes exclude the gap itself.
    let policy = GracePolicy::default();
    let mut first = ActiveSession::new(Uuid::new_v4(), "study-hall".into(), utc("2024-05-01T12:00:00Z"));
    begin_grace(&mut first, utc("2024-05-01T12:30:00Z"), &policy);
    let first_closed = close_expired(&first, &policy);

    let second = ActiveSession::new(first.user_id, "study-hall".into(), utc("2024-05-01T12:40:00Z"));
    let second_closed = close_session(&second, utc("2024-05-01T13:00:00Z"));

    assert_eq!(first_closed.credited_minutes + second_closed.credited_minutes, 50);
    assert_ne!(first_closed.id, second_closed.id);
}

#[test]
fn test_credited_sessions_flow_into_ledger() {
    let schedule = AccrualSchedule::default();
    let mut counters = UserCounters::new(Uuid::new_v4());
    let session = ActiveSession::new(counters.user_id, "study-hall".into(), utc("2024-05-01T12:00:00Z"));
    let closed = close_session(&session, utc("2024-05-01T13:30:00Z"));

    let outcome = apply_credit(
        &mut counters,
        &schedule,
        closed.credited_minutes,
        closed.ended_at.date_naive(),
    );

    assert_eq!(closed.credited_minutes, 90);
    assert_eq!(outcome.split.points, 360);
    assert_eq!(counters.lifetime_points, 360);
    assert_eq!(counters.current_streak_days, 1);
}
