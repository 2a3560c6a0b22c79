
use std::sync::Arc;

use chrono::Duration;
use test_helpers::*;
use uuid::Uuid;

use presence_core::{AccrualSchedule, Calendar, FixedTimezoneDirectory};
use presence_server::points_engine::{PointsEngine, RetryPolicy};
use presence_types::ClosedSession;

fn engine_with(
    ledger: Arc<presence_persistence::repositories::LedgerRepository>,
    directory_zone: Option<&str>,
) -> PointsEngine {
    PointsEngine::new(
        ledger,
        Calendar::new(chrono_tz::Tz::UTC),
        AccrualSchedule::default(),
        Arc::new(FixedTimezoneDirectory::new(
            directory_zone.map(str::to_string),
        )),
    )
    // Fail fast instead of sleeping if a store call ever errors in a test
    .with_retry(RetryPolicy {
        initial_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(10),
    })
}

fn closed(user_id: Uuid, start: &str, minutes: i64) -> ClosedSession {
    let started_at = utc(start);
    ClosedSession {
        id: Uuid::new_v4(),
        user_id,
        room_id: "study-hall".to_string(),
        started_at,
        ended_at: started_at + Duration::minutes(minutes),
        credited_minutes: minutes,
    }
}

#[tokio::test]
async fn test_tier_split_credit_through_engine() {
    let (ledger, _snapshots) = setup_repositories().await;
    let engine = engine_with(ledger.clone(), None);
    let user = Uuid::new_v4();

    let receipt = engine
        .credit_once(&closed(user, "2024-05-01T10:00:00Z", 90))
        .await
        .unwrap();

    assert_eq!(receipt.points, 360);
    let counters = ledger.find_user(user).await.unwrap().unwrap();
    assert_eq!(counters.monthly_points, 360);
}

#[tokio::test]
async fn test_replayed_session_credits_once() {
    let (ledger, _snapshots) = setup_repositories().await;
    let engine = engine_with(ledger.clone(), None);
    let user = Uuid::new_v4();
    let session = closed(user, "2024-05-01T10:00:00Z", 60);

    let first = engine.credit_until_committed(&session).await;
    let second = engine.credit_until_committed(&session).await;

    assert!(!first.already_credited);
    assert!(second.already_credited);
    let counters = ledger.find_user(user).await.unwrap().unwrap();
    assert_eq!(counters.lifetime_points, 300);
}

#[tokio::test]
async fn test_stored_timezone_decides_crediting_date() {
    let (ledger, _snapshots) = setup_repositories().await;
    let engine = engine_with(ledger.clone(), None);
    let user = Uuid::new_v4();
    ledger
        .upsert_profile(user, Some("Asia/Tokyo".to_string()), None)
        .await
        .unwrap();

    // Ends 23:30 UTC on May 1st, which is already May 2nd in Tokyo
    engine
        .credit_once(&closed(user, "2024-05-01T23:00:00Z", 30))
        .await
        .unwrap();

    let counters = ledger.find_user(user).await.unwrap().unwrap();
    assert_eq!(
        counters.last_credited_local_date,
        Some("2024-05-02".parse().unwrap())
    );
}

#[tokio::test]
async fn test_directory_zone_overrides_stored_row() {
    let (ledger, _snapshots) = setup_repositories().await;
    let engine = engine_with(ledger.clone(), Some("America/New_York"));
    let user = Uuid::new_v4();
    ledger
        .upsert_profile(user, Some("Asia/Tokyo".to_string()), None)
        .await
        .unwrap();

    // 03:00 UTC on May 2nd is still May 1st in New York
    engine
        .credit_once(&closed(user, "2024-05-02T02:30:00Z", 30))
        .await
        .unwrap();

    let counters = ledger.find_user(user).await.unwrap().unwrap();
    assert_eq!(
        counters.last_credited_local_date,
        Some("2024-05-01".parse().unwrap())
    );
}

#[tokio::test]
async fn test_unknown_timezone_falls_back_without_blocking() {
    let (ledger, _snapshots) = setup_repositories().await;
    let engine = engine_with(ledger.clone(), Some("Not/AZone"));
    let user = Uuid::new_v4();

    let receipt = engine
        .credit_once(&closed(user, "2024-05-01T10:00:00Z", 30))
        .await
        .unwrap();

    assert_eq!(receipt.points, 150);
    let counters = ledger.find_user(user).await.unwrap().unwrap();
    assert_eq!(
        counters.last_credited_local_date,
        Some("2024-05-01".parse().unwrap())
    );
}

#[tokio::test]
async fn test_house_total_matches_member_sum_after_many_credits() {
    let (ledger, _snapshots) = setup_repositories().await;
    let engine = engine_with(ledger.clone(), None);

    let members: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    for user in &members {
        ledger
            .upsert_profile(*user, None, Some("gryphons".to_string()))
            .await
            .unwrap();
    }

    // Interleaved credits across all members of one house
    for round in 0..3 {
        for user in &members {
            let start = utc("2024-05-01T08:00:00Z") + Duration::hours(round * 2);
            engine
                .credit_until_committed(&ClosedSession {
                    id: Uuid::new_v4(),
                    user_id: *user,
                    room_id: "study-hall".to_string(),
                    started_at: start,
                    ended_at: start + Duration::minutes(45),
                    credited_minutes: 45,
                })
                .await;
        }
    }

    let mut member_sum = 0;
    for user in &members {
        member_sum += ledger.find_user(*user).await.unwrap().unwrap().monthly_points;
    }
    let house = ledger.find_house("gryphons").await.unwrap().unwrap();
    assert_eq!(house.monthly_points, member_sum);
}
