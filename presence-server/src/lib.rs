use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use warp::Filter;

use crate::recovery::PersistenceSupervisor;
use crate::session_table::SessionTable;
use presence_core::{AccrualSchedule, Calendar, rollover_if_needed};
use presence_persistence::repositories::LedgerRepository;
use presence_types::{LedgerScope, UserStats};

pub mod config;
pub mod error;
pub mod points_engine;
pub mod presence;
pub mod recovery;
pub mod session_table;

#[derive(Deserialize)]
struct LeaderboardQuery {
    scope: Option<String>,
    limit: Option<u64>,
}

fn parse_scope(raw: Option<&str>) -> Result<LedgerScope, String> {
    match raw.unwrap_or("monthly") {
        "daily" => Ok(LedgerScope::Daily),
        "monthly" => Ok(LedgerScope::Monthly),
        "lifetime" | "alltime" => Ok(LedgerScope::Lifetime),
        other => Err(format!("Unknown scope '{}'", other)),
    }
}

/// Read-side context shared by the stats handlers: the calendar is needed
/// so a stats read after local midnight shows zeroed daily windows even
/// before the user's next credit lands.
#[derive(Clone)]
pub struct StatsContext {
    pub calendar: Calendar,
    pub schedule: AccrualSchedule,
}

pub fn create_routes(
    session_table: Arc<SessionTable>,
    ledger: Arc<LedgerRepository>,
    supervisor: Arc<PersistenceSupervisor>,
    stats_context: StatsContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let table_filter = warp::any().map({
        let session_table = session_table.clone();
        move || session_table.clone()
    });

    let ledger_filter = warp::any().map({
        let ledger = ledger.clone();
        move || ledger.clone()
    });

    let supervisor_filter = warp::any().map({
        let supervisor = supervisor.clone();
        move || supervisor.clone()
    });

    let stats_context_filter = warp::any().map(move || stats_context.clone());

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let user_stats = warp::path!("api" / "stats" / String)
        .and(warp::get())
        .and(ledger_filter.clone())
        .and(stats_context_filter.clone())
        .and_then(handle_user_stats_request);

    let leaderboard = warp::path!("api" / "leaderboard")
        .and(warp::get())
        .and(warp::query::<LeaderboardQuery>())
        .and(ledger_filter.clone())
        .and_then(handle_leaderboard_request);

    let house_leaderboard = warp::path!("api" / "houses" / "leaderboard")
        .and(warp::get())
        .and(warp::query::<LeaderboardQuery>())
        .and(ledger_filter.clone())
        .and_then(handle_house_leaderboard_request);

    let force_save = warp::path!("api" / "admin" / "save")
        .and(warp::post())
        .and(supervisor_filter.clone())
        .and_then(handle_force_save_request);

    let recovery_status = warp::path!("api" / "admin" / "recovery")
        .and(warp::get())
        .and(supervisor_filter.clone())
        .and_then(handle_recovery_status_request);

    let session_count = warp::path!("api" / "admin" / "sessions" / "count")
        .and(warp::get())
        .and(table_filter.clone())
        .and_then(handle_session_count_request);

    health
        .or(user_stats)
        .or(leaderboard)
        .or(house_leaderboard)
        .or(force_save)
        .or(recovery_status)
        .or(session_count)
        .with(warp::log("presence_server"))
}

async fn handle_user_stats_request(
    user_id: String,
    ledger: Arc<LedgerRepository>,
    context: StatsContext,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_uuid = match Uuid::parse_str(&user_id) {
        Ok(uuid) => uuid,
        Err(_) => {
            return Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "error": "Invalid user ID format"
                })),
                warp::http::StatusCode::BAD_REQUEST,
            ));
        }
    };

    match ledger.find_user(user_uuid).await {
        Ok(Some(mut counters)) => {
            // Present the ledger as of the user's local today: a read
            // after midnight must not show yesterday's daily window
            let zone = context.calendar.resolve_zone(counters.timezone.as_deref());
            let today = context.calendar.local_date(chrono::Utc::now(), zone);
            rollover_if_needed(&mut counters, today);

            Ok(warp::reply::with_status(
                warp::reply::json(&UserStats::from(&counters)),
                warp::http::StatusCode::OK,
            ))
        }
        Ok(None) => Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "error": "User not found"
            })),
            warp::http::StatusCode::NOT_FOUND,
        )),
        Err(err) => {
            tracing::error!("Failed to fetch stats for {}: {}", user_uuid, err);
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "error": "Failed to fetch user stats"
                })),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn handle_leaderboard_request(
    query: LeaderboardQuery,
    ledger: Arc<LedgerRepository>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let scope = match parse_scope(query.scope.as_deref()) {
        Ok(scope) => scope,
        Err(message) => {
            return Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({ "error": message })),
                warp::http::StatusCode::BAD_REQUEST,
            ));
        }
    };
    let limit = query.limit.unwrap_or(10).min(100); // Default 10, max 100

    match ledger.get_leaderboard(scope, limit).await {
        Ok(entries) => Ok(warp::reply::with_status(
            warp::reply::json(&entries),
            warp::http::StatusCode::OK,
        )),
        Err(err) => {
            tracing::error!("Failed to fetch leaderboard: {}", err);
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "error": "Failed to fetch leaderboard"
                })),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn handle_house_leaderboard_request(
    query: LeaderboardQuery,
    ledger: Arc<LedgerRepository>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let scope = match parse_scope(query.scope.as_deref()) {
        Ok(scope) => scope,
        Err(message) => {
            return Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({ "error": message })),
                warp::http::StatusCode::BAD_REQUEST,
            ));
        }
    };

    match ledger.get_house_leaderboard(scope).await {
        Ok(entries) => Ok(warp::reply::with_status(
            warp::reply::json(&entries),
            warp::http::StatusCode::OK,
        )),
        Err(err) => {
            tracing::error!("Failed to fetch house leaderboard: {}", err);
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "error": "Failed to fetch house leaderboard"
                })),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn handle_force_save_request(
    supervisor: Arc<PersistenceSupervisor>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match supervisor.snapshot().await {
        Ok(written) => Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({ "sessions_written": written })),
            warp::http::StatusCode::OK,
        )),
        Err(err) => {
            tracing::error!("Forced snapshot failed: {}", err);
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({
                    "error": "Snapshot failed"
                })),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn handle_recovery_status_request(
    supervisor: Arc<PersistenceSupervisor>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let status = supervisor.status().await;
    Ok(warp::reply::with_status(
        warp::reply::json(&status),
        warp::http::StatusCode::OK,
    ))
}

async fn handle_session_count_request(
    session_table: Arc<SessionTable>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let count = session_table.active_count().await;
    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "active_sessions": count })),
        warp::http::StatusCode::OK,
    ))
}
