use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};

use presence_core::{Calendar, FixedTimezoneDirectory};
use presence_persistence::connection::connect_and_migrate;
use presence_persistence::repositories::{LedgerRepository, SnapshotRepository};
use presence_server::points_engine::PointsEngine;
use presence_server::presence::{PresenceSource, StaticPresenceSource};
use presence_server::recovery::PersistenceSupervisor;
use presence_server::session_table::{SessionTable, run_event_loop};
use presence_server::{StatsContext, config::Config, create_routes};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting presence points engine...");

    let config = Config::new();
    let default_zone = config
        .default_timezone
        .parse()
        .expect("Invalid DEFAULT_TIMEZONE");
    let calendar = Calendar::new(default_zone);
    let schedule = config.accrual_schedule();

    // Failing to reach the durable store at startup is fatal; everything
    // after this point degrades instead of crashing.
    let db = match connect_and_migrate(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };

    let ledger = Arc::new(LedgerRepository::new(db.clone()));
    let snapshots = Arc::new(SnapshotRepository::new(db));

    let (closed_tx, closed_rx) = mpsc::unbounded_channel();
    let session_table = Arc::new(SessionTable::new(config.grace_policy(), closed_tx));
    let supervisor = Arc::new(PersistenceSupervisor::new(
        session_table.clone(),
        snapshots.clone(),
    ));

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_event_loop(session_table.clone(), event_rx));

    // The gateway integration drives this seam: it submits presence events
    // and answers reconcile scans. A static source stands in until it
    // attaches.
    let presence_source = StaticPresenceSource::new(event_tx);
    let present = match presence_source.scan().await {
        Ok(present) => present,
        Err(e) => {
            tracing::warn!("Presence scan failed at startup: {}; assuming empty", e);
            Vec::new()
        }
    };
    match supervisor.restore(&present, Utc::now()).await {
        Ok(report) => info!(
            "Recovered session table: {} resumed, {} opened, {} closed",
            report.resumed, report.opened, report.closed
        ),
        Err(e) => {
            error!("Failed to restore session snapshots: {}", e);
            std::process::exit(1);
        }
    }

    let points_engine = Arc::new(PointsEngine::new(
        ledger.clone(),
        calendar.clone(),
        schedule.clone(),
        Arc::new(FixedTimezoneDirectory::new(None)),
    ));
    tokio::spawn(points_engine.run(closed_rx));

    // Grace sweep task
    let sweep_table = session_table.clone();
    let sweep_interval = config.sweep_interval_seconds;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval));
        loop {
            interval.tick().await;
            sweep_table.sweep_expired(Utc::now()).await;
        }
    });

    // Periodic snapshot task
    tokio::spawn(
        supervisor
            .clone()
            .run_ticks(Duration::from_secs(config.snapshot_interval_seconds)),
    );

    let routes = create_routes(
        session_table.clone(),
        ledger.clone(),
        supervisor.clone(),
        StatsContext { calendar, schedule },
    );

    info!("Server starting on {}:{}", config.host, config.port);

    let addr = (
        config
            .host
            .parse::<std::net::IpAddr>()
            .expect("Invalid HOST"),
        config.port,
    );

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).unwrap();
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!("Server started successfully on {}.", addr);
    server.await;

    // Final synchronous snapshot supersedes the periodic cadence
    match supervisor.snapshot().await {
        Ok(written) => info!("Shutdown snapshot wrote {} sessions", written),
        Err(e) => error!("Shutdown snapshot failed: {}", e),
    }

    drop(presence_source);
    info!("Server shutdown complete.");
}
