use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::EngineError;
use crate::presence::PresentUser;
use crate::session_table::{ReconcileReport, SessionTable};
use presence_persistence::repositories::SnapshotRepository;
use presence_types::RecoveryStatus;

/// Owns the durable snapshot cadence and crash recovery: periodic
/// heartbeat writes of the session table, a final write on shutdown, and
/// the restore-then-reconcile sequence at startup.
pub struct PersistenceSupervisor {
    table: Arc<SessionTable>,
    snapshots: Arc<SnapshotRepository>,
    status: RwLock<RecoveryStatus>,
}

impl PersistenceSupervisor {
    pub fn new(table: Arc<SessionTable>, snapshots: Arc<SnapshotRepository>) -> Self {
        Self {
            table,
            snapshots,
            status: RwLock::new(RecoveryStatus {
                restored_sessions: 0,
                closed_on_restore: 0,
                snapshots_written: 0,
                last_snapshot_at: None,
            }),
        }
    }

    /// Serialize every live session, overwriting the previous snapshot.
    pub async fn snapshot(&self) -> Result<usize, EngineError> {
        let sessions = self.table.snapshot_sessions().await;
        let written = self
            .snapshots
            .write_snapshot(&sessions)
            .await
            .map_err(EngineError::Store)?;

        let mut status = self.status.write().await;
        status.snapshots_written += 1;
        status.last_snapshot_at = Some(Utc::now());
        Ok(written)
    }

    /// Startup path: load persisted sessions, reinsert them, then
    /// reconcile against the live presence scan. Users gone since the
    /// snapshot close at their last heartbeat; users still present resume
    /// with their original start time. Only a store failure here is fatal.
    pub async fn restore(
        &self,
        present: &[PresentUser],
        at: DateTime<Utc>,
    ) -> Result<ReconcileReport, EngineError> {
        let persisted = self
            .snapshots
            .load_all()
            .await
            .map_err(|e| EngineError::Restore(e.to_string()))?;

        let restored = self.table.restore_sessions(persisted).await;
        let report = self.table.reconcile(present, at).await;

        {
            let mut status = self.status.write().await;
            status.restored_sessions = restored;
            status.closed_on_restore = report.closed;
        }

        info!(
            "Restore complete: {} sessions restored, {} closed as departed",
            restored, report.closed
        );
        Ok(report)
    }

    pub async fn status(&self) -> RecoveryStatus {
        self.status.read().await.clone()
    }

    /// Periodic snapshot loop; runs until the process shuts down. A failed
    /// tick is retried at the next interval rather than aborting the loop.
    pub async fn run_ticks(self: Arc<Self>, every: std::time::Duration) {
        let mut interval = tokio::time::interval(every);
        // First tick fires immediately; skip it so startup restore settles
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(err) = self.snapshot().await {
                tracing::warn!("Periodic snapshot failed: {}", err);
            }
        }
    }
}
