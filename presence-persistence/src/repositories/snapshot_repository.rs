use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    TransactionTrait,
};
use tracing::warn;
use uuid::Uuid;

use crate::entities::{prelude::*, session_snapshots};
use presence_types::ActiveSession;

pub struct SnapshotRepository {
    db: DatabaseConnection,
}

impl SnapshotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Overwrite the durable snapshot with the current session table: one
    /// row per present user, stale rows for departed users removed. The
    /// whole write is one transaction so a restore never sees a snapshot
    /// mixing two generations.
    pub async fn write_snapshot(&self, sessions: &[ActiveSession]) -> Result<usize> {
        let txn = self.db.begin().await?;
        let now = Utc::now().into();

        for session in sessions {
            let row = session_snapshots::ActiveModel {
                user_id: ActiveValue::Set(session.user_id),
                session_id: ActiveValue::Set(session.id),
                room_id: ActiveValue::Set(session.room_id.clone()),
                started_at: ActiveValue::Set(session.started_at.into()),
                last_heartbeat_at: ActiveValue::Set(session.last_heartbeat_at.into()),
                grace_deadline: ActiveValue::Set(session.grace_deadline.map(Into::into)),
                written_at: ActiveValue::Set(now),
            };

            SessionSnapshots::insert(row)
                .on_conflict(
                    OnConflict::column(session_snapshots::Column::UserId)
                        .update_columns([
                            session_snapshots::Column::SessionId,
                            session_snapshots::Column::RoomId,
                            session_snapshots::Column::StartedAt,
                            session_snapshots::Column::LastHeartbeatAt,
                            session_snapshots::Column::GraceDeadline,
                            session_snapshots::Column::WrittenAt,
                        ])
                        .to_owned(),
                )
                .exec(&txn)
                .await?;
        }

        let delete = if sessions.is_empty() {
            SessionSnapshots::delete_many().exec(&txn).await?
        } else {
            let current: Vec<Uuid> = sessions.iter().map(|s| s.user_id).collect();
            SessionSnapshots::delete_many()
                .filter(session_snapshots::Column::UserId.is_not_in(current))
                .exec(&txn)
                .await?
        };
        txn.commit().await?;

        if delete.rows_affected > 0 {
            tracing::debug!("Dropped {} stale session snapshots", delete.rows_affected);
        }

        Ok(sessions.len())
    }

    /// Load every persisted in-flight session. A row that fails basic
    /// sanity (heartbeat before start) is unrecoverable: skip it with a
    /// warning instead of refusing to start.
    pub async fn load_all(&self) -> Result<Vec<ActiveSession>> {
        let rows = SessionSnapshots::find().all(&self.db).await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            if row.last_heartbeat_at < row.started_at {
                warn!(
                    "Skipping corrupt session snapshot for user {} (heartbeat predates start)",
                    row.user_id
                );
                continue;
            }
            sessions.push(ActiveSession {
                id: row.session_id,
                user_id: row.user_id,
                room_id: row.room_id,
                started_at: row.started_at.into(),
                last_heartbeat_at: row.last_heartbeat_at.into(),
                grace_deadline: row.grace_deadline.map(Into::into),
            });
        }
        Ok(sessions)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(SessionSnapshots::find().count(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use chrono::{DateTime, Duration};
    use migration::{Migrator, MigratorTrait};

    async fn setup_test_db() -> SnapshotRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SnapshotRepository::new(db)
    }

    fn utc(s: &str) -> DateTime<chrono::Utc> {
        s.parse().unwrap()
    }

    fn session(room: &str) -> ActiveSession {
        ActiveSession::new(Uuid::new_v4(), room.to_string(), utc("2024-05-01T10:00:00Z"))
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_is_exact() {
        let repo = setup_test_db().await;

        let mut in_grace = session("library");
        in_grace.grace_deadline = Some(utc("2024-05-01T10:25:00Z"));
        let plain = session("study-hall");

        repo.write_snapshot(&[in_grace.clone(), plain.clone()])
            .await
            .unwrap();

        let mut restored = repo.load_all().await.unwrap();
        restored.sort_by_key(|s| s.room_id.clone());
        let mut expected = vec![in_grace, plain];
        expected.sort_by_key(|s| s.room_id.clone());

        assert_eq!(restored, expected);
    }

    #[tokio::test]
    async fn test_snapshot_overwrites_and_drops_departed() {
        let repo = setup_test_db().await;

        let mut keeper = session("study-hall");
        let leaver = session("library");
        repo.write_snapshot(&[keeper.clone(), leaver.clone()])
            .await
            .unwrap();

        keeper.last_heartbeat_at = keeper.last_heartbeat_at + Duration::minutes(2);
        repo.write_snapshot(std::slice::from_ref(&keeper)).await.unwrap();

        let restored = repo.load_all().await.unwrap();
        assert_eq!(restored, vec![keeper]);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_snapshot_clears_table() {
        let repo = setup_test_db().await;
        repo.write_snapshot(&[session("study-hall")]).await.unwrap();

        repo.write_snapshot(&[]).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_skipped_not_fatal() {
        let repo = setup_test_db().await;

        let mut corrupt = session("study-hall");
        corrupt.last_heartbeat_at = corrupt.started_at - Duration::minutes(10);
        let good = session("library");

        repo.write_snapshot(&[corrupt, good.clone()]).await.unwrap();

        let restored = repo.load_all().await.unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].user_id, good.user_id);
    }
}
