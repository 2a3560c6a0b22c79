use sea_orm::entity::prelude::*;

/// Heartbeat-style snapshot of one user's in-flight session. One row per
/// user, overwritten on every persistence tick, removed once the session
/// is credited.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "session_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub room_id: String,
    pub started_at: DateTimeWithTimeZone,
    pub last_heartbeat_at: DateTimeWithTimeZone,
    pub grace_deadline: Option<DateTimeWithTimeZone>,
    pub written_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
