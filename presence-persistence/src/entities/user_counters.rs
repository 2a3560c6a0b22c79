use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub timezone: Option<String>,
    pub house_id: Option<String>,
    pub daily_minutes: i64,
    pub daily_points: i64,
    pub monthly_minutes: i64,
    pub monthly_points: i64,
    pub lifetime_minutes: i64,
    pub lifetime_points: i64,
    pub current_streak_days: i32,
    pub longest_streak_days: i32,
    pub last_credited_local_date: Option<Date>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
