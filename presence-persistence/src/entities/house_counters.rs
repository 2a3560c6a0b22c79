use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "house_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub house_id: String,
    pub daily_points: i64,
    pub monthly_points: i64,
    pub lifetime_points: i64,
    pub last_credited_local_date: Option<Date>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
