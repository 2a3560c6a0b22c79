use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserCounters::UserId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserCounters::Timezone).string())
                    .col(ColumnDef::new(UserCounters::HouseId).string())
                    .col(
                        ColumnDef::new(UserCounters::DailyMinutes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserCounters::DailyPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserCounters::MonthlyMinutes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserCounters::MonthlyPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserCounters::LifetimeMinutes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserCounters::LifetimePoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserCounters::CurrentStreakDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserCounters::LongestStreakDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(UserCounters::LastCreditedLocalDate).date())
                    .col(
                        ColumnDef::new(UserCounters::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(HouseCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HouseCounters::HouseId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(HouseCounters::DailyPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(HouseCounters::MonthlyPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(HouseCounters::LifetimePoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(HouseCounters::LastCreditedLocalDate).date())
                    .col(
                        ColumnDef::new(HouseCounters::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SessionSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionSnapshots::UserId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionSnapshots::SessionId).uuid().not_null())
                    .col(ColumnDef::new(SessionSnapshots::RoomId).string().not_null())
                    .col(
                        ColumnDef::new(SessionSnapshots::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionSnapshots::LastHeartbeatAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionSnapshots::GraceDeadline)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(SessionSnapshots::WrittenAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CreditedSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditedSessions::SessionId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CreditedSessions::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(CreditedSessions::CreditedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Leaderboards rank by one points column per scope
        manager
            .create_index(
                Index::create()
                    .name("idx_user_counters_daily_points")
                    .table(UserCounters::Table)
                    .col(UserCounters::DailyPoints)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_counters_monthly_points")
                    .table(UserCounters::Table)
                    .col(UserCounters::MonthlyPoints)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_counters_lifetime_points")
                    .table(UserCounters::Table)
                    .col(UserCounters::LifetimePoints)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_counters_house_id")
                    .table(UserCounters::Table)
                    .col(UserCounters::HouseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CreditedSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SessionSnapshots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(HouseCounters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserCounters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserCounters {
    Table,
    UserId,
    Timezone,
    HouseId,
    DailyMinutes,
    DailyPoints,
    MonthlyMinutes,
    MonthlyPoints,
    LifetimeMinutes,
    LifetimePoints,
    CurrentStreakDays,
    LongestStreakDays,
    LastCreditedLocalDate,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum HouseCounters {
    Table,
    HouseId,
    DailyPoints,
    MonthlyPoints,
    LifetimePoints,
    LastCreditedLocalDate,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SessionSnapshots {
    Table,
    UserId,
    SessionId,
    RoomId,
    StartedAt,
    LastHeartbeatAt,
    GraceDeadline,
    WrittenAt,
}

#[derive(DeriveIden)]
enum CreditedSessions {
    Table,
    SessionId,
    UserId,
    CreditedAt,
}
