use anyhow::Result;
use chrono::NaiveDate;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{credited_sessions, house_counters, prelude::*, session_snapshots, user_counters};
use presence_core::{apply_credit, same_month, AccrualSchedule};
use presence_types::{
    ClosedSession, HouseCounters as HouseLedger, HouseLeaderboardEntry, LeaderboardEntry,
    LedgerScope, UserCounters as UserLedger,
};

pub struct LedgerRepository {
    db: DatabaseConnection,
}

/// What a credit call actually did, so the engine can log and requeue
/// correctly. A retried session reports `already_credited` instead of
/// counting twice.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreditReceipt {
    pub already_credited: bool,
    pub points: i64,
    pub streak_extended: bool,
}

impl LedgerRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_ledger(model: user_counters::Model) -> UserLedger {
        UserLedger {
            user_id: model.user_id,
            timezone: model.timezone,
            house_id: model.house_id,
            daily_minutes: model.daily_minutes,
            daily_points: model.daily_points,
            monthly_minutes: model.monthly_minutes,
            monthly_points: model.monthly_points,
            lifetime_minutes: model.lifetime_minutes,
            lifetime_points: model.lifetime_points,
            current_streak_days: model.current_streak_days,
            longest_streak_days: model.longest_streak_days,
            last_credited_local_date: model.last_credited_local_date,
        }
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<Option<UserLedger>> {
        let model = UserCounters::find_by_id(user_id).one(&self.db).await?;
        Ok(model.map(Self::model_to_ledger))
    }

    pub async fn get_timezone(&self, user_id: Uuid) -> Result<Option<String>> {
        let model = UserCounters::find_by_id(user_id).one(&self.db).await?;
        Ok(model.and_then(|m| m.timezone))
    }

    /// Set or update a user's profile fields without touching the counters.
    /// Creates the row when the user has never been credited.
    pub async fn upsert_profile(
        &self,
        user_id: Uuid,
        timezone: Option<String>,
        house_id: Option<String>,
    ) -> Result<()> {
        let now = chrono::Utc::now().into();
        match UserCounters::find_by_id(user_id).one(&self.db).await? {
            Some(existing) => {
                let mut active: user_counters::ActiveModel = existing.into();
                active.timezone = ActiveValue::Set(timezone);
                active.house_id = ActiveValue::Set(house_id);
                active.updated_at = ActiveValue::Set(now);
                UserCounters::update(active).exec(&self.db).await?;
            }
            None => {
                let fresh = UserLedger::new(user_id);
                let mut active = Self::ledger_to_active(&fresh, now);
                active.timezone = ActiveValue::Set(timezone);
                active.house_id = ActiveValue::Set(house_id);
                UserCounters::insert(active).exec(&self.db).await?;
            }
        }
        Ok(())
    }

    fn ledger_to_active(
        ledger: &UserLedger,
        now: chrono::DateTime<chrono::FixedOffset>,
    ) -> user_counters::ActiveModel {
        user_counters::ActiveModel {
            user_id: ActiveValue::Set(ledger.user_id),
            timezone: ActiveValue::Set(ledger.timezone.clone()),
            house_id: ActiveValue::Set(ledger.house_id.clone()),
            daily_minutes: ActiveValue::Set(ledger.daily_minutes),
            daily_points: ActiveValue::Set(ledger.daily_points),
            monthly_minutes: ActiveValue::Set(ledger.monthly_minutes),
            monthly_points: ActiveValue::Set(ledger.monthly_points),
            lifetime_minutes: ActiveValue::Set(ledger.lifetime_minutes),
            lifetime_points: ActiveValue::Set(ledger.lifetime_points),
            current_streak_days: ActiveValue::Set(ledger.current_streak_days),
            longest_streak_days: ActiveValue::Set(ledger.longest_streak_days),
            last_credited_local_date: ActiveValue::Set(ledger.last_credited_local_date),
            updated_at: ActiveValue::Set(now),
        }
    }

    /// Credit one closed session: idempotency marker, user counters and
    /// house counters all move in a single transaction, so they can never
    /// diverge and a retried session is a no-op.
    pub async fn credit(
        &self,
        session: &ClosedSession,
        local_date: NaiveDate,
        schedule: &AccrualSchedule,
    ) -> Result<CreditReceipt> {
        let txn = self.db.begin().await?;

        if CreditedSessions::find_by_id(session.id)
            .one(&txn)
            .await?
            .is_some()
        {
            txn.rollback().await?;
            return Ok(CreditReceipt {
                already_credited: true,
                points: 0,
                streak_extended: false,
            });
        }

        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();

        let existing = UserCounters::find_by_id(session.user_id).one(&txn).await?;
        let had_row = existing.is_some();
        let mut ledger = existing
            .map(Self::model_to_ledger)
            .unwrap_or_else(|| UserLedger::new(session.user_id));

        let outcome = apply_credit(&mut ledger, schedule, session.credited_minutes, local_date);

        let active = Self::ledger_to_active(&ledger, now);
        if had_row {
            UserCounters::update(active).exec(&txn).await?;
        } else {
            UserCounters::insert(active).exec(&txn).await?;
        }

        if let Some(house_id) = ledger.house_id.clone() {
            Self::credit_house(&txn, &house_id, outcome.split.points, local_date, now).await?;
        }

        CreditedSessions::insert(credited_sessions::ActiveModel {
            session_id: ActiveValue::Set(session.id),
            user_id: ActiveValue::Set(session.user_id),
            credited_at: ActiveValue::Set(now),
        })
        .exec(&txn)
        .await?;

        // The in-flight snapshot for this session is now obsolete
        SessionSnapshots::delete_many()
            .filter(session_snapshots::Column::SessionId.eq(session.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        Ok(CreditReceipt {
            already_credited: false,
            points: outcome.split.points,
            streak_extended: outcome.streak_extended,
        })
    }

    async fn credit_house(
        txn: &DatabaseTransaction,
        house_id: &str,
        points: i64,
        local_date: NaiveDate,
        now: chrono::DateTime<chrono::FixedOffset>,
    ) -> Result<()> {
        let existing = HouseCounters::find_by_id(house_id.to_string())
            .one(txn)
            .await?;
        let had_row = existing.is_some();

        let (mut daily, mut monthly, mut lifetime, last_date) = match &existing {
            Some(m) => (
                m.daily_points,
                m.monthly_points,
                m.lifetime_points,
                m.last_credited_local_date,
            ),
            None => (0, 0, 0, None),
        };

        // House windows roll with the crediting member's local calendar,
        // forward only: a member whose zone still shows the previous date
        // must not zero a window another member already advanced.
        if let Some(last) = last_date {
            if local_date > last {
                daily = 0;
                if !same_month(last, local_date) {
                    monthly = 0;
                }
            }
        }

        daily += points;
        monthly += points;
        lifetime += points;

        let active = house_counters::ActiveModel {
            house_id: ActiveValue::Set(house_id.to_string()),
            daily_points: ActiveValue::Set(daily),
            monthly_points: ActiveValue::Set(monthly),
            lifetime_points: ActiveValue::Set(lifetime),
            last_credited_local_date: ActiveValue::Set(Some(
                last_date.map_or(local_date, |last| last.max(local_date)),
            )),
            updated_at: ActiveValue::Set(now),
        };

        if had_row {
            HouseCounters::update(active).exec(txn).await?;
        } else {
            HouseCounters::insert(active).exec(txn).await?;
        }
        Ok(())
    }

    pub async fn get_leaderboard(
        &self,
        scope: LedgerScope,
        limit: u64,
    ) -> Result<Vec<LeaderboardEntry>> {
        let query = match scope {
            LedgerScope::Daily => UserCounters::find()
                .order_by_desc(user_counters::Column::DailyPoints),
            LedgerScope::Monthly => UserCounters::find()
                .order_by_desc(user_counters::Column::MonthlyPoints),
            LedgerScope::Lifetime => UserCounters::find()
                .order_by_desc(user_counters::Column::LifetimePoints),
        };

        let models = query.limit(limit).all(&self.db).await?;

        let entries = models
            .into_iter()
            .enumerate()
            .map(|(index, model)| {
                let (points, minutes) = match scope {
                    LedgerScope::Daily => (model.daily_points, model.daily_minutes),
                    LedgerScope::Monthly => (model.monthly_points, model.monthly_minutes),
                    LedgerScope::Lifetime => (model.lifetime_points, model.lifetime_minutes),
                };
                LeaderboardEntry {
                    rank: (index + 1) as u32,
                    user_id: model.user_id,
                    points,
                    minutes,
                }
            })
            .collect();

        Ok(entries)
    }

    pub async fn get_house_leaderboard(
        &self,
        scope: LedgerScope,
    ) -> Result<Vec<HouseLeaderboardEntry>> {
        let query = match scope {
            LedgerScope::Daily => HouseCounters::find()
                .order_by_desc(house_counters::Column::DailyPoints),
            LedgerScope::Monthly => HouseCounters::find()
                .order_by_desc(house_counters::Column::MonthlyPoints),
            LedgerScope::Lifetime => HouseCounters::find()
                .order_by_desc(house_counters::Column::LifetimePoints),
        };

        let models = query.all(&self.db).await?;

        let entries = models
            .into_iter()
            .enumerate()
            .map(|(index, model)| {
                let points = match scope {
                    LedgerScope::Daily => model.daily_points,
                    LedgerScope::Monthly => model.monthly_points,
                    LedgerScope::Lifetime => model.lifetime_points,
                };
                HouseLeaderboardEntry {
                    rank: (index + 1) as u32,
                    house_id: model.house_id,
                    points,
                }
            })
            .collect();

        Ok(entries)
    }

    pub async fn find_house(&self, house_id: &str) -> Result<Option<HouseLedger>> {
        let model = HouseCounters::find_by_id(house_id.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(|m| HouseLedger {
            house_id: m.house_id,
            daily_points: m.daily_points,
            monthly_points: m.monthly_points,
            lifetime_points: m.lifetime_points,
        }))
    }
}
