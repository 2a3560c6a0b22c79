use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{HouseId, UserId};

/// Durable per-user reward ledger. One row per user, zeroed at calendar
/// rollover in the user's own timezone, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCounters {
    pub user_id: UserId,
    /// IANA zone identifier, e.g. "Europe/Berlin". Falls back to the
    /// configured default zone when unset or unparseable.
    pub timezone: Option<String>,
    pub house_id: Option<HouseId>,
    pub daily_minutes: i64,
    pub daily_points: i64,
    pub monthly_minutes: i64,
    pub monthly_points: i64,
    pub lifetime_minutes: i64,
    pub lifetime_points: i64,
    pub current_streak_days: i32,
    pub longest_streak_days: i32,
    pub last_credited_local_date: Option<NaiveDate>,
}

impl UserCounters {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            timezone: None,
            house_id: None,
            daily_minutes: 0,
            daily_points: 0,
            monthly_minutes: 0,
            monthly_points: 0,
            lifetime_minutes: 0,
            lifetime_points: 0,
            current_streak_days: 0,
            longest_streak_days: 0,
            last_credited_local_date: None,
        }
    }
}

/// Durable per-house ledger, updated in the same transaction as its
/// members' counters so the two never diverge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseCounters {
    pub house_id: HouseId,
    pub daily_points: i64,
    pub monthly_points: i64,
    pub lifetime_points: i64,
}

impl HouseCounters {
    pub fn new(house_id: HouseId) -> Self {
        Self {
            house_id,
            daily_points: 0,
            monthly_points: 0,
            lifetime_points: 0,
        }
    }
}
