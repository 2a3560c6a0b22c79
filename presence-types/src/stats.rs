use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{HouseId, UserCounters, UserId};

/// Which ledger window a leaderboard query ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerScope {
    Daily,
    Monthly,
    Lifetime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub minutes: i64,
    pub points: i64,
}

/// Read-only projection served to the command/formatting layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: UserId,
    pub house_id: Option<HouseId>,
    pub daily: PeriodStats,
    pub monthly: PeriodStats,
    pub all_time: PeriodStats,
    pub current_streak_days: i32,
    pub longest_streak_days: i32,
}

impl From<&UserCounters> for UserStats {
    fn from(counters: &UserCounters) -> Self {
        Self {
            user_id: counters.user_id,
            house_id: counters.house_id.clone(),
            daily: PeriodStats {
                minutes: counters.daily_minutes,
                points: counters.daily_points,
            },
            monthly: PeriodStats {
                minutes: counters.monthly_minutes,
                points: counters.monthly_points,
            },
            all_time: PeriodStats {
                minutes: counters.lifetime_minutes,
                points: counters.lifetime_points,
            },
            current_streak_days: counters.current_streak_days,
            longest_streak_days: counters.longest_streak_days,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub points: i64,
    pub minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseLeaderboardEntry {
    pub rank: u32,
    pub house_id: HouseId,
    pub points: i64,
}

/// Operational snapshot of the crash-recovery subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryStatus {
    pub restored_sessions: usize,
    pub closed_on_restore: usize,
    pub snapshots_written: u64,
    pub last_snapshot_at: Option<DateTime<Utc>>,
}
