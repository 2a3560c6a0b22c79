use serde::{Deserialize, Serialize};

pub const SECONDS_PER_MINUTE: i64 = 60;

/// How elapsed seconds become credited minutes. There is exactly one
/// policy in use; every boundary (session close, tier split, daily cap)
/// goes through it rather than truncating ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinuteRounding {
    FloorWholeMinutes,
}

pub const MINUTE_ROUNDING: MinuteRounding = MinuteRounding::FloorWholeMinutes;

impl MinuteRounding {
    pub fn minutes_from_seconds(&self, seconds: i64) -> i64 {
        match self {
            MinuteRounding::FloorWholeMinutes => seconds.max(0) / SECONDS_PER_MINUTE,
        }
    }
}

/// The non-linear accrual rules: a high-rate band over the first portion
/// of the user's running monthly minutes, a low rate beyond it, and a
/// daily ceiling past which minutes are recorded but earn nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualSchedule {
    /// Monthly minutes that earn the high rate before dropping to the low one.
    pub high_rate_minutes: i64,
    pub high_rate_points_per_minute: i64,
    pub low_rate_points_per_minute: i64,
    /// Daily ceiling of point-earning minutes.
    pub daily_cap_minutes: i64,
    /// Qualifying minutes in a local day required to extend a login streak.
    pub streak_minimum_minutes: i64,
}

impl Default for AccrualSchedule {
    fn default() -> Self {
        Self {
            high_rate_minutes: 60,
            high_rate_points_per_minute: 5,
            low_rate_points_per_minute: 2,
            daily_cap_minutes: 15 * 60,
            streak_minimum_minutes: 15,
        }
    }
}

/// Outcome of pushing one session's minutes through the schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualSplit {
    /// Minutes under the daily ceiling; these earn points.
    pub qualifying_minutes: i64,
    /// Minutes past the daily ceiling; recorded with zero points.
    pub overflow_minutes: i64,
    pub high_rate_minutes: i64,
    pub low_rate_minutes: i64,
    pub points: i64,
}

impl AccrualSchedule {
    /// Split a session's credited minutes across the tier boundary and the
    /// daily ceiling, given the user's minutes already on the books today
    /// and this month. A session straddling either boundary is divided
    /// proportionally; it is never rounded up into the richer band.
    pub fn split(
        &self,
        session_minutes: i64,
        prior_daily_minutes: i64,
        prior_monthly_minutes: i64,
    ) -> AccrualSplit {
        let session_minutes = session_minutes.max(0);

        let cap_room = (self.daily_cap_minutes - prior_daily_minutes).max(0);
        let qualifying = session_minutes.min(cap_room);
        let overflow = session_minutes - qualifying;

        let high_room = (self.high_rate_minutes - prior_monthly_minutes).max(0);
        let high = qualifying.min(high_room);
        let low = qualifying - high;

        AccrualSplit {
            qualifying_minutes: qualifying,
            overflow_minutes: overflow,
            high_rate_minutes: high,
            low_rate_minutes: low,
            points: high * self.high_rate_points_per_minute
                + low * self.low_rate_points_per_minute,
        }
    }

    /// Most points a single local day can yield, used to sanity-check the
    /// ledger invariant that daily points never exceed the cap's yield.
    pub fn max_daily_points(&self) -> i64 {
        let high = self.high_rate_minutes.min(self.daily_cap_minutes);
        let low = self.daily_cap_minutes - high;
        high * self.high_rate_points_per_minute + low * self.low_rate_points_per_minute
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_floors_whole_minutes() {
        assert_eq!(MINUTE_ROUNDING.minutes_from_seconds(0), 0);
        assert_eq!(MINUTE_ROUNDING.minutes_from_seconds(59), 0);
        assert_eq!(MINUTE_ROUNDING.minutes_from_seconds(600), 10);
        assert_eq!(MINUTE_ROUNDING.minutes_from_seconds(659), 10);
        assert_eq!(MINUTE_ROUNDING.minutes_from_seconds(-5), 0);
    }

    #[test]
    fn test_tier_split_straddling_boundary() {
        let schedule = AccrualSchedule::default();

        // Fresh month: 90 minutes -> 60 high-rate + 30 low-rate
        let split = schedule.split(90, 0, 0);
        assert_eq!(split.high_rate_minutes, 60);
        assert_eq!(split.low_rate_minutes, 30);
        assert_eq!(split.points, 60 * 5 + 30 * 2);
        assert_eq!(split.points, 360);
    }

    #[test]
    fn test_tier_exhausted_by_prior_monthly_minutes() {
        let schedule = AccrualSchedule::default();

        let split = schedule.split(90, 0, 60);
        assert_eq!(split.high_rate_minutes, 0);
        assert_eq!(split.low_rate_minutes, 90);
        assert_eq!(split.points, 180);

        // Partially consumed band
        let split = schedule.split(40, 0, 45);
        assert_eq!(split.high_rate_minutes, 15);
        assert_eq!(split.low_rate_minutes, 25);
        assert_eq!(split.points, 15 * 5 + 25 * 2);
    }

    #[test]
    fn test_daily_cap_stops_points_not_minutes() {
        let schedule = AccrualSchedule::default();

        // 20 hours in one day: only 15 hours qualify
        let split = schedule.split(20 * 60, 0, 0);
        assert_eq!(split.qualifying_minutes, 15 * 60);
        assert_eq!(split.overflow_minutes, 5 * 60);
        assert_eq!(split.points, 60 * 5 + (15 * 60 - 60) * 2);

        // Day already at the cap: everything overflows, zero points
        let split = schedule.split(120, 15 * 60, 200);
        assert_eq!(split.qualifying_minutes, 0);
        assert_eq!(split.overflow_minutes, 120);
        assert_eq!(split.points, 0);
    }

    #[test]
    fn test_split_points_never_exceed_daily_yield() {
        let schedule = AccrualSchedule::default();
        let split = schedule.split(48 * 60, 0, 0);
        assert_eq!(split.points, schedule.max_daily_points());
    }
}
