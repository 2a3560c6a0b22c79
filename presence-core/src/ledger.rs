use chrono::NaiveDate;

use crate::accrual::{AccrualSchedule, AccrualSplit};
use crate::calendar::{day_gap, same_month};
use presence_types::UserCounters;

/// What one credit did to a user's ledger, reported back so the same unit
/// of work can mirror the points onto the user's house.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditOutcome {
    pub split: AccrualSplit,
    pub rolled_day: bool,
    pub rolled_month: bool,
    pub streak_extended: bool,
}

/// Zero the daily (and, on a month change, monthly) windows when the local
/// date moved past the last credited one. A gap of more than one idle day
/// also forfeits the running streak. Returns (rolled_day, rolled_month).
///
/// Windows only roll forward: a credit whose resolved zone presents an
/// earlier local date (westward zone change) must not zero a window that
/// has already advanced.
pub fn rollover_if_needed(counters: &mut UserCounters, today: NaiveDate) -> (bool, bool) {
    let Some(last) = counters.last_credited_local_date else {
        return (false, false);
    };
    if today <= last {
        return (false, false);
    }

    counters.daily_minutes = 0;
    counters.daily_points = 0;

    let rolled_month = !same_month(last, today);
    if rolled_month {
        counters.monthly_minutes = 0;
        counters.monthly_points = 0;
    }

    if day_gap(last, today) > 1 {
        counters.current_streak_days = 0;
    }

    (true, rolled_month)
}

/// Apply one closed session's credited minutes to the ledger, in the
/// user's local calendar. Minutes always land in full (the daily cap stops
/// points, not recording); points follow the schedule's split against the
/// pre-credit daily and monthly totals.
pub fn apply_credit(
    counters: &mut UserCounters,
    schedule: &AccrualSchedule,
    credited_minutes: i64,
    local_date: NaiveDate,
) -> CreditOutcome {
    let (rolled_day, rolled_month) = rollover_if_needed(counters, local_date);

    let split = schedule.split(
        credited_minutes,
        counters.daily_minutes,
        counters.monthly_minutes,
    );

    let before_daily = counters.daily_minutes;

    counters.daily_minutes += credited_minutes;
    counters.monthly_minutes += credited_minutes;
    counters.lifetime_minutes += credited_minutes;

    counters.daily_points += split.points;
    counters.monthly_points += split.points;
    counters.lifetime_points += split.points;

    // The streak extends once per local day, the moment the day's minutes
    // first reach the threshold. rollover_if_needed already forfeited the
    // streak when more than one idle day passed.
    let streak_extended = before_daily < schedule.streak_minimum_minutes
        && counters.daily_minutes >= schedule.streak_minimum_minutes;
    if streak_extended {
        counters.current_streak_days += 1;
        counters.longest_streak_days = counters
            .longest_streak_days
            .max(counters.current_streak_days);
    }

    counters.last_credited_local_date = Some(
        counters
            .last_credited_local_date
            .map_or(local_date, |last| last.max(local_date)),
    );

    CreditOutcome {
        split,
        rolled_day,
        rolled_month,
        streak_extended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn fresh_counters() -> UserCounters {
        UserCounters::new(Uuid::new_v4())
    }

    #[test]
    fn test_first_credit_starts_streak() {
        let mut counters = fresh_counters();
        let schedule = AccrualSchedule::default();

        let outcome = apply_credit(&mut counters, &schedule, 30, date("2024-05-01"));

        assert!(outcome.streak_extended);
        assert_eq!(counters.current_streak_days, 1);
        assert_eq!(counters.daily_minutes, 30);
        assert_eq!(counters.daily_points, 30 * 5);
        assert_eq!(counters.last_credited_local_date, Some(date("2024-05-01")));
    }

    #[test]
    fn test_streak_continuity_over_consecutive_days() {
        let mut counters = fresh_counters();
        let schedule = AccrualSchedule::default();

        apply_credit(&mut counters, &schedule, 20, date("2024-05-01"));
        apply_credit(&mut counters, &schedule, 20, date("2024-05-02"));
        apply_credit(&mut counters, &schedule, 20, date("2024-05-03"));

        assert_eq!(counters.current_streak_days, 3);
        assert_eq!(counters.longest_streak_days, 3);
    }

    #[test]
    fn test_skipped_day_resets_streak_to_one() {
        let mut counters = fresh_counters();
        let schedule = AccrualSchedule::default();

        apply_credit(&mut counters, &schedule, 20, date("2024-05-01"));
        apply_credit(&mut counters, &schedule, 20, date("2024-05-02"));
        // Nothing on the 3rd
        apply_credit(&mut counters, &schedule, 20, date("2024-05-04"));

        assert_eq!(counters.current_streak_days, 1);
        assert_eq!(counters.longest_streak_days, 2);
    }

    #[test]
    fn test_below_threshold_day_does_not_extend() {
        let mut counters = fresh_counters();
        let schedule = AccrualSchedule::default();

        apply_credit(&mut counters, &schedule, 10, date("2024-05-01"));
        assert_eq!(counters.current_streak_days, 0);

        // Second short session the same day crosses the threshold
        apply_credit(&mut counters, &schedule, 10, date("2024-05-01"));
        assert_eq!(counters.current_streak_days, 1);

        // A third session that day must not count twice
        apply_credit(&mut counters, &schedule, 60, date("2024-05-01"));
        assert_eq!(counters.current_streak_days, 1);
    }

    #[test]
    fn test_earlier_local_date_never_rolls_backward() {
        let mut counters = fresh_counters();
        let schedule = AccrualSchedule::default();

        apply_credit(&mut counters, &schedule, 30, date("2024-09-01"));
        // Resolved in a zone west of the first credit's, still August there
        let outcome = apply_credit(&mut counters, &schedule, 30, date("2024-08-31"));

        assert!(!outcome.rolled_day);
        assert!(!outcome.rolled_month);
        assert_eq!(counters.daily_minutes, 60);
        assert_eq!(counters.monthly_minutes, 60);
        assert_eq!(counters.last_credited_local_date, Some(date("2024-09-01")));
    }

    #[test]
    fn test_day_rollover_zeroes_daily_only() {
        let mut counters = fresh_counters();
        let schedule = AccrualSchedule::default();

        apply_credit(&mut counters, &schedule, 90, date("2024-05-01"));
        let monthly_before = counters.monthly_minutes;

        let outcome = apply_credit(&mut counters, &schedule, 30, date("2024-05-02"));

        assert!(outcome.rolled_day);
        assert!(!outcome.rolled_month);
        assert_eq!(counters.daily_minutes, 30);
        assert_eq!(counters.monthly_minutes, monthly_before + 30);
        // High-rate band already spent in this month
        assert_eq!(counters.daily_points, 30 * 2);
    }

    #[test]
    fn test_month_rollover_zeroes_monthly_and_restores_rate() {
        let mut counters = fresh_counters();
        let schedule = AccrualSchedule::default();

        apply_credit(&mut counters, &schedule, 120, date("2024-05-31"));
        let outcome = apply_credit(&mut counters, &schedule, 30, date("2024-06-01"));

        assert!(outcome.rolled_month);
        assert_eq!(counters.monthly_minutes, 30);
        // Fresh month, back on the high rate
        assert_eq!(counters.daily_points, 30 * 5);
        assert_eq!(
            counters.lifetime_minutes,
            150,
            "lifetime never resets"
        );
    }

    #[test]
    fn test_daily_points_capped_at_schedule_yield() {
        let mut counters = fresh_counters();
        let schedule = AccrualSchedule::default();

        apply_credit(&mut counters, &schedule, 20 * 60, date("2024-05-01"));

        assert_eq!(counters.daily_minutes, 20 * 60);
        assert_eq!(counters.daily_points, schedule.max_daily_points());

        // Another session the same day earns nothing more
        apply_credit(&mut counters, &schedule, 60, date("2024-05-01"));
        assert_eq!(counters.daily_points, schedule.max_daily_points());
        assert_eq!(counters.daily_minutes, 21 * 60);
    }
}
