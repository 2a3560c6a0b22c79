use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use presence_types::UserId;

/// Looks up a user's configured timezone. Backed by the counters table in
/// production; tests substitute a fixed map.
pub trait TimezoneDirectory: Send + Sync {
    fn timezone_for(&self, user_id: UserId) -> Option<String>;
}

/// Directory that answers the same zone for everyone. Useful as a default
/// and in tests.
pub struct FixedTimezoneDirectory {
    zone: Option<String>,
}

impl FixedTimezoneDirectory {
    pub fn new(zone: Option<String>) -> Self {
        Self { zone }
    }
}

impl TimezoneDirectory for FixedTimezoneDirectory {
    fn timezone_for(&self, _user_id: UserId) -> Option<String> {
        self.zone.clone()
    }
}

/// Resolves user timezones and computes local calendar boundaries.
/// Day and month rollover always happen in the user's own zone, never UTC.
#[derive(Debug, Clone)]
pub struct Calendar {
    default_zone: Tz,
}

impl Calendar {
    pub fn new(default_zone: Tz) -> Self {
        Self { default_zone }
    }

    pub fn default_zone(&self) -> Tz {
        self.default_zone
    }

    /// Parse a stored zone identifier, falling back to the default zone.
    /// Resolution failure is degraded service, never an error: crediting
    /// must not block on a bad timezone string.
    pub fn resolve_zone(&self, raw: Option<&str>) -> Tz {
        match raw {
            None => self.default_zone,
            Some(ident) => match ident.parse::<Tz>() {
                Ok(zone) => zone,
                Err(_) => {
                    warn!(
                        "Unknown timezone identifier '{}', falling back to {}",
                        ident, self.default_zone
                    );
                    self.default_zone
                }
            },
        }
    }

    /// The calendar date of `at` as seen from `zone`.
    pub fn local_date(&self, at: DateTime<Utc>, zone: Tz) -> NaiveDate {
        zone.from_utc_datetime(&at.naive_utc()).date_naive()
    }
}

/// True when both dates fall in the same calendar month.
pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Whole days from `earlier` to `later`; negative if out of order.
pub fn day_gap(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}
