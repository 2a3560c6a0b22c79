use std::env;

use chrono::Duration;
use presence_core::{AccrualSchedule, GracePolicy};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub default_timezone: String,
    pub grace_window_seconds: i64,
    pub sweep_interval_seconds: u64,
    pub snapshot_interval_seconds: u64,
    pub high_rate_minutes: i64,
    pub high_rate_points_per_minute: i64,
    pub low_rate_points_per_minute: i64,
    pub daily_cap_minutes: i64,
    pub streak_minimum_minutes: i64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("Invalid PORT"),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://presence_ledger.db?mode=rwc".to_string()),
            default_timezone: env::var("DEFAULT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
            grace_window_seconds: env::var("GRACE_WINDOW_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("Invalid GRACE_WINDOW_SECONDS"),
            sweep_interval_seconds: env::var("SWEEP_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "45".to_string())
                .parse()
                .expect("Invalid SWEEP_INTERVAL_SECONDS"),
            snapshot_interval_seconds: env::var("SNAPSHOT_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .expect("Invalid SNAPSHOT_INTERVAL_SECONDS"),
            high_rate_minutes: env::var("HIGH_RATE_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("Invalid HIGH_RATE_MINUTES"),
            high_rate_points_per_minute: env::var("HIGH_RATE_POINTS_PER_MINUTE")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("Invalid HIGH_RATE_POINTS_PER_MINUTE"),
            low_rate_points_per_minute: env::var("LOW_RATE_POINTS_PER_MINUTE")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .expect("Invalid LOW_RATE_POINTS_PER_MINUTE"),
            daily_cap_minutes: env::var("DAILY_CAP_MINUTES")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .expect("Invalid DAILY_CAP_MINUTES"),
            streak_minimum_minutes: env::var("STREAK_MINIMUM_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .expect("Invalid STREAK_MINIMUM_MINUTES"),
        }
    }

    pub fn grace_policy(&self) -> GracePolicy {
        GracePolicy::with_window(Duration::seconds(self.grace_window_seconds))
    }

    pub fn accrual_schedule(&self) -> AccrualSchedule {
        AccrualSchedule {
            high_rate_minutes: self.high_rate_minutes,
            high_rate_points_per_minute: self.high_rate_points_per_minute,
            low_rate_points_per_minute: self.low_rate_points_per_minute,
            daily_cap_minutes: self.daily_cap_minutes,
            streak_minimum_minutes: self.streak_minimum_minutes,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
