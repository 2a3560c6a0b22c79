pub mod credited_sessions;
pub mod house_counters;
pub mod prelude;
pub mod session_snapshots;
pub mod user_counters;
