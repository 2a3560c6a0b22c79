pub use super::credited_sessions::Entity as CreditedSessions;
pub use super::house_counters::Entity as HouseCounters;
pub use super::session_snapshots::Entity as SessionSnapshots;
pub use super::user_counters::Entity as UserCounters;
