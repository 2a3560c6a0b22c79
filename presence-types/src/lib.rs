pub mod counters;
pub mod events;
pub mod session;
pub mod stats;

// Re-export all types
pub use counters::*;
pub use events::*;
pub use session::*;
pub use stats::*;

pub type UserId = uuid::Uuid;
pub type HouseId = String;
pub type RoomId = String;
