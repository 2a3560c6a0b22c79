pub mod accrual;
pub mod calendar;
pub mod ledger;
pub mod session;

// Re-export main components
pub use accrual::*;
pub use calendar::*;
pub use ledger::*;
pub use session::*;
