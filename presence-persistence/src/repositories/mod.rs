pub mod ledger_repository;
pub mod snapshot_repository;

pub use ledger_repository::{CreditReceipt, LedgerRepository};
pub use snapshot_repository::SnapshotRepository;
