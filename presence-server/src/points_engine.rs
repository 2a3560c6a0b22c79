use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::EngineError;
use presence_core::{AccrualSchedule, Calendar, TimezoneDirectory};
use presence_persistence::repositories::{CreditReceipt, LedgerRepository};
use presence_types::ClosedSession;

/// Backoff for durable-store retries: delay doubles per failure and is
/// capped; the session itself is never dropped.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Converts closed sessions into durable ledger updates. Consumes the
/// hand-off channel from the session table, so crediting I/O happens
/// strictly outside the per-user session locks.
pub struct PointsEngine {
    ledger: Arc<LedgerRepository>,
    calendar: Calendar,
    schedule: AccrualSchedule,
    timezones: Arc<dyn TimezoneDirectory>,
    retry: RetryPolicy,
}

impl PointsEngine {
    pub fn new(
        ledger: Arc<LedgerRepository>,
        calendar: Calendar,
        schedule: AccrualSchedule,
        timezones: Arc<dyn TimezoneDirectory>,
    ) -> Self {
        Self {
            ledger,
            calendar,
            schedule,
            timezones,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The crediting calendar date: the session's end instant viewed in
    /// the user's zone. The external directory wins over the stored row;
    /// any failure degrades to the default zone rather than blocking.
    async fn local_date_for(&self, session: &ClosedSession) -> NaiveDate {
        let ident = match self.timezones.timezone_for(session.user_id) {
            Some(ident) => Some(ident),
            None => match self.ledger.get_timezone(session.user_id).await {
                Ok(stored) => stored,
                Err(err) => {
                    warn!(
                        "Timezone lookup failed for user {}: {}; using default zone",
                        session.user_id, err
                    );
                    None
                }
            },
        };
        let zone = self.calendar.resolve_zone(ident.as_deref());
        self.calendar.local_date(session.ended_at, zone)
    }

    pub async fn credit_once(&self, session: &ClosedSession) -> Result<CreditReceipt, EngineError> {
        let local_date = self.local_date_for(session).await;
        let receipt = self
            .ledger
            .credit(session, local_date, &self.schedule)
            .await
            .map_err(EngineError::Store)?;
        Ok(receipt)
    }

    /// Credit with retry until the store commits. Safe to re-run after a
    /// partial failure: the idempotency marker turns replays into no-ops.
    pub async fn credit_until_committed(&self, session: &ClosedSession) -> CreditReceipt {
        let mut delay = self.retry.initial_delay;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.credit_once(session).await {
                Ok(receipt) => {
                    if receipt.already_credited {
                        info!("Session {} was already credited; skipping", session.id);
                    } else {
                        info!(
                            "Credited session {} for user {}: {} minutes, {} points",
                            session.id, session.user_id, session.credited_minutes, receipt.points
                        );
                    }
                    return receipt;
                }
                Err(err) => {
                    warn!(
                        "Credit attempt {} for session {} failed: {}; retrying in {:?}",
                        attempt, session.id, err, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.retry.max_delay);
                }
            }
        }
    }

    /// Drain the closed-session channel until the table side hangs up.
    /// One user's store trouble delays the queue, not the session table.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<ClosedSession>) {
        while let Some(session) = rx.recv().await {
            self.credit_until_committed(&session).await;
        }
        info!("Closed-session channel drained; points engine stopped");
    }
}
