//! Periodic promotion of overdue items to `PAST_DUE`.

use std::{sync::Arc, time::Duration};

use todo_api::v1::TodoStatus;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{clock::Clock, error::StoreError, store::ItemStore};

#[derive(Clone)]
pub struct OverdueSweeper {
    store: Arc<dyn ItemStore>,
    clock: Arc<dyn Clock>,
}

impl OverdueSweeper {
    pub fn new(store: Arc<dyn ItemStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Marks every `NOT_DONE` item whose due time has passed as `PAST_DUE`
    /// and returns how many were changed.
    pub fn sweep(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut overdue = self.store.list_due_before(TodoStatus::NotDone, now)?;

        if overdue.is_empty() {
            return Ok(0);
        }

        for item in &mut overdue {
            item.mark_past_due();
        }
        self.store.save_all(&overdue)?;

        Ok(overdue.len())
    }

    pub fn spawn(self, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval = ?every, "overdue sweeper started");

            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }

                match self.sweep() {
                    Ok(0) => debug!("no overdue items"),
                    Ok(count) => info!(count, "marked items past due"),
                    Err(err) => error!("overdue sweep failed: {:?}", err),
                }
            }

            info!("overdue sweeper stopped");
        })
    }
}
