//! Background maintenance: the settlement sweep and event completion.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tokio::task::JoinHandle;
use tracing::error;

use gatherings::domain::ports::EventRepository;
use gatherings::domain::{EventService, SettlementSweep, TraceId};

/// Handles driven on every tick.
pub(crate) struct Maintenance {
    pub(crate) sweep: Arc<SettlementSweep>,
    pub(crate) events: Arc<EventService<dyn EventRepository>>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Maintenance {
    /// Run one sweep batch and complete elapsed events under a fresh
    /// trace id.
    pub(crate) async fn tick(&self) {
        TraceId::scope(TraceId::generate(), self.run_tick()).await;
    }

    async fn run_tick(&self) {
        let now = self.clock.utc();
        if let Err(err) = self.sweep.run_once(now).await {
            error!(error = %err, trace_id = ?err.trace_id(), "settlement sweep failed");
        }
        if let Err(err) = self.events.complete_elapsed(now).await {
            error!(error = %err, "event completion failed");
        }
    }

    /// Tick every `interval` until the runtime shuts down.
    ///
    /// The first tick is skipped so startup is not delayed by a sweep.
    pub(crate) fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }
}
