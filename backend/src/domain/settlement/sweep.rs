//! Reconciliation sweep for obligations stuck in `pending`.
//!
//! A payment attempt that timed out mid-provider-call, or whose webhook was
//! never delivered, leaves its obligation pending. The sweep asks the
//! provider for the final status and feeds it through the same idempotent
//! settlement path as the other triggers.
//!
//! Each run claims its batch from the ledger, which stamps the rows as
//! examined, so obligations the provider keeps pending rotate behind the
//! rest instead of pinning the batch. A second pass finishes completed
//! obligations whose seat was never resolved because the settling call
//! failed after the transition.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, warn};

use crate::domain::Error;
use crate::domain::ports::PaymentLedger;
use crate::domain::rejection::map_ledger_error;

use super::{SettlementReport, SettlementService, SettlementSignal, SignalSource};

/// Sweep window and batch bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Obligations younger than this are left to the other triggers.
    pub pending_after: Duration,
    /// Maximum obligations claimed per pass.
    pub batch_size: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            pending_after: Duration::from_secs(900),
            batch_size: 50,
        }
    }
}

/// Counts from one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub examined: usize,
    pub settled: usize,
    pub still_pending: usize,
    /// Unresolved completions finished by the repair pass.
    pub repaired: usize,
    pub errors: usize,
}

impl SweepSummary {
    /// Whether the run touched any obligation.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.examined == 0 && self.repaired == 0 && self.errors == 0
    }
}

/// Periodic reconciler over stale pending obligations.
pub struct SettlementSweep {
    ledger: Arc<dyn PaymentLedger>,
    settlement: Arc<SettlementService>,
    config: SweepConfig,
}

impl SettlementSweep {
    pub fn new(
        ledger: Arc<dyn PaymentLedger>,
        settlement: Arc<SettlementService>,
        config: SweepConfig,
    ) -> Self {
        Self {
            ledger,
            settlement,
            config,
        }
    }

    /// Examine one batch of stale obligations, then repair one batch of
    /// unresolved completions.
    ///
    /// A failure for one obligation is logged and counted; it never aborts
    /// the batch. Only a failure to claim a batch is returned.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<SweepSummary, Error> {
        let window = TimeDelta::from_std(self.config.pending_after).unwrap_or(TimeDelta::MAX);
        let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut summary = SweepSummary::default();
        self.settle_stale(cutoff, now, &mut summary).await?;
        self.repair_unseated(cutoff, now, &mut summary).await?;

        if !summary.is_idle() {
            info!(
                examined = summary.examined,
                settled = summary.settled,
                still_pending = summary.still_pending,
                repaired = summary.repaired,
                errors = summary.errors,
                "settlement sweep finished"
            );
        }
        Ok(summary)
    }

    async fn settle_stale(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        summary: &mut SweepSummary,
    ) -> Result<(), Error> {
        let stale = self
            .ledger
            .claim_stale_pending(cutoff, now, self.config.batch_size)
            .await
            .map_err(map_ledger_error)?;
        summary.examined = stale.len();

        for obligation in stale {
            let txn = obligation.provider_transaction_id;
            let outcome = match self.settlement.provider_status(&txn).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(
                        provider_transaction_id = %txn,
                        error = %err,
                        "sweep could not read intent"
                    );
                    summary.errors += 1;
                    continue;
                }
            };
            let signal = SettlementSignal::new(txn, outcome, SignalSource::Sweep);
            match self.settlement.settle(&signal).await {
                Ok(settled) if settled.report == SettlementReport::Processing => {
                    summary.still_pending += 1;
                }
                Ok(_) => summary.settled += 1,
                Err(err) => {
                    warn!(
                        provider_transaction_id = %signal.provider_transaction_id,
                        error = %err,
                        "sweep could not settle obligation"
                    );
                    summary.errors += 1;
                }
            }
        }
        Ok(())
    }

    async fn repair_unseated(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        summary: &mut SweepSummary,
    ) -> Result<(), Error> {
        let unseated = self
            .ledger
            .claim_unseated_completions(cutoff, now, self.config.batch_size)
            .await
            .map_err(map_ledger_error)?;

        for obligation in unseated {
            match self.settlement.repair_seat(&obligation).await {
                Ok(_) => summary.repaired += 1,
                Err(err) => {
                    warn!(
                        provider_transaction_id = %obligation.provider_transaction_id,
                        error = %err,
                        "sweep could not repair completion"
                    );
                    summary.errors += 1;
                }
            }
        }
        Ok(())
    }
}
