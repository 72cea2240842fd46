//! Idempotent settlement of provider-reported outcomes.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, error, info, warn};

use crate::domain::capacity_guard::CapacityGuard;
use crate::domain::ports::{
    EventCapacityStore, EventCapacityStoreError, PaymentLedger, PaymentLedgerError,
    PaymentProvider, ProviderIntentStatus, SettlementCommand, SettlementConflictRepository,
    SettlementMetrics,
};
use crate::domain::provider_retry::ProviderRetry;
use crate::domain::rejection::{
    map_capacity_store_error, map_conflict_repository_error, map_ledger_error,
    map_provider_error,
};
use crate::domain::{
    AdmitOutcome, ConflictReason, Error, Identity, PaymentObligation, PaymentStatus,
    ProviderTransactionId, Rejection, SettlementConflict, TerminalStatus, TransitionOutcome,
};

use super::{
    SettlementReceipt, SettlementReport, SettlementSignal, SignalSource, WebhookEnvelope,
    WebhookReceipt, WebhookVerifier,
};

/// Port bundle required by settlement.
#[derive(Clone)]
pub struct SettlementPorts {
    pub ledger: Arc<dyn PaymentLedger>,
    pub capacity: Arc<dyn EventCapacityStore>,
    pub conflicts: Arc<dyn SettlementConflictRepository>,
    pub provider: Arc<dyn PaymentProvider>,
    pub metrics: Arc<dyn SettlementMetrics>,
}

/// Settlement service implementing [`SettlementCommand`].
pub struct SettlementService {
    ledger: Arc<dyn PaymentLedger>,
    guard: CapacityGuard<dyn EventCapacityStore>,
    conflicts: Arc<dyn SettlementConflictRepository>,
    provider: Arc<dyn PaymentProvider>,
    metrics: Arc<dyn SettlementMetrics>,
    verifier: WebhookVerifier,
    retry: ProviderRetry,
    clock: Arc<dyn Clock>,
}

fn receipt(
    provider_transaction_id: &ProviderTransactionId,
    report: SettlementReport,
    status: PaymentStatus,
) -> SettlementReceipt {
    SettlementReceipt {
        provider_transaction_id: provider_transaction_id.clone(),
        report,
        status,
    }
}

impl SettlementService {
    pub fn new(
        ports: SettlementPorts,
        verifier: WebhookVerifier,
        retry: ProviderRetry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger: ports.ledger,
            guard: CapacityGuard::new(ports.capacity),
            conflicts: ports.conflicts,
            provider: ports.provider,
            metrics: ports.metrics,
            verifier,
            retry,
            clock,
        }
    }

    /// Apply one verified signal.
    ///
    /// Fails with `obligation_not_found` when no obligation is recorded for
    /// the transaction.
    pub async fn settle(&self, signal: &SettlementSignal) -> Result<SettlementReceipt, Error> {
        self.settle_known(signal)
            .await?
            .ok_or_else(|| Rejection::ObligationNotFound.into())
    }

    /// Provider's current view of an intent, with transient failures retried.
    pub(crate) async fn provider_status(
        &self,
        provider_transaction_id: &ProviderTransactionId,
    ) -> Result<ProviderIntentStatus, Error> {
        let intent = self
            .retry
            .run("retrieve_intent", || {
                self.provider.retrieve_intent(provider_transaction_id)
            })
            .await
            .map_err(|err| map_provider_error(&err))?;
        Ok(intent.status)
    }

    /// `Ok(None)` when the ledger has no obligation for the transaction.
    async fn settle_known(
        &self,
        signal: &SettlementSignal,
    ) -> Result<Option<SettlementReceipt>, Error> {
        let txn = &signal.provider_transaction_id;
        let settled = match signal.outcome {
            ProviderIntentStatus::Pending => Some(receipt(
                txn,
                SettlementReport::Processing,
                PaymentStatus::Pending,
            )),
            ProviderIntentStatus::Failed => self.settle_failure(signal).await?,
            ProviderIntentStatus::Succeeded => self.settle_success(signal).await?,
        };
        if let Some(settled) = &settled {
            self.record_metric(signal.source, settled.report).await;
        }
        Ok(settled)
    }

    async fn transition(
        &self,
        txn: &ProviderTransactionId,
        target: TerminalStatus,
    ) -> Result<Option<TransitionOutcome>, Error> {
        match self
            .ledger
            .transition_once(txn, target, self.clock.utc())
            .await
        {
            Ok(outcome) => Ok(Some(outcome)),
            Err(PaymentLedgerError::NotFound { .. }) => Ok(None),
            Err(err) => Err(map_ledger_error(err)),
        }
    }

    async fn settle_failure(
        &self,
        signal: &SettlementSignal,
    ) -> Result<Option<SettlementReceipt>, Error> {
        let txn = &signal.provider_transaction_id;
        let Some(outcome) = self.transition(txn, TerminalStatus::Failed).await? else {
            return Ok(None);
        };
        let settled = match outcome {
            TransitionOutcome::Applied(obligation) => {
                info!(
                    provider_transaction_id = %txn,
                    event_id = %obligation.event_id,
                    source = %signal.source,
                    outcome = "failed",
                    "payment failed"
                );
                receipt(txn, SettlementReport::Failed, obligation.status)
            }
            TransitionOutcome::AlreadyTerminal(obligation) => {
                debug!(
                    provider_transaction_id = %txn,
                    source = %signal.source,
                    status = obligation.status.as_str(),
                    "failure signal for settled obligation ignored"
                );
                receipt(txn, SettlementReport::AlreadySettled, obligation.status)
            }
        };
        Ok(Some(settled))
    }

    async fn settle_success(
        &self,
        signal: &SettlementSignal,
    ) -> Result<Option<SettlementReceipt>, Error> {
        let txn = &signal.provider_transaction_id;
        let Some(outcome) = self.transition(txn, TerminalStatus::Completed).await? else {
            return Ok(None);
        };
        let obligation = match outcome {
            TransitionOutcome::Applied(obligation) => obligation,
            TransitionOutcome::AlreadyTerminal(obligation)
                if obligation.status == PaymentStatus::Failed =>
            {
                warn!(
                    provider_transaction_id = %txn,
                    source = %signal.source,
                    "success reported for a failed obligation"
                );
                self.record_conflict(
                    &obligation,
                    ConflictReason::SucceededAfterFailure,
                    signal.source,
                )
                .await?;
                return Ok(Some(receipt(
                    txn,
                    SettlementReport::Conflict,
                    obligation.status,
                )));
            }
            TransitionOutcome::AlreadyTerminal(obligation) => {
                debug!(
                    provider_transaction_id = %txn,
                    source = %signal.source,
                    "duplicate success signal ignored"
                );
                return Ok(Some(receipt(
                    txn,
                    SettlementReport::AlreadySettled,
                    obligation.status,
                )));
            }
        };

        let report = self.admit_payer(&obligation, signal.source).await?;
        self.resolve_seat(&obligation).await;
        Ok(Some(receipt(txn, report, obligation.status)))
    }

    /// Close out the seat of a completed obligation. A failed write leaves
    /// the obligation for the sweep's repair pass.
    async fn resolve_seat(&self, obligation: &PaymentObligation) {
        if let Err(err) = self
            .ledger
            .mark_seat_resolved(&obligation.provider_transaction_id, self.clock.utc())
            .await
        {
            warn!(
                provider_transaction_id = %obligation.provider_transaction_id,
                error = %err,
                "seat resolution not recorded"
            );
        }
    }

    /// Finish a completed obligation whose seat was never resolved, without
    /// admitting again.
    ///
    /// A payer already seated needs nothing further. Otherwise the conflict
    /// the settling call could not record is recorded now. The obligation
    /// is marked resolved only once one of the two holds.
    pub(crate) async fn repair_seat(
        &self,
        obligation: &PaymentObligation,
    ) -> Result<SettlementReport, Error> {
        let seated = self
            .guard
            .holds_seat(&obligation.event_id, &obligation.payer_id)
            .await;
        let report = match seated {
            Ok(true) => SettlementReport::Enrolled,
            Ok(false) => {
                self.record_conflict(
                    obligation,
                    ConflictReason::AdmissionFailed,
                    SignalSource::Sweep,
                )
                .await?;
                SettlementReport::Conflict
            }
            Err(EventCapacityStoreError::EventNotFound { .. }) => {
                self.record_conflict(
                    obligation,
                    ConflictReason::EventMissing,
                    SignalSource::Sweep,
                )
                .await?;
                SettlementReport::Conflict
            }
            Err(err) => return Err(map_capacity_store_error(err)),
        };
        self.ledger
            .mark_seat_resolved(&obligation.provider_transaction_id, self.clock.utc())
            .await
            .map_err(map_ledger_error)?;
        info!(
            provider_transaction_id = %obligation.provider_transaction_id,
            event_id = %obligation.event_id,
            outcome = report.as_str(),
            "unresolved completion repaired"
        );
        Ok(report)
    }

    async fn admit_payer(
        &self,
        obligation: &PaymentObligation,
        source: SignalSource,
    ) -> Result<SettlementReport, Error> {
        let admitted = self
            .guard
            .admit(&obligation.event_id, &obligation.payer_id)
            .await;
        let reason = match admitted {
            Ok(AdmitOutcome::Admitted) => {
                info!(
                    provider_transaction_id = %obligation.provider_transaction_id,
                    event_id = %obligation.event_id,
                    source = %source,
                    outcome = "enrolled",
                    "payment settled and payer enrolled"
                );
                return Ok(SettlementReport::Enrolled);
            }
            Ok(AdmitOutcome::AlreadyMember) => ConflictReason::AlreadyEnrolled,
            Ok(AdmitOutcome::Full) => ConflictReason::EventFull,
            Ok(AdmitOutcome::NotJoinable) => ConflictReason::EventNotJoinable,
            Err(EventCapacityStoreError::EventNotFound { .. }) => ConflictReason::EventMissing,
            Err(err) => {
                error!(
                    provider_transaction_id = %obligation.provider_transaction_id,
                    event_id = %obligation.event_id,
                    error = %err,
                    "admission failed after payment completed"
                );
                ConflictReason::AdmissionFailed
            }
        };
        self.record_conflict(obligation, reason, source).await?;
        Ok(SettlementReport::Conflict)
    }

    async fn record_conflict(
        &self,
        obligation: &PaymentObligation,
        reason: ConflictReason,
        source: SignalSource,
    ) -> Result<(), Error> {
        let conflict = SettlementConflict::for_obligation(obligation, reason, self.clock.utc());
        error!(
            provider_transaction_id = %obligation.provider_transaction_id,
            event_id = %obligation.event_id,
            payer_id = %obligation.payer_id,
            source = %source,
            reason = reason.as_str(),
            outcome = "conflict",
            "payment completed without a seat"
        );
        match self.conflicts.record(&conflict).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(
                    provider_transaction_id = %obligation.provider_transaction_id,
                    "settlement conflict already recorded"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    provider_transaction_id = %obligation.provider_transaction_id,
                    error = %err,
                    "settlement conflict could not be recorded"
                );
                Err(map_conflict_repository_error(err))
            }
        }
    }

    async fn already_settled(
        &self,
        provider_transaction_id: &ProviderTransactionId,
        status: PaymentStatus,
    ) -> SettlementReceipt {
        let settled = receipt(provider_transaction_id, SettlementReport::AlreadySettled, status);
        self.record_metric(SignalSource::Confirmation, settled.report)
            .await;
        settled
    }

    async fn record_metric(&self, source: SignalSource, report: SettlementReport) {
        if let Err(err) = self.metrics.record(source, report).await {
            debug!(error = %err, "settlement metric not recorded");
        }
    }
}

#[async_trait]
impl SettlementCommand for SettlementService {
    async fn handle_webhook<'a>(
        &self,
        payload: &[u8],
        signature_header: Option<&'a str>,
    ) -> Result<WebhookReceipt, Error> {
        if let Err(err) = self.verifier.verify(payload, signature_header) {
            warn!(error = %err, "webhook rejected");
            return Err(Rejection::InvalidSignature.into());
        }
        let envelope = WebhookEnvelope::parse(payload).map_err(|err| {
            warn!(error = %err, "webhook envelope rejected");
            Error::from(Rejection::InvalidEnvelope)
        })?;
        let (Some(outcome), Some(object_id)) = (envelope.outcome(), envelope.object_id) else {
            debug!(event_type = %envelope.event_type, "webhook type ignored");
            return Ok(WebhookReceipt::Ignored {
                event_type: envelope.event_type,
            });
        };

        let signal = SettlementSignal::new(object_id, outcome, SignalSource::Webhook);
        match self.settle_known(&signal).await? {
            Some(settled) => Ok(WebhookReceipt::Applied(settled)),
            None => {
                warn!(
                    provider_transaction_id = %signal.provider_transaction_id,
                    "webhook for unknown obligation acknowledged"
                );
                Ok(WebhookReceipt::Unmatched {
                    provider_transaction_id: signal.provider_transaction_id,
                })
            }
        }
    }

    async fn confirm(
        &self,
        caller: &Identity,
        provider_transaction_id: &ProviderTransactionId,
    ) -> Result<SettlementReceipt, Error> {
        let obligation = self
            .ledger
            .find_by_transaction(provider_transaction_id)
            .await
            .map_err(map_ledger_error)?
            .ok_or(Rejection::ObligationNotFound)?;
        if !caller.acts_for(&obligation.payer_id) {
            return Err(Error::forbidden("only the payer may confirm this payment"));
        }
        if obligation.status == PaymentStatus::Completed {
            return Ok(self.already_settled(provider_transaction_id, obligation.status).await);
        }

        // A failure may still be overturned; only the provider can say.
        let outcome = self.provider_status(provider_transaction_id).await?;
        if obligation.status == PaymentStatus::Failed
            && outcome != ProviderIntentStatus::Succeeded
        {
            return Ok(self.already_settled(provider_transaction_id, obligation.status).await);
        }
        let signal = SettlementSignal::new(
            provider_transaction_id.clone(),
            outcome,
            SignalSource::Confirmation,
        );
        self.settle(&signal).await
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
