//! Settlement: turning provider-reported payment outcomes into ledger
//! transitions and, on first success, a seat.
//!
//! Every trigger (signed webhook, client confirmation, background sweep)
//! produces a [`SettlementSignal`] and hands it to
//! [`SettlementService::settle`]. The ledger's single-winner transition
//! serialises racing and duplicated signals before any capacity mutation, so
//! `try_admit` runs at most once per provider transaction.

use std::fmt;

use crate::domain::ports::ProviderIntentStatus;
use crate::domain::{PaymentStatus, ProviderTransactionId};

mod service;
mod signature;
mod sweep;
mod webhook;

pub use service::{SettlementPorts, SettlementService};
pub use signature::{SIGNATURE_HEADER, SignatureError, WebhookVerifier};
pub use sweep::{SettlementSweep, SweepConfig, SweepSummary};
pub use webhook::{WebhookEnvelope, WebhookEnvelopeError};

/// Which trigger produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalSource {
    /// Signed provider notification.
    Webhook,
    /// Client-initiated confirmation after polling the provider.
    Confirmation,
    /// Background reconciliation of stale pending obligations.
    Sweep,
}

impl SignalSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Confirmation => "confirmation",
            Self::Sweep => "sweep",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified, provider-reported outcome for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementSignal {
    pub provider_transaction_id: ProviderTransactionId,
    pub outcome: ProviderIntentStatus,
    pub source: SignalSource,
}

impl SettlementSignal {
    pub fn new(
        provider_transaction_id: ProviderTransactionId,
        outcome: ProviderIntentStatus,
        source: SignalSource,
    ) -> Self {
        Self {
            provider_transaction_id,
            outcome,
            source,
        }
    }
}

/// What one settlement call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettlementReport {
    /// This call completed the obligation and admitted the payer.
    Enrolled,
    /// Another signal already settled the obligation; nothing changed.
    AlreadySettled,
    /// The obligation is failed.
    Failed,
    /// The provider has not reached a final state yet.
    Processing,
    /// Money captured but no seat was available; recorded for operators.
    Conflict,
}

impl SettlementReport {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enrolled => "enrolled",
            Self::AlreadySettled => "already_settled",
            Self::Failed => "failed",
            Self::Processing => "processing",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SettlementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of settling one signal, with the obligation status as stored
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReceipt {
    pub provider_transaction_id: ProviderTransactionId,
    pub report: SettlementReport,
    pub status: PaymentStatus,
}

impl SettlementReceipt {
    /// Status shown to the payer.
    ///
    /// Conflicts are resolved out of band, so the payer sees `processing`.
    #[must_use]
    pub const fn user_status(&self) -> &'static str {
        match (self.report, self.status) {
            (SettlementReport::Conflict | SettlementReport::Processing, _)
            | (_, PaymentStatus::Pending) => "processing",
            (_, status) => status.as_str(),
        }
    }
}

/// Outcome of one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookReceipt {
    /// The delivery carried a settlement signal and was applied.
    Applied(SettlementReceipt),
    /// Event type not relevant to settlement; acknowledged only.
    Ignored { event_type: String },
    /// No obligation is recorded for the transaction yet; the sweep will
    /// settle it once the obligation exists.
    Unmatched {
        provider_transaction_id: ProviderTransactionId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn receipt(report: SettlementReport, status: PaymentStatus) -> SettlementReceipt {
        SettlementReceipt {
            provider_transaction_id: ProviderTransactionId::new("pi_1").expect("valid id"),
            report,
            status,
        }
    }

    #[rstest]
    #[case(SettlementReport::Enrolled, PaymentStatus::Completed, "completed")]
    #[case(SettlementReport::AlreadySettled, PaymentStatus::Completed, "completed")]
    #[case(SettlementReport::AlreadySettled, PaymentStatus::Failed, "failed")]
    #[case(SettlementReport::Failed, PaymentStatus::Failed, "failed")]
    #[case(SettlementReport::Processing, PaymentStatus::Pending, "processing")]
    #[case(SettlementReport::Conflict, PaymentStatus::Completed, "processing")]
    fn user_status_hides_conflicts(
        #[case] report: SettlementReport,
        #[case] status: PaymentStatus,
        #[case] expected: &str,
    ) {
        assert_eq!(receipt(report, status).user_status(), expected);
    }
}
