//! Provider notification envelope.
//!
//! Shape: `{ "type": ..., "data": { "object": { "id", "status", "metadata" } } }`.
//! Only the two payment-intent outcomes carry a settlement signal and must
//! name their object; every other type is acknowledged and ignored, with or
//! without an object id.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::ports::ProviderIntentStatus;
use crate::domain::{PaymentValidationError, ProviderTransactionId};

const SUCCEEDED: &str = "payment_intent.succeeded";
const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// Reasons a notification body cannot be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum WebhookEnvelopeError {
    #[error("webhook body is not a valid envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("webhook object id is invalid: {0}")]
    InvalidObjectId(#[from] PaymentValidationError),
    #[error("{event_type} webhook carries no object id")]
    MissingObjectId { event_type: String },
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: RawData,
}

#[derive(Debug, Deserialize)]
struct RawData {
    object: RawObject,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Parsed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEnvelope {
    pub event_type: String,
    /// Always present when [`WebhookEnvelope::outcome`] is `Some`.
    pub object_id: Option<ProviderTransactionId>,
    pub object_status: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl WebhookEnvelope {
    /// Parse a raw, already verified body.
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookEnvelopeError> {
        let raw: RawEnvelope = serde_json::from_slice(payload)?;
        let object = raw.data.object;
        let object_id = if outcome_for(&raw.event_type).is_some() {
            let id = object.id.ok_or_else(|| WebhookEnvelopeError::MissingObjectId {
                event_type: raw.event_type.clone(),
            })?;
            Some(ProviderTransactionId::new(id)?)
        } else {
            object.id.and_then(|id| ProviderTransactionId::new(id).ok())
        };
        Ok(Self {
            event_type: raw.event_type,
            object_id,
            object_status: object.status,
            metadata: object.metadata,
        })
    }

    /// Settlement outcome carried by this notification, if any.
    #[must_use]
    pub fn outcome(&self) -> Option<ProviderIntentStatus> {
        outcome_for(&self.event_type)
    }
}

fn outcome_for(event_type: &str) -> Option<ProviderIntentStatus> {
    match event_type {
        SUCCEEDED => Some(ProviderIntentStatus::Succeeded),
        PAYMENT_FAILED => Some(ProviderIntentStatus::Failed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::webhooks::payment_intent_payload;
    use rstest::rstest;

    #[rstest]
    #[case("payment_intent.succeeded", Some(ProviderIntentStatus::Succeeded))]
    #[case("payment_intent.payment_failed", Some(ProviderIntentStatus::Failed))]
    #[case("payment_intent.created", None)]
    #[case("charge.refunded", None)]
    fn maps_event_types_to_outcomes(
        #[case] event_type: &str,
        #[case] expected: Option<ProviderIntentStatus>,
    ) {
        let payload = payment_intent_payload(event_type, "pi_123");
        let envelope = WebhookEnvelope::parse(&payload).expect("valid envelope");
        assert_eq!(
            envelope.object_id.as_ref().map(ProviderTransactionId::as_str),
            Some("pi_123")
        );
        assert_eq!(envelope.outcome(), expected);
    }

    #[rstest]
    fn keeps_intent_metadata() {
        let payload = br#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_9","status":"succeeded","metadata":{"eventId":"e1","userId":"u1"}}}}"#;
        let envelope = WebhookEnvelope::parse(payload).expect("valid envelope");
        assert_eq!(envelope.object_status.as_deref(), Some("succeeded"));
        assert_eq!(envelope.metadata.get("eventId").map(String::as_str), Some("e1"));
    }

    #[rstest]
    #[case(br#"{"type":"balance.available","data":{"object":{"object":"balance"}}}"#.as_slice())]
    #[case(br#"{"type":"account.updated","data":{"object":{"id":"  "}}}"#.as_slice())]
    fn non_payment_objects_need_no_id(#[case] payload: &[u8]) {
        let envelope = WebhookEnvelope::parse(payload).expect("valid envelope");
        assert_eq!(envelope.object_id, None);
        assert_eq!(envelope.outcome(), None);
    }

    #[rstest]
    fn payment_outcomes_require_an_object_id() {
        let payload = br#"{"type":"payment_intent.payment_failed","data":{"object":{"status":"requires_payment_method"}}}"#;
        let err = WebhookEnvelope::parse(payload).expect_err("missing id");
        assert!(matches!(err, WebhookEnvelopeError::MissingObjectId { .. }));
    }

    #[rstest]
    #[case(br#"not json"#.as_slice())]
    #[case(br#"{"type":"payment_intent.succeeded"}"#.as_slice())]
    #[case(br#"{"type":"payment_intent.succeeded","data":{"object":{"id":"  "}}}"#.as_slice())]
    fn rejects_malformed_bodies(#[case] payload: &[u8]) {
        assert!(WebhookEnvelope::parse(payload).is_err());
    }
}
