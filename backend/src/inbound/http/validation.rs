//! Parsing of raw path and body values into domain identifiers.
//!
//! Every failure is an `invalid_request` whose details name the offending
//! field, echo the raw value where it is safe to, and carry a stable `code`.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::domain::{Error, EventId, PaymentValidationError, ProviderTransactionId, UserId};

/// A request field, named as clients spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Field(&'static str);

impl Field {
    /// The `{id}` path segment.
    pub(crate) const PATH_ID: Self = Self("id");
    pub(crate) const EVENT_ID: Self = Self("eventId");
    pub(crate) const STARTS_AT: Self = Self("startsAt");
    pub(crate) const PROVIDER_TRANSACTION_ID: Self = Self("providerTransactionId");

    fn reject(self, message: String, mut details: Value) -> Error {
        if let Value::Object(map) = &mut details {
            map.insert("field".to_owned(), Value::from(self.0));
        }
        Error::invalid_request(message).with_details(details)
    }

    fn uuid(self, raw: &str) -> Result<Uuid, Error> {
        Uuid::parse_str(raw.trim()).map_err(|_| {
            self.reject(
                format!("{} must be a valid UUID", self.0),
                json!({ "code": "invalid_uuid", "value": raw }),
            )
        })
    }

    pub(crate) fn event_id(self, raw: &str) -> Result<EventId, Error> {
        self.uuid(raw).map(EventId::from_uuid)
    }

    pub(crate) fn user_id(self, raw: &str) -> Result<UserId, Error> {
        self.uuid(raw).map(UserId::from_uuid)
    }

    /// RFC 3339 with any offset, normalised to UTC.
    pub(crate) fn timestamp(self, raw: &str) -> Result<DateTime<Utc>, Error> {
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|_| {
                self.reject(
                    format!("{} must be an RFC 3339 timestamp", self.0),
                    json!({ "code": "invalid_timestamp", "value": raw }),
                )
            })
    }

    pub(crate) fn transaction_id(self, raw: String) -> Result<ProviderTransactionId, Error> {
        ProviderTransactionId::new(raw).map_err(|err| match err {
            PaymentValidationError::EmptyTransactionId => self.reject(
                format!("missing required field: {}", self.0),
                json!({ "code": "missing_field" }),
            ),
            other => self.reject(other.to_string(), json!({ "code": "invalid_value" })),
        })
    }
}
