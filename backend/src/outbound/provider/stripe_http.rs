//! Reqwest-backed payment provider adapter.
//!
//! This adapter owns transport details only: form encoding, bearer auth, the
//! idempotency header, timeout and HTTP error mapping, and JSON decoding.
//! Retries are the caller's concern; see `ProviderRetry`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use zeroize::Zeroizing;

use super::dto::{ErrorEnvelopeDto, PaymentIntentDto};
use crate::domain::ProviderTransactionId;
use crate::domain::ports::{
    CreateIntentRequest, PaymentProvider, PaymentProviderError, ProviderIntent,
};

const INTENTS_PATH: &str = "v1/payment_intents";

/// Payment provider adapter for a Stripe-compatible API.
pub struct StripeHttpProvider {
    client: Client,
    base_url: Url,
    secret_key: Zeroizing<String>,
}

impl StripeHttpProvider {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            secret_key: Zeroizing::new(secret_key.into()),
        })
    }

    fn endpoint(&self, suffix: &str) -> Result<Url, PaymentProviderError> {
        self.base_url
            .join(suffix)
            .map_err(|err| PaymentProviderError::rejected(format!("invalid provider url: {err}")))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<ProviderIntent, PaymentProviderError> {
        let response = request
            .bearer_auth(self.secret_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_intent(body.as_ref())
    }
}

#[async_trait]
impl PaymentProvider for StripeHttpProvider {
    async fn create_intent(
        &self,
        request: &CreateIntentRequest,
    ) -> Result<ProviderIntent, PaymentProviderError> {
        let url = self.endpoint(INTENTS_PATH)?;
        let form = intent_form(request);
        self.send(
            self.client
                .post(url)
                .header("Idempotency-Key", request.idempotency_key.as_str())
                .form(&form),
        )
        .await
    }

    async fn retrieve_intent(
        &self,
        id: &ProviderTransactionId,
    ) -> Result<ProviderIntent, PaymentProviderError> {
        let url = self.endpoint(&format!("{INTENTS_PATH}/{id}"))?;
        self.send(self.client.get(url)).await
    }
}

fn intent_form(request: &CreateIntentRequest) -> Vec<(&'static str, String)> {
    vec![
        ("amount", request.amount.minor_units().to_string()),
        ("currency", request.amount.currency().to_owned()),
        ("automatic_payment_methods[enabled]", "true".to_owned()),
        ("metadata[eventId]", request.metadata.event_id.to_string()),
        ("metadata[userId]", request.metadata.payer_id.to_string()),
        ("metadata[eventTitle]", request.metadata.event_title.clone()),
    ]
}

fn parse_intent(body: &[u8]) -> Result<ProviderIntent, PaymentProviderError> {
    let decoded: PaymentIntentDto = serde_json::from_slice(body).map_err(|error| {
        PaymentProviderError::decode(format!("invalid payment intent payload: {error}"))
    })?;
    decoded.into_domain().map_err(PaymentProviderError::decode)
}

fn map_transport_error(error: reqwest::Error) -> PaymentProviderError {
    if error.is_timeout() {
        PaymentProviderError::transient(format!("timeout: {error}"))
    } else {
        PaymentProviderError::transient(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PaymentProviderError {
    let detail = serde_json::from_slice::<ErrorEnvelopeDto>(body)
        .ok()
        .map(|envelope| {
            let kind = envelope.error.error_type.unwrap_or_default();
            let message = envelope.error.message.unwrap_or_default();
            format!("{kind} {message}").trim().to_owned()
        })
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| body_preview(body));
    let message = if detail.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {detail}", status.as_u16())
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            PaymentProviderError::transient(message)
        }
        _ if status.is_server_error() => PaymentProviderError::transient(message),
        _ => PaymentProviderError::rejected(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
