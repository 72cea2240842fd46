//! Provider webhook signature verification.
//!
//! Header format: `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`. The expected
//! signature is `hex(HMAC-SHA256(secret, "<t>.<raw body>"))`. Verification
//! fails closed: a verifier without a secret rejects every delivery.

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use mockable::Clock;
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the provider signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Reasons a webhook delivery is not trusted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("webhook secret is not configured")]
    NotConfigured,
    #[error("signature header is missing")]
    MissingHeader,
    #[error("signature header is malformed")]
    MalformedHeader,
    #[error("no signature matched the payload")]
    NoMatch,
    #[error("signature timestamp is outside the tolerance window ({age_secs}s)")]
    StaleTimestamp { age_secs: i64 },
}

/// HMAC verifier for provider notifications.
pub struct WebhookVerifier {
    secret: Option<Zeroizing<Vec<u8>>>,
    tolerance: Duration,
    clock: Arc<dyn Clock>,
}

struct ParsedHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<ParsedHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for pair in header.split(',') {
        let Some((key, value)) = pair.trim().split_once('=') else {
            return Err(SignatureError::MalformedHeader);
        };
        match key {
            "t" => {
                let parsed = value
                    .parse::<i64>()
                    .map_err(|_| SignatureError::MalformedHeader)?;
                timestamp = Some(parsed);
            }
            // Undecodable candidates simply never match.
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }
    match timestamp {
        Some(timestamp) => Ok(ParsedHeader {
            timestamp,
            signatures,
        }),
        None => Err(SignatureError::MalformedHeader),
    }
}

impl WebhookVerifier {
    /// Build a verifier. `None` rejects every delivery.
    pub fn new(secret: Option<&str>, tolerance: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: secret
                .filter(|value| !value.is_empty())
                .map(|value| Zeroizing::new(value.as_bytes().to_vec())),
            tolerance,
            clock,
        }
    }

    /// Check `header` against `payload`.
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
        let secret = self.secret.as_ref().ok_or(SignatureError::NotConfigured)?;
        let header = header
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(SignatureError::MissingHeader)?;
        let parsed = parse_header(header)?;

        let mut mac =
            HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::NotConfigured)?;
        mac.update(parsed.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let matched = parsed
            .signatures
            .iter()
            .any(|candidate| mac.clone().verify_slice(candidate).is_ok());
        if !matched {
            return Err(SignatureError::NoMatch);
        }

        let age_secs = self.clock.utc().timestamp().saturating_sub(parsed.timestamp);
        let tolerance = i64::try_from(self.tolerance.as_secs()).unwrap_or(i64::MAX);
        if age_secs.abs() > tolerance {
            return Err(SignatureError::StaleTimestamp { age_secs });
        }
        Ok(())
    }
}
