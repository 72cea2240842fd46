//! Test utilities for the gatherings crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`,
//! through the `test-support` feature).

pub mod clock;
pub mod events;
pub mod retry;

pub use events::{EventBuilder, base_time};

pub mod webhooks {
    //! Signed provider notifications.

    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    /// Build a `t=...,v1=...` signature header for `payload`.
    pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(err) => panic!("hmac key: {err}"),
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={signature}")
    }

    /// Minimal payment-intent notification body.
    pub fn payment_intent_payload(event_type: &str, intent_id: &str) -> Vec<u8> {
        let status = match event_type {
            "payment_intent.succeeded" => "succeeded",
            "payment_intent.payment_failed" => "requires_payment_method",
            _ => "processing",
        };
        serde_json::json!({
            "id": "evt_test",
            "type": event_type,
            "data": {
                "object": {
                    "id": intent_id,
                    "object": "payment_intent",
                    "status": status,
                    "metadata": {}
                }
            }
        })
        .to_string()
        .into_bytes()
    }
}
