//! Payment provider outbound adapters.
//!
//! [`StripeHttpProvider`] talks to a Stripe-compatible REST API.
//! [`FakePaymentProvider`] keeps intents in memory and is used when no
//! provider secret key is configured.

mod dto;
mod fake;
mod stripe_http;

pub use fake::FakePaymentProvider;
pub use stripe_http::StripeHttpProvider;
