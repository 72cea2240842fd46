//! REST adapter: actix-web handlers under `/api/v1` plus health probes.
//!
//! Handlers parse and authorise, call one driving port on [`state::HttpState`],
//! and map the outcome to JSON. Business decisions stay in the domain.

pub mod admin;
pub mod auth;
pub mod error;
pub mod events;
pub mod health;
pub mod payments;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;
