//! Driving port for the external identity collaborator.
//!
//! Inbound adapters call it to exchange credentials for an [`Identity`]
//! without knowing how identities are issued. The fixture roster stands in
//! for the real identity service in development and tests.

use async_trait::async_trait;

use crate::domain::{Error, Identity, LoginCredentials, Role, UserId};

/// Domain use-case port for authentication.
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Validate credentials and return the caller identity.
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<Identity, Error>;
}

/// Fixed development roster. Every account uses the password `password`.
pub const FIXTURE_ACCOUNTS: [(&str, &str, Role); 4] = [
    ("admin", "123e4567-e89b-12d3-a456-426614174000", Role::Admin),
    ("host", "2b6f1f8e-5d0c-4c53-9a51-0c5b1b7c1a01", Role::Host),
    ("attendee", "8d7f3f0a-2f4e-4f0b-8c49-6f1f0a9b2c02", Role::Attendee),
    ("attendee2", "c3a1e6b4-7d52-4e1a-9f7e-1b2c3d4e5f03", Role::Attendee),
];

const FIXTURE_PASSWORD: &str = "password";

/// In-memory authenticator backed by [`FIXTURE_ACCOUNTS`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLoginService;

#[async_trait]
impl LoginService for FixtureLoginService {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<Identity, Error> {
        let account = FIXTURE_ACCOUNTS
            .iter()
            .find(|(username, _, _)| *username == credentials.username());
        match account {
            Some((_, id, role)) if credentials.password() == FIXTURE_PASSWORD => {
                let user_id = UserId::new(id)
                    .map_err(|err| Error::internal(format!("invalid fixture user id: {err}")))?;
                Ok(Identity::new(user_id, *role))
            }
            _ => Err(Error::unauthorized("invalid credentials")),
        }
    }
}
