//! Caller identity carried in the encrypted session cookie.
//!
//! The identity is stored as one serialised record so the user id and role
//! are always written and read together. A cookie whose record no longer
//! parses is treated as anonymous rather than as an error, which turns
//! stale or tampered cookies into a plain `401`.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Error, Identity, Role, UserId};

const IDENTITY_KEY: &str = "identity";

#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
    user_id: String,
    role: String,
}

impl StoredIdentity {
    fn from_identity(identity: &Identity) -> Self {
        Self {
            user_id: identity.user_id().to_string(),
            role: identity.role().as_str().to_owned(),
        }
    }

    fn into_identity(self) -> Option<Identity> {
        let user_id = UserId::new(&self.user_id)
            .inspect_err(|error| warn!(%error, "session carries an invalid user id"))
            .ok()?;
        let role = self
            .role
            .parse::<Role>()
            .inspect_err(|error| warn!(%error, "session carries an invalid role"))
            .ok()?;
        Some(Identity::new(user_id, role))
    }
}

/// Extractor giving handlers identity operations over the Actix session.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Store `identity`, renewing the session so a pre-login cookie never
    /// gains privileges.
    pub fn persist_identity(&self, identity: &Identity) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(IDENTITY_KEY, StoredIdentity::from_identity(identity))
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// The signed-in identity, if any.
    pub fn identity(&self) -> Result<Option<Identity>, Error> {
        match self.0.get::<StoredIdentity>(IDENTITY_KEY) {
            Ok(stored) => Ok(stored.and_then(StoredIdentity::into_identity)),
            Err(error) => {
                warn!(%error, "session identity record is unreadable");
                Ok(None)
            }
        }
    }

    /// The signed-in identity, or `401 Unauthorized`.
    pub fn require_identity(&self) -> Result<Identity, Error> {
        self.identity()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    pub fn require_user_id(&self) -> Result<UserId, Error> {
        self.require_identity().map(|identity| identity.user_id())
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let session = Session::from_request(req, payload);
        Box::pin(async move { session.await.map(Self) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::test_session_middleware;
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};
    use rstest::rstest;
    use serde_json::json;

    const HOST_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    async fn seed_session(session: Session, body: web::Json<serde_json::Value>) -> HttpResponse {
        session
            .insert(IDENTITY_KEY, body.into_inner())
            .expect("seed session");
        HttpResponse::Ok().finish()
    }

    async fn whoami_after(seed: serde_json::Value) -> (StatusCode, String) {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route("/seed", web::post().to(seed_session))
                .route(
                    "/whoami",
                    web::get().to(|session: SessionContext| async move {
                        let identity = session.require_identity()?;
                        Ok::<_, Error>(
                            HttpResponse::Ok()
                                .body(format!("{} {}", identity.user_id(), identity.role())),
                        )
                    }),
                ),
        )
        .await;

        let seeded = test::call_service(
            &app,
            test::TestRequest::post().uri("/seed").set_json(seed).to_request(),
        )
        .await;
        let cookie: Cookie<'static> = seeded
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .map(Cookie::into_owned)
            .expect("session cookie");

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/whoami").cookie(cookie).to_request(),
        )
        .await;
        let status = res.status();
        let body = test::read_body(res).await;
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[rstest]
    #[actix_web::test]
    async fn persisted_identity_round_trips() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(
                    "/login",
                    web::post().to(|session: SessionContext| async move {
                        let host = UserId::new(HOST_ID).expect("fixture id");
                        session.persist_identity(&Identity::new(host, Role::Host))?;
                        Ok::<_, Error>(HttpResponse::NoContent().finish())
                    }),
                )
                .route(
                    "/whoami",
                    web::get().to(|session: SessionContext| async move {
                        let id = session.require_user_id()?;
                        Ok::<_, Error>(HttpResponse::Ok().body(id.to_string()))
                    }),
                ),
        )
        .await;

        let login =
            test::call_service(&app, test::TestRequest::post().uri("/login").to_request()).await;
        let cookie = login
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .map(Cookie::into_owned)
            .expect("session cookie");
        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/whoami").cookie(cookie).to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, HOST_ID);
    }

    #[rstest]
    #[actix_web::test]
    async fn well_formed_record_is_accepted() {
        let (status, body) = whoami_after(json!({ "user_id": HOST_ID, "role": "admin" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("{HOST_ID} admin"));
    }

    #[rstest]
    #[case(json!({ "user_id": HOST_ID, "role": "superuser" }))]
    #[case(json!({ "user_id": "not-a-uuid", "role": "host" }))]
    #[case(json!({ "role": "host" }))]
    #[case(json!("legacy-string"))]
    #[actix_web::test]
    async fn unusable_records_are_anonymous(#[case] seed: serde_json::Value) {
        let (status, _) = whoami_after(seed).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[actix_web::test]
    async fn missing_identity_is_unauthorised() {
        let app = test::init_service(App::new().wrap(test_session_middleware()).route(
            "/whoami",
            web::get().to(|session: SessionContext| async move {
                session.require_user_id()?;
                Ok::<_, Error>(HttpResponse::Ok().finish())
            }),
        ))
        .await;
        let res =
            test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
