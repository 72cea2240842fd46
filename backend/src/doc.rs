//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/api/v1` handler, the health probes, the
//! request and response bodies, and the session cookie security scheme.
//! Error payloads are documented through the wrappers in
//! [`crate::inbound::http::schemas`] so domain types stay free of utoipa.
//!
//! The document is served by Swagger UI in debug builds and exported by
//! `cargo run --bin openapi-dump`.

use crate::inbound::http::admin::SettlementConflictBody;
use crate::inbound::http::auth::{LoginRequest, LoginResponse};
use crate::inbound::http::events::{CreateEventRequestBody, EventResponseBody};
use crate::inbound::http::payments::{
    ConfirmPaymentRequestBody, ConfirmPaymentResponseBody, CreateIntentRequestBody,
    EventRevenueBody, HostRevenueBody, PaymentIntentResponseBody, PaymentResponseBody,
    WebhookAckBody,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema, RejectionDetailsSchema};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Gatherings API",
        description = "Event enrollment with capacity-safe paid settlement.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::login,
        crate::inbound::http::events::create_event,
        crate::inbound::http::events::get_event,
        crate::inbound::http::events::join_event,
        crate::inbound::http::events::leave_event,
        crate::inbound::http::events::cancel_event,
        crate::inbound::http::events::delete_event,
        crate::inbound::http::payments::create_payment_intent,
        crate::inbound::http::payments::payment_webhook,
        crate::inbound::http::payments::confirm_payment,
        crate::inbound::http::payments::user_payments,
        crate::inbound::http::payments::host_revenue,
        crate::inbound::http::admin::settlement_conflicts,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        RejectionDetailsSchema,
        LoginRequest,
        LoginResponse,
        CreateEventRequestBody,
        EventResponseBody,
        CreateIntentRequestBody,
        PaymentIntentResponseBody,
        WebhookAckBody,
        ConfirmPaymentRequestBody,
        ConfirmPaymentResponseBody,
        PaymentResponseBody,
        EventRevenueBody,
        HostRevenueBody,
        SettlementConflictBody,
    )),
    tags(
        (name = "auth", description = "Session login"),
        (name = "events", description = "Event lifecycle and free enrollment"),
        (name = "payments", description = "Paid enrollment and settlement"),
        (name = "admin", description = "Operator views"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
