//! Payment HTTP handlers.
//!
//! ```text
//! POST /api/v1/payments/intent
//! POST /api/v1/payments/webhook
//! POST /api/v1/payments/confirm
//! GET  /api/v1/payments/users/{id}
//! GET  /api/v1/payments/hosts/{id}/revenue
//! ```
//!
//! The webhook and the confirmation both enter the same idempotent
//! settlement path. The webhook carries no session: it is authenticated by
//! its signature over the raw body, so the body is taken as bytes and never
//! re-serialised before verification.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::domain::{
    EventRevenue, HostRevenue, PaymentIntentHandle, PaymentObligation, SIGNATURE_HEADER,
    SettlementReceipt, WebhookReceipt,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::Field;

/// Request payload for starting a paid enrollment.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequestBody {
    #[schema(format = "uuid")]
    pub event_id: String,
}

/// What the client needs to complete the payment with the provider.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponseBody {
    pub client_secret: String,
    #[schema(example = "pi_3PqL0x2eZvKYlo2C1")]
    pub provider_transaction_id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    #[schema(example = "usd")]
    pub currency: String,
}

impl From<PaymentIntentHandle> for PaymentIntentResponseBody {
    fn from(handle: PaymentIntentHandle) -> Self {
        Self {
            client_secret: handle.client_secret,
            provider_transaction_id: handle.provider_transaction_id.into(),
            amount: handle.amount.minor_units(),
            currency: handle.amount.currency().to_owned(),
        }
    }
}

/// Webhook acknowledgement.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAckBody {
    pub received: bool,
}

/// Request payload for a client-side payment confirmation.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequestBody {
    pub provider_transaction_id: String,
}

/// Settlement result as shown to the payer.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentResponseBody {
    pub provider_transaction_id: String,
    /// `completed`, `failed`, or `processing`.
    #[schema(example = "completed")]
    pub status: String,
}

impl From<SettlementReceipt> for ConfirmPaymentResponseBody {
    fn from(receipt: SettlementReceipt) -> Self {
        Self {
            status: receipt.user_status().to_owned(),
            provider_transaction_id: receipt.provider_transaction_id.into(),
        }
    }
}

/// One payment obligation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponseBody {
    #[schema(format = "uuid")]
    pub id: String,
    pub provider_transaction_id: String,
    #[schema(format = "uuid")]
    pub event_id: String,
    #[schema(format = "uuid")]
    pub payer_id: String,
    pub amount: i64,
    pub currency: String,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(format = "date-time")]
    pub created_at: String,
    #[schema(format = "date-time")]
    pub updated_at: String,
}

impl From<PaymentObligation> for PaymentResponseBody {
    fn from(obligation: PaymentObligation) -> Self {
        Self {
            id: obligation.id.to_string(),
            provider_transaction_id: obligation.provider_transaction_id.into(),
            event_id: obligation.event_id.to_string(),
            payer_id: obligation.payer_id.to_string(),
            amount: obligation.amount.minor_units(),
            currency: obligation.amount.currency().to_owned(),
            status: obligation.status.as_str().to_owned(),
            created_at: obligation.created_at.to_rfc3339(),
            updated_at: obligation.updated_at.to_rfc3339(),
        }
    }
}

/// Completed revenue for one event.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventRevenueBody {
    #[schema(format = "uuid")]
    pub event_id: String,
    pub title: String,
    pub revenue: i64,
    pub payments: u64,
}

/// Completed revenue across a host's events.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostRevenueBody {
    #[schema(format = "uuid")]
    pub host_id: String,
    pub total_revenue: i64,
    pub total_payments: u64,
    pub by_event: Vec<EventRevenueBody>,
}

impl From<EventRevenue> for EventRevenueBody {
    fn from(value: EventRevenue) -> Self {
        Self {
            event_id: value.event_id.to_string(),
            title: value.title,
            revenue: value.revenue,
            payments: value.payments,
        }
    }
}

impl From<HostRevenue> for HostRevenueBody {
    fn from(value: HostRevenue) -> Self {
        Self {
            host_id: value.host_id.to_string(),
            total_revenue: value.total_revenue,
            total_payments: value.total_payments,
            by_event: value.by_event.into_iter().map(EventRevenueBody::from).collect(),
        }
    }
}

/// Open a paid enrollment: create the provider intent and its pending
/// obligation. The seat is taken only when the payment settles.
#[utoipa::path(
    post,
    path = "/api/v1/payments/intent",
    request_body = CreateIntentRequestBody,
    responses(
        (status = 200, description = "Intent created", body = PaymentIntentResponseBody),
        (status = 400, description = "Invalid request or free event", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 404, description = "Event not found", body = ErrorSchema),
        (status = 409, description = "Full, already joined, or not joinable", body = ErrorSchema),
        (status = 503, description = "Provider or store unavailable", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "createPaymentIntent",
    security(("SessionCookie" = []))
)]
#[post("/payments/intent")]
pub async fn create_payment_intent(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateIntentRequestBody>,
) -> ApiResult<web::Json<PaymentIntentResponseBody>> {
    let caller = session.require_identity()?;
    let event_id = Field::EVENT_ID.event_id(&payload.into_inner().event_id)?;
    let handle = state.payment_intents.create_intent(&caller, &event_id).await?;
    Ok(web::Json(PaymentIntentResponseBody::from(handle)))
}

/// Receive a signed provider notification.
///
/// Applied, duplicate, ignored, and unmatched deliveries are all
/// acknowledged with `200`; a `503` asks the provider to redeliver.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body(content = String, content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")),
    responses(
        (status = 200, description = "Delivery acknowledged", body = WebhookAckBody),
        (status = 400, description = "Signature or body rejected", body = ErrorSchema),
        (status = 503, description = "Store unavailable; redeliver", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "paymentWebhook",
    security([])
)]
#[post("/payments/webhook")]
pub async fn payment_webhook(
    state: web::Data<HttpState>,
    request: HttpRequest,
    body: web::Bytes,
) -> ApiResult<web::Json<WebhookAckBody>> {
    let signature = request
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    match state.settlement.handle_webhook(&body, signature).await? {
        WebhookReceipt::Applied(receipt) => info!(
            provider_transaction_id = %receipt.provider_transaction_id,
            outcome = %receipt.report,
            "webhook applied"
        ),
        WebhookReceipt::Ignored { event_type } => debug!(%event_type, "webhook ignored"),
        WebhookReceipt::Unmatched {
            provider_transaction_id,
        } => debug!(%provider_transaction_id, "webhook left for the sweep"),
    }
    Ok(web::Json(WebhookAckBody { received: true }))
}

/// Settle from the provider's current view after the client completes
/// payment. Payer or admin only.
#[utoipa::path(
    post,
    path = "/api/v1/payments/confirm",
    request_body = ConfirmPaymentRequestBody,
    responses(
        (status = 200, description = "Settlement status", body = ConfirmPaymentResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Not the payer", body = ErrorSchema),
        (status = 404, description = "Payment not found", body = ErrorSchema),
        (status = 503, description = "Provider or store unavailable", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "confirmPayment",
    security(("SessionCookie" = []))
)]
#[post("/payments/confirm")]
pub async fn confirm_payment(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ConfirmPaymentRequestBody>,
) -> ApiResult<web::Json<ConfirmPaymentResponseBody>> {
    let caller = session.require_identity()?;
    let transaction = Field::PROVIDER_TRANSACTION_ID
        .transaction_id(payload.into_inner().provider_transaction_id)?;
    let receipt = state.settlement.confirm(&caller, &transaction).await?;
    Ok(web::Json(ConfirmPaymentResponseBody::from(receipt)))
}

/// Payments opened by a user, newest first. Self or admin only.
#[utoipa::path(
    get,
    path = "/api/v1/payments/users/{id}",
    params(("id" = String, Path, format = "uuid", description = "User id")),
    responses(
        (status = 200, description = "Payments", body = [PaymentResponseBody]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "userPayments",
    security(("SessionCookie" = []))
)]
#[get("/payments/users/{id}")]
pub async fn user_payments(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<PaymentResponseBody>>> {
    let caller = session.require_identity()?;
    let user_id = Field::PATH_ID.user_id(&path.into_inner())?;
    let payments = state.payments_query.payments_for_user(&caller, &user_id).await?;
    Ok(web::Json(payments.into_iter().map(PaymentResponseBody::from).collect()))
}

/// Completed revenue across a host's events. Self or admin only.
#[utoipa::path(
    get,
    path = "/api/v1/payments/hosts/{id}/revenue",
    params(("id" = String, Path, format = "uuid", description = "Host user id")),
    responses(
        (status = 200, description = "Revenue", body = HostRevenueBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "hostRevenue",
    security(("SessionCookie" = []))
)]
#[get("/payments/hosts/{id}/revenue")]
pub async fn host_revenue(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<HostRevenueBody>> {
    let caller = session.require_identity()?;
    let host_id = Field::PATH_ID.user_id(&path.into_inner())?;
    let revenue = state.payments_query.host_revenue(&caller, &host_id).await?;
    Ok(web::Json(HostRevenueBody::from(revenue)))
}

#[cfg(test)]
#[path = "payments_tests.rs"]
mod tests;
