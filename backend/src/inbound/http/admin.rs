//! Operator-facing HTTP handlers.
//!
//! ```text
//! GET /api/v1/admin/settlement-conflicts
//! ```

use actix_web::{get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::SettlementConflict;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// A completed payment that could not be turned into a seat.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlementConflictBody {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub obligation_id: String,
    pub provider_transaction_id: String,
    #[schema(format = "uuid")]
    pub event_id: String,
    #[schema(format = "uuid")]
    pub payer_id: String,
    #[schema(example = "event_full")]
    pub reason: String,
    #[schema(format = "date-time")]
    pub recorded_at: String,
}

impl From<SettlementConflict> for SettlementConflictBody {
    fn from(conflict: SettlementConflict) -> Self {
        Self {
            id: conflict.id.to_string(),
            obligation_id: conflict.obligation_id.to_string(),
            provider_transaction_id: conflict.provider_transaction_id.into(),
            event_id: conflict.event_id.to_string(),
            payer_id: conflict.payer_id.to_string(),
            reason: conflict.reason.as_str().to_owned(),
            recorded_at: conflict.recorded_at.to_rfc3339(),
        }
    }
}

/// Settlement conflicts awaiting reconciliation. Admin only.
#[utoipa::path(
    get,
    path = "/api/v1/admin/settlement-conflicts",
    responses(
        (status = 200, description = "Recorded conflicts", body = [SettlementConflictBody]),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "settlementConflicts",
    security(("SessionCookie" = []))
)]
#[get("/admin/settlement-conflicts")]
pub async fn settlement_conflicts(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<SettlementConflictBody>>> {
    let caller = session.require_identity()?;
    let conflicts = state.payments_query.settlement_conflicts(&caller).await?;
    Ok(web::Json(
        conflicts.into_iter().map(SettlementConflictBody::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::SettlementConflictRepository;
    use crate::domain::{
        ConflictReason, EventId, Money, NewObligation, PaymentObligation, ProviderTransactionId,
        UserId,
    };
    use crate::inbound::http::test_utils::{MemoryHarness, api_app, login_cookie};
    use crate::test_support::base_time;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::Value;

    async fn seeded_harness() -> MemoryHarness {
        let harness = MemoryHarness::with_events([]);
        let obligation = PaymentObligation::open(
            NewObligation {
                provider_transaction_id: ProviderTransactionId::new("pi_squeezed").expect("id"),
                payer_id: UserId::random(),
                event_id: EventId::random(),
                amount: Money::new(900, "usd").expect("amount"),
            },
            base_time(),
        );
        let conflict =
            SettlementConflict::for_obligation(&obligation, ConflictReason::EventFull, base_time());
        harness.conflicts.record(&conflict).await.expect("record conflict");
        harness
    }

    #[rstest]
    #[case("admin", StatusCode::OK)]
    #[case("host", StatusCode::FORBIDDEN)]
    #[case("attendee", StatusCode::FORBIDDEN)]
    #[actix_web::test]
    async fn conflicts_are_admin_only(#[case] username: &str, #[case] expected: StatusCode) {
        let harness = seeded_harness().await;
        let app = actix_test::init_service(api_app(harness.state())).await;
        let cookie = login_cookie(&app, username).await;

        let request = actix_test::TestRequest::get()
            .uri("/api/v1/admin/settlement-conflicts")
            .cookie(cookie)
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), expected);
    }

    #[rstest]
    #[actix_web::test]
    async fn conflicts_render_reason_codes() {
        let harness = seeded_harness().await;
        let app = actix_test::init_service(api_app(harness.state())).await;
        let admin = login_cookie(&app, "admin").await;

        let request = actix_test::TestRequest::get()
            .uri("/api/v1/admin/settlement-conflicts")
            .cookie(admin)
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, request).await;
        assert_eq!(body[0]["reason"].as_str(), Some("event_full"));
        assert_eq!(body[0]["providerTransactionId"].as_str(), Some("pi_squeezed"));
    }

    #[rstest]
    #[actix_web::test]
    async fn anonymous_callers_are_unauthorised() {
        let harness = MemoryHarness::with_events([]);
        let app = actix_test::init_service(api_app(harness.state())).await;

        let request = actix_test::TestRequest::get()
            .uri("/api/v1/admin/settlement-conflicts")
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
