//! Tests for payment HTTP handlers, including the signed webhook flow.

use super::*;
use crate::domain::ports::ProviderIntentStatus;
use crate::domain::{PaymentStatus, ProviderTransactionId, UserId};
use crate::inbound::http::test_utils::{MemoryHarness, TEST_WEBHOOK_SECRET, api_app, login_cookie};
use crate::test_support::EventBuilder;
use crate::test_support::webhooks::{payment_intent_payload, signature_header};
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use mockable::Clock;
use rstest::rstest;
use serde_json::{Value, json};

const HOST_ID: &str = "2b6f1f8e-5d0c-4c53-9a51-0c5b1b7c1a01";
const ATTENDEE_ID: &str = "8d7f3f0a-2f4e-4f0b-8c49-6f1f0a9b2c02";
const PRICE: i64 = 1500;

fn user(id: &str) -> UserId {
    UserId::new(id).expect("fixture user id")
}

fn paid_event(seats: u32) -> crate::domain::Event {
    EventBuilder::new()
        .host(user(HOST_ID))
        .title("Wine tasting")
        .capacity(seats)
        .price(PRICE)
        .build()
}

async fn read_json(response: ServiceResponse) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = actix_test::read_body(response).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn open_intent(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    cookie: &Cookie<'static>,
    event_id: &str,
) -> (StatusCode, Value) {
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/payments/intent")
        .cookie(cookie.clone())
        .set_json(json!({ "eventId": event_id }))
        .to_request();
    read_json(actix_test::call_service(app, request).await).await
}

async fn deliver(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    payload: &[u8],
    signature: Option<String>,
) -> (StatusCode, Value) {
    let mut request = actix_test::TestRequest::post()
        .uri("/api/v1/payments/webhook")
        .insert_header(("content-type", "application/json"))
        .set_payload(payload.to_vec());
    if let Some(signature) = signature {
        request = request.insert_header((SIGNATURE_HEADER, signature));
    }
    read_json(actix_test::call_service(app, request.to_request()).await).await
}

async fn get_json(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    uri: &str,
    cookie: Option<&Cookie<'static>>,
) -> (StatusCode, Value) {
    let mut request = actix_test::TestRequest::get().uri(uri);
    if let Some(cookie) = cookie {
        request = request.cookie(cookie.clone());
    }
    read_json(actix_test::call_service(app, request.to_request()).await).await
}

#[rstest]
#[actix_web::test]
async fn intent_opens_a_pending_obligation_without_taking_a_seat() {
    let event = paid_event(5);
    let event_id = event.id().to_string();
    let harness = MemoryHarness::with_events([event]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let attendee = login_cookie(&app, "attendee").await;

    let (status, intent) = open_intent(&app, &attendee, &event_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(intent["amount"].as_i64(), Some(PRICE));
    assert_eq!(intent["currency"].as_str(), Some("usd"));
    assert!(intent["clientSecret"].as_str().is_some_and(|s| !s.is_empty()));

    let (_, payments) =
        get_json(&app, &format!("/api/v1/payments/users/{ATTENDEE_ID}"), Some(&attendee)).await;
    assert_eq!(payments[0]["status"].as_str(), Some("pending"));
    assert_eq!(payments[0]["providerTransactionId"], intent["providerTransactionId"]);

    let (_, fetched) = get_json(&app, &format!("/api/v1/events/{event_id}"), None).await;
    assert_eq!(fetched["currentParticipants"].as_u64(), Some(0));
}

#[rstest]
#[actix_web::test]
async fn intent_for_a_free_event_is_rejected() {
    let event = EventBuilder::new().build();
    let event_id = event.id().to_string();
    let harness = MemoryHarness::with_events([event]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let attendee = login_cookie(&app, "attendee").await;

    let (status, body) = open_intent(&app, &attendee, &event_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"].as_str(), Some("not_paid"));
    assert_eq!(harness.provider.intent_count(), 0);
}

#[rstest]
#[actix_web::test]
async fn signed_success_webhook_enrols_the_payer_exactly_once() {
    let event = paid_event(3);
    let event_id = event.id().to_string();
    let harness = MemoryHarness::with_events([event]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let attendee = login_cookie(&app, "attendee").await;
    let (_, intent) = open_intent(&app, &attendee, &event_id).await;
    let intent_id = intent["providerTransactionId"].as_str().expect("intent id");

    let payload = payment_intent_payload("payment_intent.succeeded", intent_id);
    let now = harness.clock.utc().timestamp();
    for _ in 0..3 {
        let signature = signature_header(TEST_WEBHOOK_SECRET, now, &payload);
        let (status, ack) = deliver(&app, &payload, Some(signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack, json!({ "received": true }));
    }

    let (_, fetched) = get_json(&app, &format!("/api/v1/events/{event_id}"), None).await;
    assert_eq!(fetched["currentParticipants"].as_u64(), Some(1));
    assert_eq!(fetched["participants"], json!([ATTENDEE_ID]));

    let (_, payments) =
        get_json(&app, &format!("/api/v1/payments/users/{ATTENDEE_ID}"), Some(&attendee)).await;
    assert_eq!(payments[0]["status"].as_str(), Some(PaymentStatus::Completed.as_str()));

    let host = login_cookie(&app, "host").await;
    let (status, revenue) =
        get_json(&app, &format!("/api/v1/payments/hosts/{HOST_ID}/revenue"), Some(&host)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revenue["totalRevenue"].as_i64(), Some(PRICE));
    assert_eq!(revenue["totalPayments"].as_u64(), Some(1));
    assert_eq!(revenue["byEvent"][0]["title"].as_str(), Some("Wine tasting"));
}

#[rstest]
#[case(None)]
#[case(Some("t=1,v1=deadbeef".to_owned()))]
#[actix_web::test]
async fn unsigned_or_forged_webhooks_are_rejected(#[case] signature: Option<String>) {
    let harness = MemoryHarness::with_events([]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let payload = payment_intent_payload("payment_intent.succeeded", "pi_forged");

    let (status, body) = deliver(&app, &payload, signature).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"].as_str(), Some("invalid_signature"));
}

#[rstest]
#[case("charge.refunded", "pi_irrelevant")]
#[case("payment_intent.succeeded", "pi_never_opened")]
#[actix_web::test]
async fn ignored_and_unmatched_deliveries_are_acknowledged(
    #[case] event_type: &str,
    #[case] intent_id: &str,
) {
    let harness = MemoryHarness::with_events([]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let payload = payment_intent_payload(event_type, intent_id);
    let signature = signature_header(
        TEST_WEBHOOK_SECRET,
        harness.clock.utc().timestamp(),
        &payload,
    );

    let (status, ack) = deliver(&app, &payload, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"].as_bool(), Some(true));
}

#[rstest]
#[actix_web::test]
async fn success_for_a_full_event_reads_as_processing_and_records_a_conflict() {
    let event = paid_event(1);
    let event_id = event.id().to_string();
    let harness = MemoryHarness::with_events([event]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let attendee = login_cookie(&app, "attendee").await;
    let attendee2 = login_cookie(&app, "attendee2").await;

    let (_, first) = open_intent(&app, &attendee, &event_id).await;
    let (_, second) = open_intent(&app, &attendee2, &event_id).await;
    for intent in [&first, &second] {
        let id = ProviderTransactionId::new(
            intent["providerTransactionId"].as_str().expect("intent id"),
        )
        .expect("valid id");
        assert!(harness.provider.set_status(&id, ProviderIntentStatus::Succeeded));
    }

    let confirm = |cookie: &Cookie<'static>, intent: &Value| {
        actix_test::TestRequest::post()
            .uri("/api/v1/payments/confirm")
            .cookie(cookie.clone())
            .set_json(json!({ "providerTransactionId": intent["providerTransactionId"] }))
            .to_request()
    };
    let (status, settled) =
        read_json(actix_test::call_service(&app, confirm(&attendee, &first)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["status"].as_str(), Some("completed"));

    let (status, squeezed) =
        read_json(actix_test::call_service(&app, confirm(&attendee2, &second)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(squeezed["status"].as_str(), Some("processing"));

    let admin = login_cookie(&app, "admin").await;
    let (status, conflicts) =
        get_json(&app, "/api/v1/admin/settlement-conflicts", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(conflicts.as_array().map(Vec::len), Some(1));
    assert_eq!(conflicts[0]["reason"].as_str(), Some("event_full"));
    assert_eq!(conflicts[0]["providerTransactionId"], second["providerTransactionId"]);

    let (_, fetched) = get_json(&app, &format!("/api/v1/events/{event_id}"), None).await;
    assert_eq!(fetched["currentParticipants"].as_u64(), Some(1));
}

#[rstest]
#[actix_web::test]
async fn confirmation_while_the_provider_is_pending_changes_nothing() {
    let event = paid_event(2);
    let event_id = event.id().to_string();
    let harness = MemoryHarness::with_events([event]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let attendee = login_cookie(&app, "attendee").await;
    let (_, intent) = open_intent(&app, &attendee, &event_id).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/payments/confirm")
        .cookie(attendee.clone())
        .set_json(json!({ "providerTransactionId": intent["providerTransactionId"] }))
        .to_request();
    let (status, body) = read_json(actix_test::call_service(&app, request).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"].as_str(), Some("processing"));

    let (_, payments) =
        get_json(&app, &format!("/api/v1/payments/users/{ATTENDEE_ID}"), Some(&attendee)).await;
    assert_eq!(payments[0]["status"].as_str(), Some("pending"));
}

#[rstest]
#[case("attendee2", StatusCode::FORBIDDEN)]
#[case("admin", StatusCode::OK)]
#[actix_web::test]
async fn payment_history_is_self_or_admin(#[case] viewer: &str, #[case] expected: StatusCode) {
    let harness = MemoryHarness::with_events([]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let cookie = login_cookie(&app, viewer).await;

    let (status, _) =
        get_json(&app, &format!("/api/v1/payments/users/{ATTENDEE_ID}"), Some(&cookie)).await;
    assert_eq!(status, expected);
}

#[rstest]
#[actix_web::test]
async fn blank_transaction_id_is_a_missing_field() {
    let harness = MemoryHarness::with_events([]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let attendee = login_cookie(&app, "attendee").await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/payments/confirm")
        .cookie(attendee)
        .set_json(json!({ "providerTransactionId": "  " }))
        .to_request();
    let (status, body) = read_json(actix_test::call_service(&app, request).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"].as_str(), Some("providerTransactionId"));
}
