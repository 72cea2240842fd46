//! Tests for event HTTP handlers.

use super::*;
use crate::domain::{EventId, EventStatus, UserId};
use crate::inbound::http::test_utils::{MemoryHarness, api_app, login_cookie};
use crate::test_support::EventBuilder;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{Method, StatusCode};
use actix_web::test as actix_test;
use rstest::rstest;
use serde_json::{Value, json};

const HOST_ID: &str = "2b6f1f8e-5d0c-4c53-9a51-0c5b1b7c1a01";
const ATTENDEE_ID: &str = "8d7f3f0a-2f4e-4f0b-8c49-6f1f0a9b2c02";
const ATTENDEE2_ID: &str = "c3a1e6b4-7d52-4e1a-9f7e-1b2c3d4e5f03";

fn user(id: &str) -> UserId {
    UserId::new(id).expect("fixture user id")
}

fn hosted_event() -> EventBuilder {
    EventBuilder::new().host(user(HOST_ID))
}

async fn send(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    method: Method,
    uri: &str,
    cookie: Option<&Cookie<'static>>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = actix_test::TestRequest::default().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.cookie(cookie.clone());
    }
    if let Some(body) = body {
        request = request.set_json(body);
    }
    let response = actix_test::call_service(app, request.to_request()).await;
    let status = response.status();
    let bytes = actix_test::read_body(response).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

fn create_payload() -> Value {
    json!({
        "title": "Rust meetup",
        "description": "Lightning talks about async Rust in production.",
        "category": "Tech Meetups",
        "location": "Library annex",
        "startsAt": "2026-05-10T18:00:00Z",
        "maxParticipants": 30,
        "price": 1500
    })
}

#[rstest]
#[actix_web::test]
async fn host_creates_and_reads_back_an_event() {
    let harness = MemoryHarness::with_events([]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let host = login_cookie(&app, "host").await;

    let (status, created) =
        send(&app, Method::POST, "/api/v1/events", Some(&host), Some(create_payload())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["hostId"].as_str(), Some(HOST_ID));
    assert_eq!(created["status"].as_str(), Some("upcoming"));
    assert_eq!(created["category"].as_str(), Some("Tech Meetups"));
    assert_eq!(created["isPaid"].as_bool(), Some(true));
    assert_eq!(created["currentParticipants"].as_u64(), Some(0));
    assert!(created.get("max_participants").is_none());

    let id = created["id"].as_str().expect("event id");
    let path = format!("/api/v1/events/{id}");
    let (status, fetched) = send(&app, Method::GET, &path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"].as_str(), Some("Rust meetup"));
}

#[rstest]
#[case("attendee", None, StatusCode::FORBIDDEN)]
#[case("host", Some(("startsAt", json!("next tuesday"))), StatusCode::BAD_REQUEST)]
#[case("host", Some(("maxParticipants", json!(1001))), StatusCode::BAD_REQUEST)]
#[case("host", Some(("category", json!("Knitting"))), StatusCode::BAD_REQUEST)]
#[actix_web::test]
async fn create_rejects_attendees_and_invalid_drafts(
    #[case] username: &str,
    #[case] override_field: Option<(&str, Value)>,
    #[case] expected: StatusCode,
) {
    let harness = MemoryHarness::with_events([]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let cookie = login_cookie(&app, username).await;
    let mut payload = create_payload();
    if let Some((field, value)) = override_field {
        payload[field] = value;
    }

    let (status, _) =
        send(&app, Method::POST, "/api/v1/events", Some(&cookie), Some(payload)).await;
    assert_eq!(status, expected);
}

#[rstest]
#[actix_web::test]
async fn join_is_idempotent_per_attendee() {
    let event = hosted_event().capacity(2).build();
    let uri = format!("/api/v1/events/{}/join", event.id());
    let harness = MemoryHarness::with_events([event]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let attendee = login_cookie(&app, "attendee").await;

    let (status, joined) = send(&app, Method::POST, &uri, Some(&attendee), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["currentParticipants"].as_u64(), Some(1));
    assert_eq!(joined["participants"], json!([ATTENDEE_ID]));

    let (status, again) = send(&app, Method::POST, &uri, Some(&attendee), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["details"]["code"].as_str(), Some("already_enrolled"));
}

#[rstest]
#[case(
    hosted_event().capacity(1).participants([user(ATTENDEE2_ID)]),
    StatusCode::CONFLICT,
    "event_full"
)]
#[case(hosted_event().price(2500), StatusCode::BAD_REQUEST, "not_free")]
#[case(
    hosted_event().status(EventStatus::Cancelled),
    StatusCode::CONFLICT,
    "event_not_joinable"
)]
#[case(hosted_event().approved(false), StatusCode::CONFLICT, "event_not_joinable")]
#[actix_web::test]
async fn join_rejections_carry_stable_codes(
    #[case] builder: EventBuilder,
    #[case] status: StatusCode,
    #[case] code: &str,
) {
    let event = builder.build();
    let uri = format!("/api/v1/events/{}/join", event.id());
    let harness = MemoryHarness::with_events([event]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let attendee = login_cookie(&app, "attendee").await;

    let (actual, body) = send(&app, Method::POST, &uri, Some(&attendee), None).await;
    assert_eq!(actual, status);
    assert_eq!(body["details"]["code"].as_str(), Some(code));
}

#[rstest]
#[actix_web::test]
async fn join_requires_a_session() {
    let event = hosted_event().build();
    let uri = format!("/api/v1/events/{}/join", event.id());
    let harness = MemoryHarness::with_events([event]);
    let app = actix_test::init_service(api_app(harness.state())).await;

    let (status, _) = send(&app, Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[rstest]
#[actix_web::test]
async fn leave_releases_the_seat_once() {
    let event = hosted_event().participants([user(ATTENDEE_ID)]).build();
    let id = event.id();
    let harness = MemoryHarness::with_events([event]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let attendee = login_cookie(&app, "attendee").await;
    let uri = format!("/api/v1/events/{id}/leave");

    let (status, _) = send(&app, Method::POST, &uri, Some(&attendee), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::POST, &uri, Some(&attendee), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"].as_str(), Some("not_enrolled"));

    let (_, event) = send(&app, Method::GET, &format!("/api/v1/events/{id}"), None, None).await;
    assert_eq!(event["currentParticipants"].as_u64(), Some(0));
}

#[rstest]
#[actix_web::test]
async fn only_the_host_or_an_admin_cancels() {
    let event = hosted_event().build();
    let uri = format!("/api/v1/events/{}/cancel", event.id());
    let harness = MemoryHarness::with_events([event]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let attendee = login_cookie(&app, "attendee").await;
    let host = login_cookie(&app, "host").await;

    let (status, _) = send(&app, Method::POST, &uri, Some(&attendee), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cancelled) = send(&app, Method::POST, &uri, Some(&host), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"].as_str(), Some("cancelled"));

    let (status, body) = send(&app, Method::POST, &uri, Some(&host), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["code"].as_str(), Some("event_not_cancellable"));
}

#[rstest]
#[actix_web::test]
async fn delete_applies_only_to_empty_events() {
    let busy = hosted_event().participants([user(ATTENDEE_ID)]).build();
    let empty = hosted_event().build();
    let (busy_id, empty_id) = (busy.id(), empty.id());
    let harness = MemoryHarness::with_events([busy, empty]);
    let app = actix_test::init_service(api_app(harness.state())).await;
    let admin = login_cookie(&app, "admin").await;

    let (status, body) =
        send(&app, Method::DELETE, &format!("/api/v1/events/{busy_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["code"].as_str(), Some("event_has_participants"));

    let empty_uri = format!("/api/v1/events/{empty_id}");
    let (status, _) = send(&app, Method::DELETE, &empty_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &empty_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["details"]["code"].as_str(), Some("event_not_found"));
}

#[rstest]
#[actix_web::test]
async fn malformed_ids_are_invalid_requests() {
    let harness = MemoryHarness::with_events([]);
    let app = actix_test::init_service(api_app(harness.state())).await;

    let (status, body) = send(&app, Method::GET, "/api/v1/events/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["code"].as_str(), Some("invalid_uuid"));

    let unknown = EventId::random();
    let path = format!("/api/v1/events/{unknown}");
    let (status, _) = send(&app, Method::GET, &path, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
