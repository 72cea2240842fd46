//! Event HTTP handlers.
//!
//! ```text
//! POST   /api/v1/events
//! GET    /api/v1/events/{id}
//! POST   /api/v1/events/{id}/join
//! POST   /api/v1/events/{id}/leave
//! POST   /api/v1/events/{id}/cancel
//! DELETE /api/v1/events/{id}
//! ```
//!
//! Joining here is the free path only; paid events are joined by settling a
//! payment (see [`crate::inbound::http::payments`]).

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Event, EventDraft};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::Field;

/// Request payload for publishing an event.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequestBody {
    #[schema(example = "Board games night")]
    pub title: String,
    pub description: String,
    #[schema(example = "Gaming")]
    pub category: String,
    pub location: String,
    #[schema(format = "date-time")]
    pub starts_at: String,
    #[schema(minimum = 1, maximum = 1000)]
    pub max_participants: u32,
    /// Ticket price in minor currency units; `0` or absent for a free event.
    #[serde(default)]
    pub price: i64,
}

/// Event as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResponseBody {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub host_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    #[schema(format = "date-time")]
    pub starts_at: String,
    pub max_participants: u32,
    pub current_participants: u32,
    #[schema(value_type = Vec<uuid::Uuid>)]
    pub participants: Vec<String>,
    #[schema(example = "upcoming")]
    pub status: String,
    pub is_approved: bool,
    pub price: i64,
    pub is_paid: bool,
    #[schema(format = "date-time")]
    pub created_at: String,
}

impl From<Event> for EventResponseBody {
    fn from(event: Event) -> Self {
        Self {
            id: event.id().to_string(),
            host_id: event.host_id().to_string(),
            title: event.title().to_owned(),
            description: event.description().to_owned(),
            category: event.category().label().to_owned(),
            location: event.location().to_owned(),
            starts_at: event.starts_at().to_rfc3339(),
            max_participants: event.capacity().get(),
            current_participants: event.current_participants(),
            participants: event.participants().iter().map(ToString::to_string).collect(),
            status: event.status().as_str().to_owned(),
            is_approved: event.is_approved(),
            price: event.price().minor_units(),
            is_paid: event.is_paid(),
            created_at: event.created_at().to_rfc3339(),
        }
    }
}

/// Publish an event hosted by the caller. Hosts and admins only.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    request_body = CreateEventRequestBody,
    responses(
        (status = 201, description = "Event created", body = EventResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["events"],
    operation_id = "createEvent",
    security(("SessionCookie" = []))
)]
#[post("/events")]
pub async fn create_event(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateEventRequestBody>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_identity()?;
    let body = payload.into_inner();
    let draft = EventDraft {
        starts_at: Field::STARTS_AT.timestamp(&body.starts_at)?,
        title: body.title,
        description: body.description,
        category: body.category,
        location: body.location,
        max_participants: body.max_participants,
        price: body.price,
    };
    let event = state.events.create(&caller, draft).await?;
    Ok(HttpResponse::Created().json(EventResponseBody::from(event)))
}

/// Fetch one event.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    params(("id" = String, Path, format = "uuid", description = "Event id")),
    responses(
        (status = 200, description = "Event", body = EventResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["events"],
    operation_id = "getEvent",
    security([])
)]
#[get("/events/{id}")]
pub async fn get_event(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<EventResponseBody>> {
    let event_id = Field::PATH_ID.event_id(&path.into_inner())?;
    let event = state.events_query.get(&event_id).await?;
    Ok(web::Json(EventResponseBody::from(event)))
}

/// Take a seat at a free event.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/join",
    params(("id" = String, Path, format = "uuid", description = "Event id")),
    responses(
        (status = 200, description = "Joined; the updated event", body = EventResponseBody),
        (status = 400, description = "Event requires payment", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Full, already joined, or not joinable", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["events"],
    operation_id = "joinEvent",
    security(("SessionCookie" = []))
)]
#[post("/events/{id}/join")]
pub async fn join_event(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<EventResponseBody>> {
    let attendee = session.require_user_id()?;
    let event_id = Field::PATH_ID.event_id(&path.into_inner())?;
    let event = state.enrollment.join_free(&event_id, &attendee).await?;
    Ok(web::Json(EventResponseBody::from(event)))
}

/// Release the caller's seat.
///
/// Leaving a paid event never refunds the payment.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/leave",
    params(("id" = String, Path, format = "uuid", description = "Event id")),
    responses(
        (status = 204, description = "Seat released"),
        (status = 400, description = "Not a participant", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["events"],
    operation_id = "leaveEvent",
    security(("SessionCookie" = []))
)]
#[post("/events/{id}/leave")]
pub async fn leave_event(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let attendee = session.require_user_id()?;
    let event_id = Field::PATH_ID.event_id(&path.into_inner())?;
    state.enrollment.leave(&event_id, &attendee).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Cancel an upcoming or ongoing event. Host of the event or admin.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/cancel",
    params(("id" = String, Path, format = "uuid", description = "Event id")),
    responses(
        (status = 200, description = "Cancelled event", body = EventResponseBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "No longer cancellable", body = ErrorSchema)
    ),
    tags = ["events"],
    operation_id = "cancelEvent",
    security(("SessionCookie" = []))
)]
#[post("/events/{id}/cancel")]
pub async fn cancel_event(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<EventResponseBody>> {
    let caller = session.require_identity()?;
    let event_id = Field::PATH_ID.event_id(&path.into_inner())?;
    let event = state.events.cancel(&caller, &event_id).await?;
    Ok(web::Json(EventResponseBody::from(event)))
}

/// Delete an event nobody has joined. Host of the event or admin.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    params(("id" = String, Path, format = "uuid", description = "Event id")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Event has participants", body = ErrorSchema)
    ),
    tags = ["events"],
    operation_id = "deleteEvent",
    security(("SessionCookie" = []))
)]
#[delete("/events/{id}")]
pub async fn delete_event(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_identity()?;
    let event_id = Field::PATH_ID.event_id(&path.into_inner())?;
    state.events.delete(&caller, &event_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
