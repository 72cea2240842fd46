//! Builder for events in arbitrary, invariant-respecting states.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{
    Capacity, Category, Event, EventId, EventParts, EventStatus, Price, UserId,
};

/// Builds [`Event`]s through [`Event::from_parts`], so every built event
/// satisfies the occupancy invariant.
///
/// Defaults: a free, upcoming, approved "Board games night" with ten seats
/// and no participants, starting a week after 2026-05-01.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    parts: EventParts,
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Creation time of built events; they start seven days later.
pub fn base_time() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).single() {
        Some(time) => time,
        None => panic!("fixture timestamp"),
    }
}

impl EventBuilder {
    pub fn new() -> Self {
        let created_at = base_time();
        let capacity = match Capacity::new(10) {
            Ok(capacity) => capacity,
            Err(err) => panic!("fixture capacity: {err}"),
        };
        Self {
            parts: EventParts {
                id: EventId::random(),
                host_id: UserId::random(),
                title: "Board games night".to_owned(),
                description: "Bring a game, learn a game, stay for pizza.".to_owned(),
                category: Category::Gaming,
                location: "Community hall".to_owned(),
                starts_at: created_at + Duration::days(7),
                capacity,
                current_participants: 0,
                participants: Vec::new(),
                status: EventStatus::Upcoming,
                is_approved: true,
                price: Price::FREE,
                is_paid: false,
                created_at,
            },
        }
    }

    pub fn id(mut self, id: EventId) -> Self {
        self.parts.id = id;
        self
    }

    pub fn host(mut self, host_id: UserId) -> Self {
        self.parts.host_id = host_id;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.parts.title = title.to_owned();
        self
    }

    pub fn capacity(mut self, seats: u32) -> Self {
        self.parts.capacity = match Capacity::new(seats) {
            Ok(capacity) => capacity,
            Err(err) => panic!("builder capacity: {err}"),
        };
        self
    }

    /// Sets the price; a positive price marks the event paid.
    pub fn price(mut self, minor_units: i64) -> Self {
        self.parts.price = match Price::new(minor_units) {
            Ok(price) => price,
            Err(err) => panic!("builder price: {err}"),
        };
        self.parts.is_paid = minor_units > 0;
        self
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.parts.status = status;
        self
    }

    pub fn approved(mut self, approved: bool) -> Self {
        self.parts.is_approved = approved;
        self
    }

    pub fn starts_at(mut self, starts_at: DateTime<Utc>) -> Self {
        self.parts.starts_at = starts_at;
        self
    }

    /// Replaces the participant set and keeps the counter in step.
    pub fn participants(mut self, participants: impl IntoIterator<Item = UserId>) -> Self {
        self.parts.participants = participants.into_iter().collect();
        self.parts.current_participants = match u32::try_from(self.parts.participants.len()) {
            Ok(count) => count,
            Err(_) => panic!("too many participants"),
        };
        self
    }

    /// Raw parts, for tests that need to break the invariant on purpose.
    pub fn into_parts(self) -> EventParts {
        self.parts
    }

    pub fn build(self) -> Event {
        match Event::from_parts(self.parts) {
            Ok(event) => event,
            Err(err) => panic!("builder produced an invalid event: {err}"),
        }
    }
}
