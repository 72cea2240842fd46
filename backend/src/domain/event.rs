//! Event aggregate: capacity, participants, and lifecycle state.
//!
//! ## Invariants
//! - `current_participants == participants.len() <= capacity`.
//! - `participants` holds no duplicates.
//! - `price > 0` implies `is_paid`.
//!
//! The admission and removal rules live here as pure functions so the
//! in-memory store and the SQL predicates in the Diesel store express the
//! same decision.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Largest capacity an organiser may declare.
pub const MAX_CAPACITY: u32 = 1000;
/// Title length bounds (characters, after trimming).
pub const TITLE_LEN: (usize, usize) = (3, 100);
/// Description length bounds (characters, after trimming).
pub const DESCRIPTION_LEN: (usize, usize) = (10, 2000);

/// Validation failures for event values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventValidationError {
    /// Event id was not a UUID.
    #[error("event id must be a valid UUID")]
    InvalidId,
    /// Title outside the allowed length.
    #[error("title must be between {min} and {max} characters")]
    TitleLength { min: usize, max: usize },
    /// Description outside the allowed length.
    #[error("description must be between {min} and {max} characters")]
    DescriptionLength { min: usize, max: usize },
    /// Location was blank.
    #[error("location must not be empty")]
    EmptyLocation,
    /// Category not in the fixed list.
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    /// Status not in the fixed list.
    #[error("unknown event status: {0}")]
    UnknownStatus(String),
    /// Start time not in the future.
    #[error("event date must be in the future")]
    StartsInPast,
    /// Capacity outside `1..=MAX_CAPACITY`.
    #[error("capacity must be between 1 and {max}")]
    CapacityOutOfRange { max: u32 },
    /// Negative price.
    #[error("price must not be negative")]
    NegativePrice,
    /// Stored occupancy disagrees with the participant set or capacity.
    #[error("occupancy {current} does not match {participants} participants within capacity {capacity}")]
    InconsistentOccupancy {
        current: u32,
        participants: usize,
        capacity: u32,
    },
    /// The participant set contains a duplicate.
    #[error("participant {0} appears more than once")]
    DuplicateParticipant(UserId),
    /// A positive price without the paid flag.
    #[error("a priced event must be marked as paid")]
    PricedButFree,
}

/// Stable event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a new random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EventId {
    type Err = EventValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| EventValidationError::InvalidId)
    }
}

/// Positive participant ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Capacity(u32);

impl Capacity {
    /// Validate a raw capacity.
    pub fn new(value: u32) -> Result<Self, EventValidationError> {
        if value == 0 || value > MAX_CAPACITY {
            return Err(EventValidationError::CapacityOutOfRange { max: MAX_CAPACITY });
        }
        Ok(Self(value))
    }

    /// Raw seat count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Capacity {
    type Error = EventValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Capacity> for u32 {
    fn from(value: Capacity) -> Self {
        value.0
    }
}

/// Non-negative amount in minor currency units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Price(i64);

impl Price {
    /// A zero price.
    pub const FREE: Self = Self(0);

    /// Validate a raw amount.
    pub fn new(minor_units: i64) -> Result<Self, EventValidationError> {
        if minor_units < 0 {
            return Err(EventValidationError::NegativePrice);
        }
        Ok(Self(minor_units))
    }

    /// Amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// True for a zero price.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i64> for Price {
    type Error = EventValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for i64 {
    fn from(value: Price) -> Self {
        value.0
    }
}

/// Event lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Accepting participants.
    Upcoming,
    /// Under way; no longer joinable.
    Ongoing,
    /// Date elapsed.
    Completed,
    /// Called off by the organiser.
    Cancelled,
}

impl EventStatus {
    /// Stable string form used in persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the organiser may still cancel from this state.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Upcoming | Self::Ongoing)
    }
}

impl FromStr for EventStatus {
    type Err = EventValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EventValidationError::UnknownStatus(other.to_owned())),
        }
    }
}

/// Fixed event category list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Concerts,
    Sports,
    Hiking,
    TechMeetups,
    Gaming,
    FoodAndDining,
    ArtsAndCulture,
    Networking,
    Workshops,
    Other,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 10] = [
        Self::Concerts,
        Self::Sports,
        Self::Hiking,
        Self::TechMeetups,
        Self::Gaming,
        Self::FoodAndDining,
        Self::ArtsAndCulture,
        Self::Networking,
        Self::Workshops,
        Self::Other,
    ];

    /// Human label, also the stored form.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Concerts => "Concerts",
            Self::Sports => "Sports",
            Self::Hiking => "Hiking",
            Self::TechMeetups => "Tech Meetups",
            Self::Gaming => "Gaming",
            Self::FoodAndDining => "Food & Dining",
            Self::ArtsAndCulture => "Arts & Culture",
            Self::Networking => "Networking",
            Self::Workshops => "Workshops",
            Self::Other => "Other",
        }
    }
}

impl FromStr for Category {
    type Err = EventValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.label() == s)
            .ok_or_else(|| EventValidationError::UnknownCategory(s.to_owned()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of an admission attempt against one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// The attendee now holds a seat.
    Admitted,
    /// The attendee already held a seat; nothing changed.
    AlreadyMember,
    /// No seat left.
    Full,
    /// Event not upcoming or not approved.
    NotJoinable,
}

/// Result of a removal attempt against one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The attendee's seat was released.
    Removed,
    /// The attendee held no seat.
    NotMember,
}

/// Organiser input for a new event, before validation.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub max_participants: u32,
    pub price: i64,
}

/// Raw stored fields used to rebuild an [`Event`].
#[derive(Debug, Clone)]
pub struct EventParts {
    pub id: EventId,
    pub host_id: UserId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub capacity: Capacity,
    pub current_participants: u32,
    pub participants: Vec<UserId>,
    pub status: EventStatus,
    pub is_approved: bool,
    pub price: Price,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

/// A scheduled, capacity-limited gathering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    id: EventId,
    host_id: UserId,
    title: String,
    description: String,
    category: Category,
    location: String,
    starts_at: DateTime<Utc>,
    capacity: Capacity,
    participants: Vec<UserId>,
    status: EventStatus,
    is_approved: bool,
    price: Price,
    is_paid: bool,
    created_at: DateTime<Utc>,
}

fn check_length(
    value: &str,
    bounds: (usize, usize),
    error: EventValidationError,
) -> Result<String, EventValidationError> {
    let trimmed = value.trim();
    let length = trimmed.chars().count();
    if length < bounds.0 || length > bounds.1 {
        return Err(error);
    }
    Ok(trimmed.to_owned())
}

impl Event {
    /// Validate an organiser draft into a new upcoming, approved event.
    pub fn create(
        draft: EventDraft,
        host_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, EventValidationError> {
        let title = check_length(
            &draft.title,
            TITLE_LEN,
            EventValidationError::TitleLength {
                min: TITLE_LEN.0,
                max: TITLE_LEN.1,
            },
        )?;
        let description = check_length(
            &draft.description,
            DESCRIPTION_LEN,
            EventValidationError::DescriptionLength {
                min: DESCRIPTION_LEN.0,
                max: DESCRIPTION_LEN.1,
            },
        )?;
        let category = draft.category.parse()?;
        let location = draft.location.trim();
        if location.is_empty() {
            return Err(EventValidationError::EmptyLocation);
        }
        if draft.starts_at <= now {
            return Err(EventValidationError::StartsInPast);
        }
        let capacity = Capacity::new(draft.max_participants)?;
        let price = Price::new(draft.price)?;

        Ok(Self {
            id: EventId::random(),
            host_id,
            title,
            description,
            category,
            location: location.to_owned(),
            starts_at: draft.starts_at,
            capacity,
            participants: Vec::new(),
            status: EventStatus::Upcoming,
            is_approved: true,
            price,
            is_paid: !price.is_zero(),
            created_at: now,
        })
    }

    /// Rebuild an event from stored fields, rejecting any row that breaks
    /// the occupancy invariant.
    pub fn from_parts(parts: EventParts) -> Result<Self, EventValidationError> {
        let EventParts {
            id,
            host_id,
            title,
            description,
            category,
            location,
            starts_at,
            capacity,
            current_participants,
            participants,
            status,
            is_approved,
            price,
            is_paid,
            created_at,
        } = parts;

        let count_matches = usize::try_from(current_participants)
            .is_ok_and(|current| current == participants.len());
        if !count_matches || current_participants > capacity.get() {
            return Err(EventValidationError::InconsistentOccupancy {
                current: current_participants,
                participants: participants.len(),
                capacity: capacity.get(),
            });
        }
        for (index, participant) in participants.iter().enumerate() {
            if participants.iter().skip(index + 1).any(|other| other == participant) {
                return Err(EventValidationError::DuplicateParticipant(*participant));
            }
        }
        if !price.is_zero() && !is_paid {
            return Err(EventValidationError::PricedButFree);
        }

        Ok(Self {
            id,
            host_id,
            title,
            description,
            category,
            location,
            starts_at,
            capacity,
            participants,
            status,
            is_approved,
            price,
            is_paid,
            created_at,
        })
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn host_id(&self) -> UserId {
        self.host_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn participants(&self) -> &[UserId] {
        &self.participants
    }

    /// Occupied seats; always equal to `participants().len()`.
    pub fn current_participants(&self) -> u32 {
        u32::try_from(self.participants.len()).unwrap_or(u32::MAX)
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn is_approved(&self) -> bool {
        self.is_approved
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Paid enrollment is required: flagged paid with a positive price.
    pub fn requires_payment(&self) -> bool {
        self.is_paid && !self.price.is_zero()
    }

    /// Open for enrollment: upcoming and approved.
    pub fn is_joinable(&self) -> bool {
        self.status == EventStatus::Upcoming && self.is_approved
    }

    /// At least one free seat remains.
    pub fn has_free_seat(&self) -> bool {
        self.current_participants() < self.capacity.get()
    }

    pub fn is_participant(&self, attendee: &UserId) -> bool {
        self.participants.contains(attendee)
    }

    /// Whether the start day lies strictly before the day of `now`.
    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.starts_at.date_naive() < now.date_naive()
    }

    /// Decide an admission without mutating the event.
    pub fn admission(&self, attendee: &UserId) -> AdmitOutcome {
        if !self.is_joinable() {
            AdmitOutcome::NotJoinable
        } else if self.is_participant(attendee) {
            AdmitOutcome::AlreadyMember
        } else if !self.has_free_seat() {
            AdmitOutcome::Full
        } else {
            AdmitOutcome::Admitted
        }
    }

    /// Apply an admission: the participant set and the count move together.
    pub fn try_admit(&mut self, attendee: UserId) -> AdmitOutcome {
        let outcome = self.admission(&attendee);
        if outcome == AdmitOutcome::Admitted {
            self.participants.push(attendee);
        }
        outcome
    }

    /// Release a seat held by `attendee`.
    pub fn try_remove(&mut self, attendee: &UserId) -> RemoveOutcome {
        let before = self.participants.len();
        self.participants.retain(|participant| participant != attendee);
        if self.participants.len() < before {
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::NotMember
        }
    }

    /// Move to `cancelled`; returns false when the state forbids it.
    pub fn cancel(&mut self) -> bool {
        if !self.status.is_cancellable() {
            return false;
        }
        self.status = EventStatus::Cancelled;
        true
    }

    /// Move to `completed` when the start day has elapsed.
    pub fn complete_if_elapsed(&mut self, now: DateTime<Utc>) -> bool {
        if !self.status.is_cancellable() || !self.has_elapsed(now) {
            return false;
        }
        self.status = EventStatus::Completed;
        true
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
