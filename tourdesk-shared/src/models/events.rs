use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub package_id: Uuid,
    pub user_id: Uuid,
    pub total_price: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BookingStatusChangedEvent {
    pub booking_id: Uuid,
    pub previous: Option<String>,
    pub current: String,
    pub changed_by: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PackageChangedEvent {
    pub package_id: Uuid,
    pub actor_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingCreated(BookingCreatedEvent),
    BookingStatusChanged(BookingStatusChangedEvent),
    PackageCreated(PackageChangedEvent),
    PackageUpdated(PackageChangedEvent),
    PackageDeleted(PackageChangedEvent),
}

impl DomainEvent {
    /// Routing key used when the event is logged or fanned out.
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::BookingCreated(_) => "booking.created",
            DomainEvent::BookingStatusChanged(_) => "booking.status_changed",
            DomainEvent::PackageCreated(_) => "package.created",
            DomainEvent::PackageUpdated(_) => "package.updated",
            DomainEvent::PackageDeleted(_) => "package.deleted",
        }
    }
}
