use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tourdesk_catalog::{quote, Package, SchedulePhase, ServiceSelection, Services};

use crate::OrderError;

pub type SelectedServices = Services;

/// Booking lifecycle label. `pending`/`accepted`/`cancelled` are set
/// explicitly; `upcoming`/`active`/`completed` mirror the package schedule
/// and may also be pinned by an administrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Upcoming,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Upcoming => "upcoming",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl From<SchedulePhase> for BookingStatus {
    fn from(phase: SchedulePhase) -> Self {
        match phase {
            SchedulePhase::Upcoming => BookingStatus::Upcoming,
            SchedulePhase::Active => BookingStatus::Active,
            SchedulePhase::Completed => BookingStatus::Completed,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "accepted" => Ok(BookingStatus::Accepted),
            "upcoming" => Ok(BookingStatus::Upcoming),
            "active" => Ok(BookingStatus::Active),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(OrderError::InvalidStatus(other.to_string())),
        }
    }
}

/// A user's reservation against a package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub package_id: Uuid,
    pub user_id: Uuid,
    pub selected_services: SelectedServices,
    pub total_price: i64,
    pub status: Option<BookingStatus>,
    pub booking_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Prices the request against the package and auto-accepts it.
    pub fn place(
        package: &Package,
        user_id: Uuid,
        requested: ServiceSelection,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if package.phase_at(now) == SchedulePhase::Completed {
            return Err(OrderError::PackageClosed);
        }

        let quote = quote(package, requested);
        Ok(Self {
            id: Uuid::new_v4(),
            package_id: package.id,
            user_id,
            selected_services: quote.selected,
            total_price: quote.total_price,
            status: Some(BookingStatus::Accepted),
            booking_date: now,
            created_at: now,
            updated_at: now,
        })
    }

    /// The schedule-derived status: the package's phase when its dates are
    /// known, the explicit status otherwise.
    pub fn schedule_status(
        &self,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
        now: DateTime<Utc>,
    ) -> Option<BookingStatus> {
        match window {
            Some((start, end)) => Some(SchedulePhase::classify(start, end, now).into()),
            None => self.status,
        }
    }

    pub fn set_status(&mut self, status: BookingStatus, now: DateTime<Utc>) -> Option<BookingStatus> {
        let previous = self.status.replace(status);
        self.updated_at = now;
        previous
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == Some(BookingStatus::Cancelled)
    }
}
