use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use tourdesk_catalog::{Package, SchedulePhase};

use crate::models::{Booking, BookingStatus};

const TOP_USERS: usize = 5;

/// Who made a booking, as far as dashboards care
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub completed: u64,
    pub active: u64,
    pub upcoming: u64,
    pub cancelled: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub bookings_count: u64,
    pub total_spent: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingAnalytics {
    pub total_bookings: u64,
    pub status_counts: StatusCounts,
    pub top_users: Vec<TopUser>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PhaseCount {
    pub status: SchedulePhase,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageBookings {
    pub package_id: Uuid,
    pub bookings_count: u64,
    pub package_name: String,
    pub to_location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageAnalytics {
    pub packages_count: Vec<PhaseCount>,
    pub bookings_per_package: Vec<PackageBookings>,
}

/// Cancelled bookings count as cancelled; every other booking counts under
/// its package's phase, or its explicit schedule label when the package is
/// gone.
fn count_bucket(
    booking: &Booking,
    packages: &HashMap<Uuid, Package>,
    now: DateTime<Utc>,
) -> Option<BookingStatus> {
    if booking.is_cancelled() {
        return Some(BookingStatus::Cancelled);
    }
    match packages.get(&booking.package_id) {
        Some(package) => Some(package.phase_at(now).into()),
        None => booking.status.filter(|s| {
            matches!(s, BookingStatus::Upcoming | BookingStatus::Active | BookingStatus::Completed)
        }),
    }
}

pub fn booking_analytics(
    bookings: &[Booking],
    packages: &HashMap<Uuid, Package>,
    customers: &HashMap<Uuid, Customer>,
    now: DateTime<Utc>,
) -> BookingAnalytics {
    let mut status_counts = StatusCounts::default();
    let mut per_user: HashMap<Uuid, (u64, i64)> = HashMap::new();

    for booking in bookings {
        match count_bucket(booking, packages, now) {
            Some(BookingStatus::Cancelled) => status_counts.cancelled += 1,
            Some(BookingStatus::Completed) => status_counts.completed += 1,
            Some(BookingStatus::Active) => status_counts.active += 1,
            Some(BookingStatus::Upcoming) => status_counts.upcoming += 1,
            _ => {}
        }

        let entry = per_user.entry(booking.user_id).or_default();
        entry.0 += 1;
        if !booking.is_cancelled() {
            entry.1 = entry.1.saturating_add(booking.total_price);
        }
    }

    let mut top_users: Vec<TopUser> = per_user
        .into_iter()
        .map(|(id, (bookings_count, total_spent))| {
            let customer = customers.get(&id);
            TopUser {
                id,
                name: customer.map(|c| c.name.clone()),
                email: customer.map(|c| c.email.clone()),
                bookings_count,
                total_spent,
            }
        })
        .collect();
    top_users.sort_by(|a, b| {
        b.bookings_count
            .cmp(&a.bookings_count)
            .then_with(|| b.total_spent.cmp(&a.total_spent))
            .then_with(|| a.id.cmp(&b.id))
    });
    top_users.truncate(TOP_USERS);

    BookingAnalytics {
        total_bookings: bookings.len() as u64,
        status_counts,
        top_users,
    }
}

pub fn package_analytics(
    packages: &[Package],
    bookings: &[Booking],
    now: DateTime<Utc>,
) -> PackageAnalytics {
    let packages_count = SchedulePhase::all()
        .into_iter()
        .map(|phase| PhaseCount {
            status: phase,
            count: packages.iter().filter(|p| p.phase_at(now) == phase).count() as u64,
        })
        .collect();

    let mut counts: HashMap<Uuid, u64> = HashMap::new();
    for booking in bookings.iter().filter(|b| !b.is_cancelled()) {
        *counts.entry(booking.package_id).or_default() += 1;
    }

    let mut bookings_per_package: Vec<PackageBookings> = packages
        .iter()
        .filter_map(|package| {
            counts.get(&package.id).map(|&bookings_count| PackageBookings {
                package_id: package.id,
                bookings_count,
                package_name: package.display_name(),
                to_location: package.to_location.clone(),
                start_date: package.start_date,
                end_date: package.end_date,
            })
        })
        .collect();
    bookings_per_package.sort_by(|a, b| {
        b.bookings_count
            .cmp(&a.bookings_count)
            .then_with(|| a.start_date.cmp(&b.start_date))
            .then_with(|| a.package_id.cmp(&b.package_id))
    });

    PackageAnalytics {
        packages_count,
        bookings_per_package,
    }
}
