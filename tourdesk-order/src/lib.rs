pub mod analytics;
pub mod models;
pub mod status;

pub use analytics::{
    booking_analytics, package_analytics, BookingAnalytics, Customer, PackageAnalytics,
    PackageBookings, PhaseCount, StatusCounts, TopUser,
};
pub use models::{Booking, BookingStatus, SelectedServices};
pub use status::resolve_display_status;
pub use tourdesk_catalog::ServiceSelection;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Invalid booking status: {0}")]
    InvalidStatus(String),

    #[error("Package has already ended and can no longer be booked")]
    PackageClosed,
}
