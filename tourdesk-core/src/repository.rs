use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use tourdesk_catalog::{Package, PackageQuery, Page};
use tourdesk_order::Booking;

use crate::identity::{Role, User};
use crate::CoreResult;

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: &User) -> CoreResult<()>;

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>>;

    async fn update_user(&self, user: &User) -> CoreResult<()>;

    async fn list_users_by_role(&self, role: Role) -> CoreResult<Vec<User>>;
}

/// Repository trait for the package catalog
#[async_trait]
pub trait PackageRepository: Send + Sync {
    async fn create_package(&self, package: &Package) -> CoreResult<()>;

    async fn get_package(&self, id: Uuid) -> CoreResult<Option<Package>>;

    /// `now` decides the derived phase used by the status filter.
    async fn list_packages(&self, query: &PackageQuery, now: DateTime<Utc>) -> CoreResult<Page<Package>>;

    async fn all_packages(&self) -> CoreResult<Vec<Package>>;

    async fn update_package(&self, package: &Package) -> CoreResult<()>;

    /// Removes the package and every booking made against it. Returns the
    /// removed package so the caller can clean up its images.
    async fn delete_package(&self, id: Uuid) -> CoreResult<Option<Package>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub user_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
}

/// Repository trait for bookings
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()>;

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>>;

    /// Newest first
    async fn list_bookings(&self, filter: &BookingFilter) -> CoreResult<Vec<Booking>>;

    async fn update_booking(&self, booking: &Booking) -> CoreResult<()>;
}
