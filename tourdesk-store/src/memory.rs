use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use tourdesk_catalog::{Package, PackageQuery, Page};
use tourdesk_core::identity::normalize_email;
use tourdesk_core::{
    BookingFilter, BookingRepository, CoreError, CoreResult, PackageRepository, Role, User,
    UserRepository,
};
use tourdesk_order::Booking;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    packages: HashMap<Uuid, Package>,
    bookings: HashMap<Uuid, Booking>,
}

/// Process-local repositories used for development and tests. Cloning
/// shares the same underlying maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(state: &State, email: &str, except: Option<Uuid>) -> bool {
    state
        .users
        .values()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        let mut state = self.state.write().await;
        if email_taken(&state, &user.email, None) {
            return Err(CoreError::Conflict("Record already exists".into()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let email = normalize_email(email);
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> CoreResult<()> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(CoreError::NotFound("User not found".into()));
        }
        if email_taken(&state, &user.email, Some(user.id)) {
            return Err(CoreError::Conflict("Record already exists".into()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn list_users_by_role(&self, role: Role) -> CoreResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().filter(|u| u.role == role).cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }
}

#[async_trait]
impl PackageRepository for MemoryStore {
    async fn create_package(&self, package: &Package) -> CoreResult<()> {
        let mut state = self.state.write().await;
        if state.packages.contains_key(&package.id) {
            return Err(CoreError::Conflict("Record already exists".into()));
        }
        state.packages.insert(package.id, package.clone());
        Ok(())
    }

    async fn get_package(&self, id: Uuid) -> CoreResult<Option<Package>> {
        Ok(self.state.read().await.packages.get(&id).cloned())
    }

    async fn list_packages(&self, query: &PackageQuery, now: DateTime<Utc>) -> CoreResult<Page<Package>> {
        let state = self.state.read().await;
        Ok(query.apply(state.packages.values().cloned(), now))
    }

    async fn all_packages(&self) -> CoreResult<Vec<Package>> {
        let state = self.state.read().await;
        let mut packages: Vec<Package> = state.packages.values().cloned().collect();
        packages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(packages)
    }

    async fn update_package(&self, package: &Package) -> CoreResult<()> {
        let mut state = self.state.write().await;
        match state.packages.get_mut(&package.id) {
            Some(existing) => {
                *existing = package.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound("Package not found".into())),
        }
    }

    async fn delete_package(&self, id: Uuid) -> CoreResult<Option<Package>> {
        let mut state = self.state.write().await;
        let removed = state.packages.remove(&id);
        if removed.is_some() {
            state.bookings.retain(|_, b| b.package_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()> {
        let mut state = self.state.write().await;
        if !state.packages.contains_key(&booking.package_id) {
            return Err(CoreError::NotFound("Package not found".into()));
        }
        if !state.users.contains_key(&booking.user_id) {
            return Err(CoreError::NotFound("User not found".into()));
        }
        state.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> CoreResult<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| filter.user_id.is_none_or(|id| b.user_id == id))
            .filter(|b| filter.package_id.is_none_or(|id| b.package_id == id))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(bookings)
    }

    async fn update_booking(&self, booking: &Booking) -> CoreResult<()> {
        let mut state = self.state.write().await;
        match state.bookings.get_mut(&booking.id) {
            Some(existing) => {
                *existing = booking.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("Booking {} not found", booking.id))),
        }
    }
}
