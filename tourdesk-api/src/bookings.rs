use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tourdesk_catalog::{Package, PackageView};
use tourdesk_core::{BookingFilter, Role, User};
use tourdesk_order::{
    booking_analytics, resolve_display_status, Booking, BookingAnalytics, BookingStatus, Customer,
    ServiceSelection,
};
use tourdesk_shared::models::events::{BookingCreatedEvent, BookingStatusChangedEvent};
use tourdesk_shared::DomainEvent;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::{require_admin, require_auth};
use crate::response::Envelope;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub package_id: Option<Uuid>,
    #[serde(default)]
    pub selected_services: ServiceSelection,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// A booking with its package and customer resolved, plus both derived
/// status labels.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub package: Option<PackageView>,
    pub user: Option<BookingUser>,
    pub booking_status: Option<BookingStatus>,
    pub display_status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BookingList {
    pub success: bool,
    pub count: usize,
    pub data: Vec<BookingView>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let signed_in = Router::new()
        .route("/api/booking", post(create_booking).get(my_bookings))
        .route("/api/booking/{id}", get(get_booking))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/api/booking/package", get(all_bookings))
        .route("/api/booking/analytics", get(analytics))
        .route("/api/booking/{id}", put(update_status))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    signed_in.merge(admin)
}

fn window(package: Option<&Package>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    package.map(|p| (p.start_date, p.end_date))
}

fn view(booking: Booking, package: Option<&Package>, user: Option<&User>, now: DateTime<Utc>) -> BookingView {
    let window = window(package);
    let booking_status = booking.schedule_status(window, now);
    let display_status = resolve_display_status(booking.status, booking_status, window, now)
        .map(|s| s.as_str())
        .unwrap_or("unknown");

    BookingView {
        package: package.map(|p| p.view_at(now)),
        user: user.map(|u| BookingUser {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        }),
        booking_status,
        display_status,
        booking,
    }
}

/// Resolves packages and users for a batch of bookings, fetching each id once.
async fn hydrate(state: &AppState, bookings: Vec<Booking>) -> Result<Vec<BookingView>, AppError> {
    let mut packages: HashMap<Uuid, Option<Package>> = HashMap::new();
    let mut users: HashMap<Uuid, Option<User>> = HashMap::new();

    for booking in &bookings {
        if !packages.contains_key(&booking.package_id) {
            let package = state.packages.get_package(booking.package_id).await?;
            packages.insert(booking.package_id, package);
        }
        if !users.contains_key(&booking.user_id) {
            let user = state.users.get_user(booking.user_id).await?;
            users.insert(booking.user_id, user);
        }
    }

    let now = Utc::now();
    Ok(bookings
        .into_iter()
        .map(|booking| {
            let package = packages.get(&booking.package_id).and_then(Option::as_ref);
            let user = users.get(&booking.user_id).and_then(Option::as_ref);
            view(booking, package, user, now)
        })
        .collect())
}

fn status_filter(raw: Option<&str>) -> Result<Option<BookingStatus>, AppError> {
    Ok(raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<BookingStatus>)
        .transpose()?)
}

fn retain_status(views: &mut Vec<BookingView>, status: Option<BookingStatus>) {
    if let Some(status) = status {
        views.retain(|v| v.display_status == status.as_str());
    }
}

fn list(data: Vec<BookingView>) -> Json<BookingList> {
    Json(BookingList {
        success: true,
        count: data.len(),
        data,
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/booking
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    let package_id = req
        .package_id
        .ok_or_else(|| AppError::ValidationError("packageId is required".into()))?;

    let package = state
        .packages
        .get_package(package_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Package not found".into()))?;

    let now = Utc::now();
    let booking = Booking::place(&package, user.id, req.selected_services, now)?;
    state.bookings.create_booking(&booking).await?;

    tracing::info!(booking_id = %booking.id, package_id = %package.id, total = booking.total_price, "Booking created");
    state.publish(DomainEvent::BookingCreated(BookingCreatedEvent {
        booking_id: booking.id,
        package_id: package.id,
        user_id: user.id,
        total_price: booking.total_price,
        timestamp: now,
    }));

    Ok((StatusCode::CREATED, Json(view(booking, Some(&package), Some(&user), now))))
}

/// GET /api/booking
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<BookingList>, AppError> {
    let status = status_filter(query.status.as_deref())?;
    let filter = BookingFilter {
        user_id: Some(user.id),
        package_id: None,
    };

    let bookings = state.bookings.list_bookings(&filter).await?;
    let mut views = hydrate(&state, bookings).await?;
    retain_status(&mut views, status);

    Ok(list(views))
}

/// GET /api/booking/package
pub async fn all_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<BookingList>, AppError> {
    let status = status_filter(query.status.as_deref())?;
    let filter = BookingFilter {
        user_id: query.user_id,
        package_id: query.package_id,
    };

    let bookings = state.bookings.list_bookings(&filter).await?;
    let mut views = hydrate(&state, bookings).await?;
    retain_status(&mut views, status);

    Ok(list(views))
}

/// GET /api/booking/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    let booking = state
        .bookings
        .get_booking(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".into()))?;

    if booking.user_id != user.id && !user.is_admin() {
        return Err(AppError::AuthorizationError("You are not allowed to view this booking".into()));
    }

    let mut views = hydrate(&state, vec![booking]).await?;
    views
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::InternalServerError("hydrated booking went missing".into()))
}

/// PUT /api/booking/{id}
pub async fn update_status(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<BookingView>, AppError> {
    let status = status_filter(req.status.as_deref())?
        .ok_or_else(|| AppError::ValidationError("status is required".into()))?;

    let mut booking = state
        .bookings
        .get_booking(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".into()))?;

    let now = Utc::now();
    let previous = booking.set_status(status, now);
    state.bookings.update_booking(&booking).await?;

    tracing::info!(booking_id = %id, from = ?previous, to = %status, "Booking status changed");
    state.publish(DomainEvent::BookingStatusChanged(BookingStatusChangedEvent {
        booking_id: id,
        previous: previous.map(|s| s.as_str().to_string()),
        current: status.as_str().to_string(),
        changed_by: admin.id,
        timestamp: now,
    }));

    let mut views = hydrate(&state, vec![booking]).await?;
    views
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::InternalServerError("hydrated booking went missing".into()))
}

/// GET /api/booking/analytics
pub async fn analytics(State(state): State<AppState>) -> Result<Json<Envelope<BookingAnalytics>>, AppError> {
    let bookings = state.bookings.list_bookings(&BookingFilter::default()).await?;
    let packages: HashMap<Uuid, Package> = state
        .packages
        .all_packages()
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut customers: HashMap<Uuid, Customer> = HashMap::new();
    for role in [Role::User, Role::Admin] {
        for user in state.users.list_users_by_role(role).await? {
            customers.insert(
                user.id,
                Customer {
                    id: user.id,
                    name: user.name,
                    email: user.email,
                },
            );
        }
    }

    Ok(Json(Envelope::ok(booking_analytics(&bookings, &packages, &customers, Utc::now()))))
}
