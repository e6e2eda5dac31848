use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tourdesk_catalog::{
    parse_date, CatalogError, PackageDraft, PackagePatch, PackageQuery, PackageQueryParams,
    PackageView,
};
use tourdesk_core::{BookingFilter, User};
use tourdesk_order::{package_analytics, PackageAnalytics};
use tourdesk_shared::models::events::PackageChangedEvent;
use tourdesk_shared::DomainEvent;
use tourdesk_store::MediaKind;
use uuid::Uuid;

use crate::error::AppError;
use crate::form::{FormData, UploadedFile};
use crate::middleware::{require_admin, require_auth};
use crate::response::{Envelope, Message};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PackageList {
    pub success: bool,
    pub count: usize,
    pub total: u64,
    pub data: Vec<PackageView>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/packages", get(list_packages))
        .route("/api/packages/{id}", get(get_package));

    let admin = Router::new()
        .route("/api/packages/create", post(create_package))
        .route("/api/packages/analytics", get(analytics))
        .route("/api/packages/{id}", put(update_package).delete(delete_package))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(admin)
}

fn date_field(form: &FormData, name: &str) -> Result<Option<DateTime<Utc>>, AppError> {
    Ok(form.text(name).map(parse_date).transpose()?)
}

fn changed(package_id: Uuid, actor: &User) -> PackageChangedEvent {
    PackageChangedEvent {
        package_id,
        actor_id: actor.id,
        timestamp: Utc::now(),
    }
}

/// Stores every upload or none of them.
async fn save_images(state: &AppState, files: &[UploadedFile]) -> Result<Vec<String>, AppError> {
    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        match state
            .media
            .save(MediaKind::Package, &file.file_name, &file.content_type, &file.bytes)
            .await
        {
            Ok(url) => urls.push(url),
            Err(e) => {
                state.media.delete_all(&urls).await;
                return Err(e.into());
            }
        }
    }
    Ok(urls)
}

fn check_image_count(state: &AppState, count: usize) -> Result<(), AppError> {
    if count > state.media.max_package_images() {
        return Err(CatalogError::TooManyImages.into());
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/packages
pub async fn list_packages(
    State(state): State<AppState>,
    Query(params): Query<PackageQueryParams>,
) -> Result<Json<PackageList>, AppError> {
    let query = PackageQuery::try_from(params)?;
    let now = Utc::now();
    let page = state.packages.list_packages(&query, now).await?;

    let data: Vec<PackageView> = page.items.iter().map(|p| p.view_at(now)).collect();
    Ok(Json(PackageList {
        success: true,
        count: data.len(),
        total: page.total,
        data,
    }))
}

/// GET /api/packages/{id}
pub async fn get_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PackageView>, AppError> {
    let package = state
        .packages
        .get_package(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Package not found".into()))?;

    Ok(Json(package.view_at(Utc::now())))
}

/// POST /api/packages/create
pub async fn create_package(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PackageView>), AppError> {
    let form = FormData::read(multipart).await?;
    let uploads = form.files("images");
    check_image_count(&state, uploads.len())?;

    let draft = PackageDraft {
        from_location: form.text_or_default("fromLocation"),
        to_location: form.text_or_default("toLocation"),
        start_date: date_field(&form, "startDate")?,
        end_date: date_field(&form, "endDate")?,
        base_price: form.integer("basePrice")?,
        included_services: form.json("includedServices")?.unwrap_or_default(),
        food_price: form.integer("foodPrice")?.unwrap_or(0),
        accommodation_price: form.integer("accommodationPrice")?.unwrap_or(0),
        description: form.text_or_default("description"),
    };

    let now = Utc::now();
    // validated before any file touches the disk
    let mut package = draft.into_package(admin.id, Vec::new(), now)?;
    package.images = save_images(&state, uploads).await?;

    if let Err(e) = state.packages.create_package(&package).await {
        state.media.delete_all(&package.images).await;
        return Err(e.into());
    }

    tracing::info!(package_id = %package.id, route = %package.display_name(), "Package created");
    state.publish(DomainEvent::PackageCreated(changed(package.id, &admin)));

    Ok((StatusCode::CREATED, Json(package.view_at(now))))
}

/// PUT /api/packages/{id}
pub async fn update_package(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<PackageView>, AppError> {
    let form = FormData::read(multipart).await?;
    let existing = state
        .packages
        .get_package(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Package not found".into()))?;

    let kept: Vec<String> = match form.json::<Vec<String>>("keepImages")? {
        Some(keep) => existing
            .images
            .iter()
            .filter(|url| keep.contains(url))
            .cloned()
            .collect(),
        None => existing.images.clone(),
    };
    let uploads = form.files("images");
    check_image_count(&state, kept.len() + uploads.len())?;

    let patch = PackagePatch {
        from_location: form.text("fromLocation").map(str::to_string),
        to_location: form.text("toLocation").map(str::to_string),
        start_date: date_field(&form, "startDate")?,
        end_date: date_field(&form, "endDate")?,
        base_price: form.integer("basePrice")?,
        included_services: form.json("includedServices")?,
        food_price: form.integer("foodPrice")?,
        accommodation_price: form.integer("accommodationPrice")?,
        description: form.text("description").map(str::to_string),
        images: Some(kept),
    };

    let now = Utc::now();
    let mut next = existing.apply_patch(patch, now)?;
    let added = save_images(&state, uploads).await?;
    next.images.extend(added.iter().cloned());

    if let Err(e) = state.packages.update_package(&next).await {
        state.media.delete_all(&added).await;
        return Err(e.into());
    }

    let dropped: Vec<String> = existing
        .images
        .iter()
        .filter(|url| !next.images.contains(url))
        .cloned()
        .collect();
    state.media.delete_all(&dropped).await;

    tracing::info!(package_id = %id, added = added.len(), dropped = dropped.len(), "Package updated");
    state.publish(DomainEvent::PackageUpdated(changed(id, &admin)));

    Ok(Json(next.view_at(now)))
}

/// DELETE /api/packages/{id}
pub async fn delete_package(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Message>>, AppError> {
    let removed = state
        .packages
        .delete_package(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Package not found".into()))?;

    state.media.delete_all(&removed.images).await;

    tracing::info!(package_id = %id, "Package deleted with its bookings");
    state.publish(DomainEvent::PackageDeleted(changed(id, &admin)));

    Ok(Json(Envelope::ok(Message {
        message: "Package deleted successfully",
    })))
}

/// GET /api/packages/analytics
pub async fn analytics(State(state): State<AppState>) -> Result<Json<Envelope<PackageAnalytics>>, AppError> {
    let packages = state.packages.all_packages().await?;
    let bookings = state.bookings.list_bookings(&BookingFilter::default()).await?;

    Ok(Json(Envelope::ok(package_analytics(&packages, &bookings, Utc::now()))))
}
