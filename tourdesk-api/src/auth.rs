use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tourdesk_core::identity::normalize_email;
use tourdesk_core::{Role, User, UserProfile};
use tourdesk_store::MediaKind;
use uuid::Uuid;

use crate::error::AppError;
use crate::form::FormData;
use crate::middleware::{issue_token, require_admin, require_auth};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// The slice of a user that travels with a freshly issued token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub profile_picture: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            profile_picture: user.profile_picture.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: &'static str,
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct ClientsResponse {
    pub success: bool,
    pub users: Vec<UserProfile>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    #[serde(default)]
    pub id_token: Option<String>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/auth/reg", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/g-login", post(google_login));

    let signed_in = Router::new()
        .route("/api/auth/me", get(current_user))
        .route("/api/auth/profile", put(update_profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/api/auth/clients", get(list_clients))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(signed_in).merge(admin)
}

fn role_for(state: &AppState, email: &str) -> Role {
    if state.auth.is_admin_email(email) {
        Role::Admin
    } else {
        Role::User
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/reg
pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let form = FormData::read(multipart).await?;

    let (Some(email), Some(password), Some(name)) =
        (form.text("email"), form.secret("password"), form.text("name"))
    else {
        return Err(AppError::ValidationError("Please enter name, email and password".into()));
    };

    if state.users.find_by_email(email).await?.is_some() {
        return Err(AppError::ValidationError("User already exists".into()));
    }

    let now = Utc::now();
    let mut user = User::with_password(email, name, password, role_for(&state, email), now)?;

    if let Some(file) = form.file("profilePicture") {
        user.profile_picture = state
            .media
            .save(MediaKind::Profile, &file.file_name, &file.content_type, &file.bytes)
            .await?;
    }

    if let Err(e) = state.users.create_user(&user).await {
        state.media.delete_url(&user.profile_picture).await;
        return Err(e.into());
    }

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
    let token = issue_token(&state.auth, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            success: true,
            message: "Registered Successfully!",
            token,
            user: SessionUser::from(&user),
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let email = req.email.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let password = req.password.as_deref().filter(|v| !v.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return Err(AppError::ValidationError("Please enter both email and password".into()));
    };

    let user = state
        .users
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".into()))?;

    if user.is_google_only() {
        return Err(AppError::ValidationError("Please login with Google".into()));
    }

    if !user.check_password(password) {
        return Err(AppError::AuthenticationError("Invalid credentials".into()));
    }

    let token = issue_token(&state.auth, &user)?;

    Ok(Json(SessionResponse {
        success: true,
        message: "Logged in successfully!",
        token,
        user: SessionUser::from(&user),
    }))
}

/// POST /api/auth/g-login
pub async fn google_login(
    State(state): State<AppState>,
    Json(req): Json<GoogleLoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let id_token = req
        .id_token
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::ValidationError("idToken is required".into()))?;

    let identity = state.google.verify_id_token(id_token).await?;
    if !identity.email_verified {
        return Err(AppError::ValidationError("Google email not verified".into()));
    }

    let now = Utc::now();
    let user = match state.users.find_by_email(&identity.email).await? {
        Some(mut user) => {
            if user.google_id.is_none() {
                user.link_google(&identity, now);
                state.users.update_user(&user).await?;
                tracing::info!(user_id = %user.id, "Linked Google account");
            }
            user
        }
        None => {
            let user = User::from_google(&identity, role_for(&state, &identity.email), now);
            state.users.create_user(&user).await?;
            tracing::info!(user_id = %user.id, "User registered through Google");
            user
        }
    };

    let token = issue_token(&state.auth, &user)?;

    Ok(Json(SessionResponse {
        success: true,
        message: "Logged in successfully!",
        token,
        user: SessionUser::from(&user),
    }))
}

/// GET /api/auth/me
pub async fn current_user(Extension(user): Extension<User>) -> Json<UserProfile> {
    Json(user.profile())
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    multipart: Multipart,
) -> Result<Json<ProfileResponse>, AppError> {
    let form = FormData::read(multipart).await?;
    let mut updated = user.clone();

    if let Some(name) = form.text("name") {
        updated.name = name.to_string();
    }

    if let Some(email) = form.text("email") {
        let email = normalize_email(email);
        if email != user.email {
            if let Some(other) = state.users.find_by_email(&email).await? {
                if other.id != user.id {
                    return Err(AppError::ValidationError("Email is already in use".into()));
                }
            }
            updated.email = email;
        }
    }

    if let Some(file) = form.file("profilePicture") {
        updated.profile_picture = state
            .media
            .save(MediaKind::Profile, &file.file_name, &file.content_type, &file.bytes)
            .await?;
    }

    updated.updated_at = Utc::now();
    if let Err(e) = state.users.update_user(&updated).await {
        if updated.profile_picture != user.profile_picture {
            state.media.delete_url(&updated.profile_picture).await;
        }
        return Err(e.into());
    }

    if updated.profile_picture != user.profile_picture {
        state.media.delete_url(&user.profile_picture).await;
    }

    Ok(Json(ProfileResponse {
        success: true,
        message: "Profile updated successfully!",
        user: SessionUser::from(&updated),
    }))
}

/// GET /api/auth/clients
pub async fn list_clients(State(state): State<AppState>) -> Result<Json<ClientsResponse>, AppError> {
    let users = state.users.list_users_by_role(Role::User).await?;

    Ok(Json(ClientsResponse {
        success: true,
        users: users.iter().map(User::profile).collect(),
    }))
}
