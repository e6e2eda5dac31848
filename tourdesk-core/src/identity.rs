use std::collections::HashMap;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tourdesk_shared::Masked;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::ValidationError(format!("unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2 PHC string. `None` for accounts created through Google.
    pub password_hash: Option<Masked<String>>,
    pub google_id: Option<String>,
    pub name: String,
    pub profile_picture: String,
    pub address: Option<Address>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn with_password(
        email: &str,
        name: &str,
        password: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let hash = hash_password(password)?;
        Ok(Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash: Some(Masked::new(hash)),
            google_id: None,
            name: name.trim().to_string(),
            profile_picture: String::new(),
            address: None,
            role,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn from_google(identity: &GoogleIdentity, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(&identity.email),
            password_hash: None,
            google_id: Some(identity.sub.clone()),
            name: identity.name.clone().unwrap_or_else(|| identity.email.clone()),
            profile_picture: identity.picture.clone().unwrap_or_default(),
            address: None,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Accounts that only ever signed in with Google have nothing to check a
    /// password against.
    pub fn is_google_only(&self) -> bool {
        self.google_id.is_some() && self.password_hash.is_none()
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        self.password_hash
            .as_ref()
            .is_some_and(|hash| verify_password(candidate, hash.expose()))
    }

    /// Attaches a Google account to an existing user. Only fills the
    /// picture if Google supplied one.
    pub fn link_google(&mut self, identity: &GoogleIdentity, now: DateTime<Utc>) {
        self.google_id = Some(identity.sub.clone());
        if let Some(picture) = identity.picture.as_ref().filter(|p| !p.is_empty()) {
            self.profile_picture = picture.clone();
        }
        self.updated_at = now;
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            profile_picture: self.profile_picture.clone(),
            address: self.address.clone(),
            google_linked: self.google_id.is_some(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// What the API reveals about a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub profile_picture: String,
    pub address: Option<Address>,
    pub google_linked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn hash_password(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::InternalError(format!("password hashing failed: {}", e)))
}

pub fn verify_password(candidate: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

/// Claims extracted from a verified Google ID token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub sub: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait GoogleVerifier: Send + Sync {
    /// Verify an ID token issued for our client id and return its claims
    async fn verify_id_token(&self, id_token: &str) -> CoreResult<GoogleIdentity>;
}

/// Verifier backed by a fixed token table, for local development and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticGoogleVerifier {
    tokens: HashMap<String, GoogleIdentity>,
}

impl StaticGoogleVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, identity: GoogleIdentity) -> Self {
        self.tokens.insert(token.to_string(), identity);
        self
    }
}

#[async_trait]
impl GoogleVerifier for StaticGoogleVerifier {
    async fn verify_id_token(&self, id_token: &str) -> CoreResult<GoogleIdentity> {
        tracing::info!("Verifying Google ID token against static table");
        self.tokens
            .get(id_token)
            .cloned()
            .ok_or_else(|| CoreError::IdentityError("unknown Google ID token".into()))
    }
}
