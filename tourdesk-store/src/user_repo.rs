use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use tourdesk_core::{Address, CoreError, CoreResult, Role, User, UserRepository};
use tourdesk_shared::Masked;

use crate::database::{expect_affected, storage_error};

pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, google_id, name, profile_picture, address, role, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: Option<String>,
    google_id: Option<String>,
    name: String,
    profile_picture: String,
    address: Option<Json<Address>>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash.map(Masked::new),
            google_id: row.google_id,
            name: row.name,
            profile_picture: row.profile_picture,
            address: row.address.map(|a| a.0),
            role: row.role.parse::<Role>()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, google_id, name, profile_picture, address, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(user.password_hash.as_ref().map(|h| h.expose().as_str()))
        .bind(user.google_id.as_deref())
        .bind(&user.name)
        .bind(&user.profile_picture)
        .bind(user.address.clone().map(Json))
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = LOWER($1)"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(User::try_from).transpose()
    }

    async fn update_user(&self, user: &User) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $1, password_hash = $2, google_id = $3, name = $4, profile_picture = $5,
                address = $6, role = $7, updated_at = $8
            WHERE id = $9
            "#,
        )
        .bind(&user.email)
        .bind(user.password_hash.as_ref().map(|h| h.expose().as_str()))
        .bind(user.google_id.as_deref())
        .bind(&user.name)
        .bind(&user.profile_picture)
        .bind(user.address.clone().map(Json))
        .bind(user.role.as_str())
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        expect_affected(result.rows_affected(), || "User not found".into())
    }

    async fn list_users_by_role(&self, role: Role) -> CoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at DESC"
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(User::try_from).collect()
    }
}
