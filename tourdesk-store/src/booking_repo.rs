use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use tourdesk_core::{BookingFilter, BookingRepository, CoreError, CoreResult};
use tourdesk_order::{Booking, BookingStatus, SelectedServices};

use crate::database::{expect_affected, storage_error};

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str =
    "id, package_id, user_id, food, accommodation, total_price, status, booking_date, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    package_id: Uuid,
    user_id: Uuid,
    food: bool,
    accommodation: bool,
    total_price: i64,
    status: Option<String>,
    booking_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .as_deref()
            .map(str::parse::<BookingStatus>)
            .transpose()?;

        Ok(Booking {
            id: row.id,
            package_id: row.package_id,
            user_id: row.user_id,
            selected_services: SelectedServices {
                food: row.food,
                accommodation: row.accommodation,
            },
            total_price: row.total_price,
            status,
            booking_date: row.booking_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, package_id, user_id, food, accommodation, total_price, status, booking_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(booking.id)
        .bind(booking.package_id)
        .bind(booking.user_id)
        .bind(booking.selected_services.food)
        .bind(booking.selected_services.accommodation)
        .bind(booking.total_price)
        .bind(booking.status.map(|s| s.as_str()))
        .bind(booking.booking_date)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(Booking::try_from).transpose()
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> CoreResult<Vec<Booking>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE TRUE"));
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(package_id) = filter.package_id {
            qb.push(" AND package_id = ").push_bind(package_id);
        }
        qb.push(" ORDER BY created_at DESC, id ASC");

        let rows: Vec<BookingRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn update_booking(&self, booking: &Booking) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET food = $1, accommodation = $2, total_price = $3, status = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(booking.selected_services.food)
        .bind(booking.selected_services.accommodation)
        .bind(booking.total_price)
        .bind(booking.status.map(|s| s.as_str()))
        .bind(booking.updated_at)
        .bind(booking.id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        expect_affected(result.rows_affected(), || format!("Booking {} not found", booking.id))
    }
}
