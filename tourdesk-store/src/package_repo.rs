use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use tourdesk_catalog::{Package, PackageQuery, Page, SchedulePhase, Services};
use tourdesk_core::{CoreResult, PackageRepository};

use crate::database::{expect_affected, storage_error};

pub struct StorePackageRepository {
    pool: PgPool,
}

impl StorePackageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PACKAGE_COLUMNS: &str = "id, from_location, to_location, start_date, end_date, base_price, \
     include_food, include_accommodation, food_price, accommodation_price, description, images, \
     created_by, created_at, updated_at";

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct PackageRow {
    id: Uuid,
    from_location: String,
    to_location: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    base_price: i64,
    include_food: bool,
    include_accommodation: bool,
    food_price: i64,
    accommodation_price: i64,
    description: String,
    images: Vec<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PackageRow> for Package {
    fn from(row: PackageRow) -> Self {
        Package {
            id: row.id,
            from_location: row.from_location,
            to_location: row.to_location,
            start_date: row.start_date,
            end_date: row.end_date,
            base_price: row.base_price,
            included_services: Services {
                food: row.include_food,
                accommodation: row.include_accommodation,
            },
            food_price: row.food_price,
            accommodation_price: row.accommodation_price,
            description: row.description,
            images: row.images,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Escapes LIKE wildcards so user input only ever matches literally.
fn like_pattern(raw: &str) -> String {
    let escaped = raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Appends the WHERE predicates shared by the page and the count query.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &PackageQuery, now: DateTime<Utc>) {
    qb.push(" WHERE TRUE");
    if let Some(from) = &query.from_location {
        qb.push(" AND from_location ILIKE ").push_bind(like_pattern(from));
    }
    if let Some(to) = &query.to_location {
        qb.push(" AND to_location ILIKE ").push_bind(like_pattern(to));
    }
    if let Some(t) = query.starts_after {
        qb.push(" AND start_date >= ").push_bind(t);
    }
    if let Some(t) = query.ends_before {
        qb.push(" AND end_date <= ").push_bind(t);
    }
    if let Some(p) = query.min_price {
        qb.push(" AND base_price >= ").push_bind(p);
    }
    if let Some(p) = query.max_price {
        qb.push(" AND base_price <= ").push_bind(p);
    }
    match query.status {
        Some(SchedulePhase::Completed) => {
            qb.push(" AND end_date < ").push_bind(now);
        }
        Some(SchedulePhase::Active) => {
            qb.push(" AND start_date <= ").push_bind(now);
            qb.push(" AND end_date >= ").push_bind(now);
        }
        Some(SchedulePhase::Upcoming) => {
            qb.push(" AND start_date > ").push_bind(now);
        }
        None => {}
    }
}

#[async_trait]
impl PackageRepository for StorePackageRepository {
    async fn create_package(&self, package: &Package) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO packages (id, from_location, to_location, start_date, end_date, base_price,
                include_food, include_accommodation, food_price, accommodation_price, description,
                images, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(package.id)
        .bind(&package.from_location)
        .bind(&package.to_location)
        .bind(package.start_date)
        .bind(package.end_date)
        .bind(package.base_price)
        .bind(package.included_services.food)
        .bind(package.included_services.accommodation)
        .bind(package.food_price)
        .bind(package.accommodation_price)
        .bind(&package.description)
        .bind(&package.images)
        .bind(package.created_by)
        .bind(package.created_at)
        .bind(package.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn get_package(&self, id: Uuid) -> CoreResult<Option<Package>> {
        let row = sqlx::query_as::<_, PackageRow>(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(Package::from))
    }

    async fn list_packages(&self, query: &PackageQuery, now: DateTime<Utc>) -> CoreResult<Page<Package>> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM packages");
        push_filters(&mut count_qb, query, now);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PACKAGE_COLUMNS} FROM packages"));
        push_filters(&mut qb, query, now);
        // Column and direction come from closed enums, never from user input
        qb.push(format!(
            " ORDER BY {} {}, id ASC",
            query.sort_by.column(),
            query.sort_order.keyword()
        ));
        qb.push(" LIMIT ").push_bind(i64::from(query.limit));
        qb.push(" OFFSET ").push_bind(query.offset() as i64);

        let rows: Vec<PackageRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(Page {
            items: rows.into_iter().map(Package::from).collect(),
            total: total.max(0) as u64,
        })
    }

    async fn all_packages(&self) -> CoreResult<Vec<Package>> {
        let rows = sqlx::query_as::<_, PackageRow>(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(Package::from).collect())
    }

    async fn update_package(&self, package: &Package) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE packages
            SET from_location = $1, to_location = $2, start_date = $3, end_date = $4, base_price = $5,
                include_food = $6, include_accommodation = $7, food_price = $8, accommodation_price = $9,
                description = $10, images = $11, updated_at = $12
            WHERE id = $13
            "#,
        )
        .bind(&package.from_location)
        .bind(&package.to_location)
        .bind(package.start_date)
        .bind(package.end_date)
        .bind(package.base_price)
        .bind(package.included_services.food)
        .bind(package.included_services.accommodation)
        .bind(package.food_price)
        .bind(package.accommodation_price)
        .bind(&package.description)
        .bind(&package.images)
        .bind(package.updated_at)
        .bind(package.id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        expect_affected(result.rows_affected(), || "Package not found".into())
    }

    async fn delete_package(&self, id: Uuid) -> CoreResult<Option<Package>> {
        // bookings go with it through ON DELETE CASCADE
        let row = sqlx::query_as::<_, PackageRow>(&format!(
            "DELETE FROM packages WHERE id = $1 RETURNING {PACKAGE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(Package::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rio"), "%rio%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn filters_render_expected_sql() {
        let query = PackageQuery {
            from_location: Some("Paris".into()),
            min_price: Some(100),
            status: Some(SchedulePhase::Active),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM packages");
        push_filters(&mut qb, &query, Utc::now());
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM packages WHERE TRUE AND from_location ILIKE $1 \
             AND base_price >= $2 AND start_date <= $3 AND end_date >= $4"
        );
    }
}
