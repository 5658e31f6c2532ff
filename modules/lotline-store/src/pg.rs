// Postgres implementation of the listing and progress stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use lotline_common::types::{ItemFailure, JobStatus};

use crate::error::{Result, StoreError};
use crate::listings::{
    AddressRow, CompanyRow, FeatureRow, ImageRow, ListingRow, ListingWriter, PriceRow,
    ValuationRow,
};
use crate::progress::{ImportJob, JobError, ProgressStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// A row from the import_jobs table.
#[derive(Debug, sqlx::FromRow)]
struct JobRecord {
    id: Uuid,
    batch_size: i64,
    current_offset: i64,
    total_items: i64,
    status: String,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    error: Option<serde_json::Value>,
}

impl JobRecord {
    fn into_job(self) -> Result<ImportJob> {
        let status = JobStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Database(sqlx::Error::Decode(
                format!("unknown job status: {}", self.status).into(),
            )))?;
        let error = self
            .error
            .map(serde_json::from_value::<JobError>)
            .transpose()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(ImportJob {
            id: self.id,
            batch_size: self.batch_size,
            current_offset: self.current_offset,
            total_items: self.total_items,
            status,
            started_at: self.started_at,
            updated_at: self.updated_at,
            error,
        })
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        Ok(())
    }
}

#[async_trait]
impl ListingWriter for PgStore {
    async fn upsert_listing(&self, row: &ListingRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listings (id, property_type, property_link, description, scraped_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                property_type = EXCLUDED.property_type,
                property_link = EXCLUDED.property_link,
                description = EXCLUDED.description,
                scraped_at = EXCLUDED.scraped_at,
                updated_at = now()
            "#,
        )
        .bind(&row.id)
        .bind(&row.property_type)
        .bind(&row.property_link)
        .bind(&row.description)
        .bind(row.scraped_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_address(&self, row: &AddressRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listing_addresses
                (listing_id, short_address, full_address, suburb, state, postcode)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (listing_id) DO UPDATE SET
                short_address = EXCLUDED.short_address,
                full_address = EXCLUDED.full_address,
                suburb = EXCLUDED.suburb,
                state = EXCLUDED.state,
                postcode = EXCLUDED.postcode
            "#,
        )
        .bind(&row.listing_id)
        .bind(&row.short_address)
        .bind(&row.full_address)
        .bind(&row.suburb)
        .bind(&row.state)
        .bind(&row.postcode)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_features(&self, row: &FeatureRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listing_features
                (listing_id, bedrooms, bathrooms, parking_spaces,
                 land_size, land_unit, building_size, building_unit)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (listing_id) DO UPDATE SET
                bedrooms = EXCLUDED.bedrooms,
                bathrooms = EXCLUDED.bathrooms,
                parking_spaces = EXCLUDED.parking_spaces,
                land_size = EXCLUDED.land_size,
                land_unit = EXCLUDED.land_unit,
                building_size = EXCLUDED.building_size,
                building_unit = EXCLUDED.building_unit
            "#,
        )
        .bind(&row.listing_id)
        .bind(row.bedrooms)
        .bind(row.bathrooms)
        .bind(row.parking_spaces)
        .bind(row.land_size)
        .bind(&row.land_unit)
        .bind(row.building_size)
        .bind(&row.building_unit)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn replace_images(&self, listing_id: &str, images: &[ImageRow]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM listing_images WHERE listing_id = $1")
            .bind(listing_id)
            .execute(&mut *tx)
            .await?;

        for image in images {
            sqlx::query(
                r#"
                INSERT INTO listing_images (listing_id, url, position)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(listing_id)
            .bind(&image.url)
            .bind(image.position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn upsert_company(&self, row: &CompanyRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listing_companies
                (id, name, phone_number, address, avg_rating, total_reviews)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                phone_number = EXCLUDED.phone_number,
                address = EXCLUDED.address,
                avg_rating = EXCLUDED.avg_rating,
                total_reviews = EXCLUDED.total_reviews
            "#,
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.phone_number)
        .bind(&row.address)
        .bind(row.avg_rating)
        .bind(row.total_reviews)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_valuation(&self, row: &ValuationRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listing_valuations
                (listing_id, source, status, confidence, estimated_value, price_range,
                 rental_value, rental_period, rental_confidence, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            ON CONFLICT (listing_id) DO UPDATE SET
                source = EXCLUDED.source,
                status = EXCLUDED.status,
                confidence = EXCLUDED.confidence,
                estimated_value = EXCLUDED.estimated_value,
                price_range = EXCLUDED.price_range,
                rental_value = EXCLUDED.rental_value,
                rental_period = EXCLUDED.rental_period,
                rental_confidence = EXCLUDED.rental_confidence,
                last_updated = now()
            "#,
        )
        .bind(&row.listing_id)
        .bind(&row.source)
        .bind(&row.status)
        .bind(&row.confidence)
        .bind(&row.estimated_value)
        .bind(&row.price_range)
        .bind(&row.rental_value)
        .bind(&row.rental_period)
        .bind(&row.rental_confidence)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_price(&self, row: &PriceRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listing_prices
                (listing_id, display_price, price_from, price_to,
                 search_range, price_information)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (listing_id) DO UPDATE SET
                display_price = EXCLUDED.display_price,
                price_from = EXCLUDED.price_from,
                price_to = EXCLUDED.price_to,
                search_range = EXCLUDED.search_range,
                price_information = EXCLUDED.price_information,
                updated_at = now()
            "#,
        )
        .bind(&row.listing_id)
        .bind(&row.display_price)
        .bind(&row.price_from)
        .bind(&row.price_to)
        .bind(&row.search_range)
        .bind(&row.price_information)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn create(&self, total_items: i64, batch_size: i64) -> Result<ImportJob> {
        let record = sqlx::query_as::<_, JobRecord>(
            r#"
            INSERT INTO import_jobs (id, batch_size, current_offset, total_items, status)
            VALUES ($1, $2, 0, $3, 'in_progress')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(batch_size)
        .bind(total_items)
        .fetch_one(&self.pool)
        .await?;

        record.into_job()
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<ImportJob>> {
        let record = sqlx::query_as::<_, JobRecord>(
            "SELECT * FROM import_jobs WHERE id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(JobRecord::into_job).transpose()
    }

    async fn update(
        &self,
        job_id: Uuid,
        offset: i64,
        status: JobStatus,
        failures: &[ItemFailure],
    ) -> Result<()> {
        let error = if failures.is_empty() {
            None
        } else {
            Some(sqlx::types::Json(JobError::Items(failures.to_vec())))
        };

        // The offset guard keeps the cursor monotonic: a duplicate advance
        // racing at a stale offset writes nothing.
        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET current_offset = $2, status = $3, error = $4, updated_at = now()
            WHERE id = $1 AND current_offset <= $2
            "#,
        )
        .bind(job_id)
        .bind(offset)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either the job is unknown or a newer offset already landed.
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM import_jobs WHERE id = $1)",
            )
            .bind(job_id)
            .fetch_one(&self.pool)
            .await?;
            if !exists {
                return Err(StoreError::JobNotFound(job_id));
            }
        }

        Ok(())
    }

    async fn fail(&self, job_id: Uuid, reason: &str) -> Result<()> {
        let error = sqlx::types::Json(JobError::Job(reason.to_string()));

        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET status = 'failed', error = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(job_id));
        }

        Ok(())
    }
}
