// In-memory implementation of both store seams. Mirrors the Postgres
// semantics (upsert-by-key, full gallery replacement, monotonic offset
// guard) so coordinator and API tests run without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use lotline_common::types::{ItemFailure, JobStatus};

use crate::error::{Result, StoreError};
use crate::listings::{
    AddressRow, CompanyRow, FeatureRow, ImageRow, ListingRow, ListingWriter, PriceRow,
    ValuationRow,
};
use crate::progress::{ImportJob, JobError, ProgressStore};

#[derive(Default)]
struct Tables {
    listings: HashMap<String, ListingRow>,
    addresses: HashMap<String, AddressRow>,
    features: HashMap<String, FeatureRow>,
    images: HashMap<String, Vec<ImageRow>>,
    companies: HashMap<String, CompanyRow>,
    valuations: HashMap<String, ValuationRow>,
    prices: HashMap<String, PriceRow>,
    jobs: HashMap<Uuid, ImportJob>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Inspection helpers for tests ---

    pub fn listing(&self, id: &str) -> Option<ListingRow> {
        self.tables.lock().unwrap().listings.get(id).cloned()
    }

    pub fn listing_count(&self) -> usize {
        self.tables.lock().unwrap().listings.len()
    }

    pub fn address(&self, listing_id: &str) -> Option<AddressRow> {
        self.tables.lock().unwrap().addresses.get(listing_id).cloned()
    }

    pub fn features(&self, listing_id: &str) -> Option<FeatureRow> {
        self.tables.lock().unwrap().features.get(listing_id).cloned()
    }

    pub fn images(&self, listing_id: &str) -> Vec<ImageRow> {
        self.tables
            .lock()
            .unwrap()
            .images
            .get(listing_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn company(&self, id: &str) -> Option<CompanyRow> {
        self.tables.lock().unwrap().companies.get(id).cloned()
    }

    pub fn company_count(&self) -> usize {
        self.tables.lock().unwrap().companies.len()
    }

    pub fn valuation(&self, listing_id: &str) -> Option<ValuationRow> {
        self.tables.lock().unwrap().valuations.get(listing_id).cloned()
    }

    pub fn price(&self, listing_id: &str) -> Option<PriceRow> {
        self.tables.lock().unwrap().prices.get(listing_id).cloned()
    }

    pub fn job(&self, id: Uuid) -> Option<ImportJob> {
        self.tables.lock().unwrap().jobs.get(&id).cloned()
    }
}

#[async_trait]
impl ListingWriter for MemoryStore {
    async fn upsert_listing(&self, row: &ListingRow) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .listings
            .insert(row.id.clone(), row.clone());
        Ok(())
    }

    async fn upsert_address(&self, row: &AddressRow) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .addresses
            .insert(row.listing_id.clone(), row.clone());
        Ok(())
    }

    async fn upsert_features(&self, row: &FeatureRow) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .features
            .insert(row.listing_id.clone(), row.clone());
        Ok(())
    }

    async fn replace_images(&self, listing_id: &str, images: &[ImageRow]) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .images
            .insert(listing_id.to_string(), images.to_vec());
        Ok(())
    }

    async fn upsert_company(&self, row: &CompanyRow) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .companies
            .insert(row.id.clone(), row.clone());
        Ok(())
    }

    async fn upsert_valuation(&self, row: &ValuationRow) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .valuations
            .insert(row.listing_id.clone(), row.clone());
        Ok(())
    }

    async fn upsert_price(&self, row: &PriceRow) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .prices
            .insert(row.listing_id.clone(), row.clone());
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn create(&self, total_items: i64, batch_size: i64) -> Result<ImportJob> {
        let now = Utc::now();
        let job = ImportJob {
            id: Uuid::new_v4(),
            batch_size,
            current_offset: 0,
            total_items,
            status: JobStatus::InProgress,
            started_at: now,
            updated_at: now,
            error: None,
        };
        self.tables.lock().unwrap().jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<ImportJob>> {
        Ok(self.tables.lock().unwrap().jobs.get(&job_id).cloned())
    }

    async fn update(
        &self,
        job_id: Uuid,
        offset: i64,
        status: JobStatus,
        failures: &[ItemFailure],
    ) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let job = tables
            .jobs
            .get_mut(&job_id)
            .ok_or(StoreError::JobNotFound(job_id))?;

        // Same guard as the SQL: stale offsets never move the cursor back.
        if job.current_offset > offset {
            return Ok(());
        }

        job.current_offset = offset;
        job.status = status;
        job.error = if failures.is_empty() {
            None
        } else {
            Some(JobError::Items(failures.to_vec()))
        };
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, reason: &str) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let job = tables
            .jobs
            .get_mut(&job_id)
            .ok_or(StoreError::JobNotFound(job_id))?;

        job.status = JobStatus::Failed;
        job.error = Some(JobError::Job(reason.to_string()));
        job.updated_at = Utc::now();
        Ok(())
    }
}
