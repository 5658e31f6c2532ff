// Destination entity rows and the write seam the import path goes through.
//
// Every write is upsert-by-natural-key: listing id for the per-listing
// tables, company id for companies. Re-applying the same row is a no-op in
// effect, which is what lets a re-entrant batch replay safely.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub id: String,
    pub property_type: String,
    pub property_link: Option<String>,
    pub description: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressRow {
    pub listing_id: String,
    pub short_address: Option<String>,
    pub full_address: Option<String>,
    pub suburb: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub listing_id: String,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub parking_spaces: Option<i32>,
    pub land_size: Option<f64>,
    pub land_unit: Option<String>,
    pub building_size: Option<f64>,
    pub building_unit: Option<String>,
}

/// One image in a listing's gallery. `position` is the array index from the
/// source record; the gallery order is the source order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRow {
    pub url: String,
    pub position: i32,
}

/// Listing agency. Keyed by its own id: companies are shared across
/// listings and must not be duplicated or keep stale contact details.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyRow {
    pub id: String,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub avg_rating: Option<f64>,
    pub total_reviews: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValuationRow {
    pub listing_id: String,
    pub source: Option<String>,
    pub status: Option<String>,
    pub confidence: Option<String>,
    pub estimated_value: Option<String>,
    pub price_range: Option<String>,
    pub rental_value: Option<String>,
    pub rental_period: Option<String>,
    pub rental_confidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub listing_id: String,
    pub display_price: Option<String>,
    pub price_from: Option<String>,
    pub price_to: Option<String>,
    pub search_range: Option<String>,
    pub price_information: Option<String>,
}

#[async_trait]
pub trait ListingWriter: Send + Sync {
    async fn upsert_listing(&self, row: &ListingRow) -> Result<()>;

    async fn upsert_address(&self, row: &AddressRow) -> Result<()>;

    async fn upsert_features(&self, row: &FeatureRow) -> Result<()>;

    /// Replace the entire gallery for a listing. The source always supplies
    /// the complete ordered list, so this is delete-then-insert, never an
    /// incremental diff.
    async fn replace_images(&self, listing_id: &str, images: &[ImageRow]) -> Result<()>;

    async fn upsert_company(&self, row: &CompanyRow) -> Result<()>;

    async fn upsert_valuation(&self, row: &ValuationRow) -> Result<()>;

    async fn upsert_price(&self, row: &PriceRow) -> Result<()>;
}
