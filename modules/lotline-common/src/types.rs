use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Source dataset model ---
//
// One entry in the scraped listings dataset. The feed is deeply optional:
// every nested path that can be absent is an explicit Option so a sparse
// record deserializes instead of failing the whole file.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub property_link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "scraped_at")]
    pub scraped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub address: Option<RawAddress>,
    #[serde(default)]
    pub general_features: Option<RawGeneralFeatures>,
    #[serde(default)]
    pub property_sizes: Option<RawPropertySizes>,
    /// Image URL templates containing a `{size}` placeholder.
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub listing_company: Option<RawCompany>,
    #[serde(default)]
    pub valuation_data: Option<RawValuation>,
    #[serde(default)]
    pub price: Option<RawPrice>,
    #[serde(default)]
    pub price_details: Option<RawPriceDetails>,
}

impl RawListing {
    /// Full display address, if the record carries one.
    pub fn full_address(&self) -> Option<&str> {
        self.address
            .as_ref()
            .and_then(|a| a.display.as_ref())
            .and_then(|d| d.full_address.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAddress {
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub display: Option<RawAddressDisplay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAddressDisplay {
    #[serde(default)]
    pub short_address: Option<String>,
    #[serde(default)]
    pub full_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGeneralFeatures {
    #[serde(default)]
    pub bedrooms: Option<RawFeatureValue>,
    #[serde(default)]
    pub bathrooms: Option<RawFeatureValue>,
    #[serde(default)]
    pub parking_spaces: Option<RawFeatureValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFeatureValue {
    #[serde(default)]
    pub value: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPropertySizes {
    #[serde(default)]
    pub land: Option<RawSize>,
    #[serde(default)]
    pub building: Option<RawSize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSize {
    /// Formatted size, e.g. "1,012". Parsed defensively, never trusted.
    #[serde(default)]
    pub display_value: Option<String>,
    #[serde(default)]
    pub size_unit: Option<RawSizeUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSizeUnit {
    #[serde(default)]
    pub display_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCompany {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub ratings_reviews: Option<RawRatings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRatings {
    #[serde(default)]
    pub avg_rating: Option<f64>,
    #[serde(default)]
    pub total_reviews: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPrice {
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub search_range: Option<String>,
    #[serde(default)]
    pub information: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPriceDetails {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

// --- Valuation enrichment ---

pub const VALUATION_FOUND: &str = "found";
pub const VALUATION_NOT_FOUND: &str = "not_found";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawValuation {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub estimated_value: Option<String>,
    #[serde(default)]
    pub price_per_meter: Option<String>,
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub rental: Option<RawRental>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRental {
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Values read off the valuation page for one address.
/// All fields are display text exactly as the site renders them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuationReading {
    pub confidence: Option<String>,
    pub estimated_value: Option<String>,
    pub price_per_meter: Option<String>,
    pub price_range: Option<String>,
    pub last_updated: Option<String>,
    pub rental: RentalReading,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RentalReading {
    pub confidence: Option<String>,
    pub value: Option<String>,
    pub period: Option<String>,
    pub message: Option<String>,
}

impl RawValuation {
    pub fn found(source: &str, reading: ValuationReading) -> Self {
        Self {
            source: Some(source.to_string()),
            status: Some(VALUATION_FOUND.to_string()),
            confidence: reading.confidence,
            estimated_value: reading.estimated_value,
            price_per_meter: reading.price_per_meter,
            price_range: reading.price_range,
            last_updated: reading.last_updated,
            rental: Some(RawRental {
                confidence: reading.rental.confidence,
                value: reading.rental.value,
                period: reading.rental.period,
                message: reading.rental.message,
            }),
        }
    }

    /// Placeholder written when the site has no record of the address.
    pub fn not_found(source: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            status: Some(VALUATION_NOT_FOUND.to_string()),
            rental: Some(RawRental::default()),
            ..Self::empty()
        }
    }

    fn empty() -> Self {
        Self {
            source: None,
            status: None,
            confidence: None,
            estimated_value: None,
            price_per_meter: None,
            price_range: None,
            last_updated: None,
            rental: None,
        }
    }
}

// --- Import job ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "in_progress" => Some(JobStatus::InProgress),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed item inside a batch. Accumulated and persisted on the job so
/// an operator can see exactly which records were skipped and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    /// External listing id, when the record had one.
    pub listing_id: Option<String>,
    /// Zero-based index into the source dataset.
    pub index: usize,
    pub reason: String,
}
