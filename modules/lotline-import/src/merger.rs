// Maps one raw source record onto the destination entity set.
//
// Everything keyed by the listing's external id is upsert-by-key; the image
// gallery is fully replaced; the company is upserted under its own id. A
// malformed numeric field degrades to NULL instead of failing the record.

use std::sync::Arc;

use tracing::warn;

use lotline_common::parse_decimal;
use lotline_common::types::RawListing;
use lotline_store::{
    AddressRow, CompanyRow, FeatureRow, ImageRow, ListingRow, ListingWriter, PriceRow,
    StoreError, ValuationRow,
};

/// Size substituted into image URL templates before storage.
const IMAGE_SIZE: &str = "800x600";

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The record is missing a mandatory field. Aborts only this item.
    #[error("Invalid record: {0}")]
    Validation(String),

    /// A store write failed. Propagates and aborts the batch.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub struct RecordMerger {
    writer: Arc<dyn ListingWriter>,
}

impl RecordMerger {
    pub fn new(writer: Arc<dyn ListingWriter>) -> Self {
        Self { writer }
    }

    pub async fn merge(&self, raw: &RawListing) -> Result<(), MergeError> {
        let id = raw
            .id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MergeError::Validation("missing listing id".to_string()))?;
        let property_type = raw
            .property_type
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MergeError::Validation("missing property type".to_string()))?;

        self.writer
            .upsert_listing(&ListingRow {
                id: id.to_string(),
                property_type: property_type.to_string(),
                property_link: raw.property_link.clone(),
                description: raw.description.clone(),
                scraped_at: raw.scraped_at,
            })
            .await?;

        if let Some(address) = &raw.address {
            let display = address.display.as_ref();
            self.writer
                .upsert_address(&AddressRow {
                    listing_id: id.to_string(),
                    short_address: display.and_then(|d| d.short_address.clone()),
                    full_address: display.and_then(|d| d.full_address.clone()),
                    suburb: address.suburb.clone(),
                    state: address.state.clone(),
                    postcode: address.postcode.clone(),
                })
                .await?;
        }

        let features = raw.general_features.as_ref();
        let sizes = raw.property_sizes.as_ref();
        if features.is_some() || sizes.is_some() {
            let land = sizes.and_then(|s| s.land.as_ref());
            let building = sizes.and_then(|s| s.building.as_ref());
            self.writer
                .upsert_features(&FeatureRow {
                    listing_id: id.to_string(),
                    bedrooms: features.and_then(|f| f.bedrooms.as_ref()).and_then(|v| v.value),
                    bathrooms: features.and_then(|f| f.bathrooms.as_ref()).and_then(|v| v.value),
                    parking_spaces: features
                        .and_then(|f| f.parking_spaces.as_ref())
                        .and_then(|v| v.value),
                    land_size: land
                        .and_then(|s| s.display_value.as_deref())
                        .and_then(parse_decimal),
                    land_unit: land
                        .and_then(|s| s.size_unit.as_ref())
                        .and_then(|u| u.display_value.clone()),
                    building_size: building
                        .and_then(|s| s.display_value.as_deref())
                        .and_then(parse_decimal),
                    building_unit: building
                        .and_then(|s| s.size_unit.as_ref())
                        .and_then(|u| u.display_value.clone()),
                })
                .await?;
        }

        // Full gallery replacement: the source always carries the complete
        // ordered list, so an absent list clears the gallery.
        let images: Vec<ImageRow> = raw
            .images
            .as_deref()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(position, url)| ImageRow {
                url: url.replace("{size}", IMAGE_SIZE),
                position: position as i32,
            })
            .collect();
        self.writer.replace_images(id, &images).await?;

        if let Some(company) = &raw.listing_company {
            match company.id.as_deref().filter(|s| !s.is_empty()) {
                Some(company_id) => {
                    let ratings = company.ratings_reviews.as_ref();
                    self.writer
                        .upsert_company(&CompanyRow {
                            id: company_id.to_string(),
                            name: company.name.clone(),
                            phone_number: company.phone_number.clone(),
                            address: company.address.clone(),
                            avg_rating: ratings.and_then(|r| r.avg_rating),
                            total_reviews: ratings.and_then(|r| r.total_reviews),
                        })
                        .await?;
                }
                None => warn!(listing_id = id, "Listing company has no id, skipping"),
            }
        }

        if let Some(valuation) = &raw.valuation_data {
            let rental = valuation.rental.as_ref();
            self.writer
                .upsert_valuation(&ValuationRow {
                    listing_id: id.to_string(),
                    source: valuation.source.clone(),
                    status: valuation.status.clone(),
                    confidence: valuation.confidence.clone(),
                    estimated_value: valuation.estimated_value.clone(),
                    price_range: valuation.price_range.clone(),
                    rental_value: rental.and_then(|r| r.value.clone()),
                    rental_period: rental.and_then(|r| r.period.clone()),
                    rental_confidence: rental.and_then(|r| r.confidence.clone()),
                })
                .await?;
        }

        if raw.price.is_some() || raw.price_details.is_some() {
            let price = raw.price.as_ref();
            let details = raw.price_details.as_ref();
            self.writer
                .upsert_price(&PriceRow {
                    listing_id: id.to_string(),
                    display_price: price.and_then(|p| p.display.clone()),
                    price_from: details.and_then(|d| d.from.clone()),
                    price_to: details.and_then(|d| d.to.clone()),
                    search_range: price.and_then(|p| p.search_range.clone()),
                    price_information: price.and_then(|p| p.information.clone()),
                })
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotline_store::MemoryStore;
    use serde_json::json;

    fn merger_with_store() -> (RecordMerger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (RecordMerger::new(store.clone()), store)
    }

    fn listing(value: serde_json::Value) -> RawListing {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn missing_id_is_a_validation_error() {
        let (merger, store) = merger_with_store();
        let raw = listing(json!({"propertyType": "house"}));

        let err = merger.merge(&raw).await.unwrap_err();
        assert!(matches!(err, MergeError::Validation(_)));
        assert_eq!(store.listing_count(), 0);
    }

    #[tokio::test]
    async fn missing_property_type_is_a_validation_error() {
        let (merger, _) = merger_with_store();
        let raw = listing(json!({"id": "p-1"}));

        let err = merger.merge(&raw).await.unwrap_err();
        assert!(matches!(err, MergeError::Validation(_)));
    }

    #[tokio::test]
    async fn image_templates_get_the_size_substituted_in_order() {
        let (merger, store) = merger_with_store();
        let raw = listing(json!({
            "id": "p-1",
            "propertyType": "house",
            "images": [
                "https://cdn.example.com/a-{size}.jpg",
                "https://cdn.example.com/b-{size}.jpg"
            ],
        }));

        merger.merge(&raw).await.unwrap();

        let images = store.images("p-1");
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].url, "https://cdn.example.com/a-800x600.jpg");
        assert_eq!(images[0].position, 0);
        assert_eq!(images[1].position, 1);
    }

    #[tokio::test]
    async fn malformed_numeric_fields_degrade_to_none() {
        let (merger, store) = merger_with_store();
        let raw = listing(json!({
            "id": "p-1",
            "propertyType": "house",
            "propertySizes": {
                "land": {"displayValue": "1,012", "sizeUnit": {"displayValue": "m²"}},
                "building": {"displayValue": "contact agent"}
            },
        }));

        merger.merge(&raw).await.unwrap();

        let features = store.features("p-1").unwrap();
        assert_eq!(features.land_size, Some(1012.0));
        assert_eq!(features.land_unit.as_deref(), Some("m²"));
        assert_eq!(features.building_size, None);
    }

    #[tokio::test]
    async fn company_without_id_is_skipped_not_fatal() {
        let (merger, store) = merger_with_store();
        let raw = listing(json!({
            "id": "p-1",
            "propertyType": "house",
            "listingCompany": {"name": "Acme Realty"},
        }));

        merger.merge(&raw).await.unwrap();
        assert_eq!(store.company_count(), 0);
        assert!(store.listing("p-1").is_some());
    }

    #[tokio::test]
    async fn company_is_upserted_under_its_own_id() {
        let (merger, store) = merger_with_store();
        for listing_id in ["p-1", "p-2"] {
            let raw = listing(json!({
                "id": listing_id,
                "propertyType": "house",
                "listingCompany": {
                    "id": "c-9",
                    "name": "Acme Realty",
                    "ratingsReviews": {"avgRating": 4.5, "totalReviews": 120}
                },
            }));
            merger.merge(&raw).await.unwrap();
        }

        assert_eq!(store.company_count(), 1);
        let company = store.company("c-9").unwrap();
        assert_eq!(company.avg_rating, Some(4.5));
        assert_eq!(company.total_reviews, Some(120));
    }

    #[tokio::test]
    async fn merging_twice_leaves_identical_state() {
        let (merger, store) = merger_with_store();
        let raw = listing(json!({
            "id": "p-1",
            "propertyType": "house",
            "description": "Sunny three-bedder",
            "address": {
                "suburb": "Burdell",
                "display": {"fullAddress": "16 Kayleen Court, Burdell"}
            },
            "images": ["https://cdn.example.com/a-{size}.jpg"],
            "price": {"display": "$450,000"},
        }));

        merger.merge(&raw).await.unwrap();
        let first_listing = store.listing("p-1").unwrap();
        let first_images = store.images("p-1");
        let first_price = store.price("p-1").unwrap();

        merger.merge(&raw).await.unwrap();
        assert_eq!(store.listing("p-1").unwrap(), first_listing);
        assert_eq!(store.images("p-1"), first_images);
        assert_eq!(store.price("p-1").unwrap(), first_price);
        assert_eq!(store.listing_count(), 1);
    }

    #[tokio::test]
    async fn reimport_with_shorter_gallery_keeps_only_the_new_images() {
        let (merger, store) = merger_with_store();
        let long = listing(json!({
            "id": "p-1",
            "propertyType": "house",
            "images": ["a-{size}.jpg", "b-{size}.jpg", "c-{size}.jpg"],
        }));
        let short = listing(json!({
            "id": "p-1",
            "propertyType": "house",
            "images": ["d-{size}.jpg"],
        }));

        merger.merge(&long).await.unwrap();
        merger.merge(&short).await.unwrap();

        let images = store.images("p-1");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "d-800x600.jpg");
    }
}
