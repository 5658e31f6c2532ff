// Source dataset file access. The dataset is one JSON array of listings;
// the import path reads slices of it and the scraper writes valuation
// results back into it. Writes are serialized through one lock so two
// lanes finishing together cannot interleave a rewrite.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

use crate::types::{RawListing, RawValuation};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

pub struct SourceDataset {
    path: PathBuf,
    listings: Mutex<Vec<RawListing>>,
}

impl SourceDataset {
    /// Load the dataset from disk. Tolerates a UTF-8 BOM, which some
    /// export tools prepend.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref().to_path_buf();
        let content = tokio::fs::read_to_string(&path).await?;
        let listings: Vec<RawListing> =
            serde_json::from_str(content.trim_start_matches('\u{feff}'))?;

        Ok(Self {
            path,
            listings: Mutex::new(listings),
        })
    }

    /// Wrap an already-materialized list (tests, fixtures). No backing file
    /// writes happen until `set_valuation` is called with a real path.
    pub fn from_listings(path: impl AsRef<Path>, listings: Vec<RawListing>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            listings: Mutex::new(listings),
        }
    }

    pub async fn len(&self) -> usize {
        self.listings.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.listings.lock().await.is_empty()
    }

    /// Clone out the slice `[start, end)`, clamped to the dataset bounds.
    pub async fn slice(&self, start: usize, end: usize) -> Vec<RawListing> {
        let listings = self.listings.lock().await;
        let end = end.min(listings.len());
        if start >= end {
            return Vec::new();
        }
        listings[start..end].to_vec()
    }

    /// Full display addresses in dataset order. Records without one yield
    /// None so the caller can account for them as skipped.
    pub async fn full_addresses(&self) -> Vec<Option<String>> {
        self.listings
            .lock()
            .await
            .iter()
            .map(|l| l.full_address().map(String::from))
            .collect()
    }

    /// Attach a valuation to the listing with this full display address and
    /// rewrite the backing file. Returns false when no listing matches.
    pub async fn set_valuation(
        &self,
        full_address: &str,
        valuation: RawValuation,
    ) -> Result<bool, DatasetError> {
        let mut listings = self.listings.lock().await;

        let Some(listing) = listings
            .iter_mut()
            .find(|l| l.full_address() == Some(full_address))
        else {
            warn!(address = full_address, "No listing matches scraped address");
            return Ok(false);
        };
        listing.valuation_data = Some(valuation);

        let serialized = serde_json::to_string_pretty(&*listings)?;
        tokio::fs::write(&self.path, serialized).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValuationReading;

    fn listing(id: &str, full_address: &str) -> RawListing {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "propertyType": "house",
            "address": {"display": {"fullAddress": full_address}},
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn load_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        std::fs::write(&path, "\u{feff}[{\"id\": \"p-1\"}]").unwrap();

        let dataset = SourceDataset::load(&path).await.unwrap();
        assert_eq!(dataset.len().await, 1);
    }

    #[tokio::test]
    async fn slice_clamps_to_bounds() {
        let dataset = SourceDataset::from_listings(
            "unused.json",
            vec![listing("a", "1 First St"), listing("b", "2 Second St")],
        );
        assert_eq!(dataset.slice(0, 10).await.len(), 2);
        assert_eq!(dataset.slice(1, 2).await.len(), 1);
        assert!(dataset.slice(5, 10).await.is_empty());
    }

    #[tokio::test]
    async fn set_valuation_rewrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        let listings = vec![listing("a", "1 First St"), listing("b", "2 Second St")];
        std::fs::write(&path, serde_json::to_string(&listings).unwrap()).unwrap();

        let dataset = SourceDataset::load(&path).await.unwrap();
        let updated = dataset
            .set_valuation(
                "2 Second St",
                RawValuation::found(
                    "valuer.example",
                    ValuationReading {
                        estimated_value: Some("$450,000".into()),
                        ..Default::default()
                    },
                ),
            )
            .await
            .unwrap();
        assert!(updated);

        let reloaded = SourceDataset::load(&path).await.unwrap();
        let second = &reloaded.slice(1, 2).await[0];
        let valuation = second.valuation_data.as_ref().unwrap();
        assert_eq!(valuation.status.as_deref(), Some("found"));
        assert_eq!(valuation.estimated_value.as_deref(), Some("$450,000"));
    }

    #[tokio::test]
    async fn unknown_address_is_reported_not_written() {
        let dataset =
            SourceDataset::from_listings("unused.json", vec![listing("a", "1 First St")]);
        let updated = dataset
            .set_valuation("99 Nowhere Rd", RawValuation::not_found("valuer.example"))
            .await
            .unwrap();
        assert!(!updated);
    }
}
