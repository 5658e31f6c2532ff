// The search-and-extract interaction against the valuation site.
//
// Everything volatile about the site (URLs, selectors, settle delays)
// lives in this file, behind the ValuationSource trait. The queue only sees
// found / not-found / error.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use lotline_common::types::{RentalReading, ValuationReading};
use rebrowser_client::{BrowserSession, RebrowserClient, RebrowserError};

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(ValuationReading),
    /// The site has no record of the address. A valid terminal answer.
    NotFound,
}

#[async_trait]
pub trait ValuationSource: Send + Sync {
    async fn lookup(&self, address: &str) -> Result<LookupOutcome>;
}

// --- Site selectors (volatile, change whenever the site redeploys) ---

const SEARCH_MODAL_BUTTON: &str = "[data-testid=\"home-page-multi-intent-search-modal-button\"]";
const SEARCH_INPUT: &str = "#multi-intent-search-modal-default-screen";
const SUGGESTION_OPTION: &str = ".mapOptionToListNode__OptionContainer-sc-lnbl9x-1";

const BUTTON_TIMEOUT: Duration = Duration::from_secs(10);
const SUGGESTION_TIMEOUT: Duration = Duration::from_secs(20);
/// The valuation bricks hydrate well after the suggestion click; the page
/// gives no load signal for them.
const SETTLE_DELAY: Duration = Duration::from_secs(10);

const EXTRACT_JS: &str = r#"
(() => {
  const text = (sel) => document.querySelector(sel)?.textContent ?? null;
  const sections = document.querySelectorAll('.PropertyValuationSubBrick__PropertyValuationSubBrickContainer-sc-1uh1dob-0');
  const rental = sections[1] ?? null;
  const rentalText = (sel) => rental?.querySelector(sel)?.textContent ?? null;
  return {
    confidence: text('[data-testid="valuation-sub-brick-confidence"]'),
    estimatedValue: text('[data-testid="valuation-sub-brick-price-text"]'),
    pricePerMeter: text('.kRRzuL'),
    priceRange: text('[data-testid="valuation-sub-brick-estimate-range"]'),
    lastUpdated: text('.ibzsLI'),
    rentalConfidence: rentalText('[data-testid="valuation-sub-brick-confidence"]'),
    rentalValue: rentalText('[data-testid="valuation-sub-brick-price-text"]'),
    rentalPeriod: rentalText('.PropertyValuationSubBrick__PriceSubtitleText-sc-1uh1dob-4'),
    rentalMessage: rentalText('.PropertyValuationSubBrick__EmptyEstimateMessage-sc-1uh1dob-11'),
  };
})()
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedValuation {
    confidence: Option<String>,
    estimated_value: Option<String>,
    price_per_meter: Option<String>,
    price_range: Option<String>,
    last_updated: Option<String>,
    rental_confidence: Option<String>,
    rental_value: Option<String>,
    rental_period: Option<String>,
    rental_message: Option<String>,
}

impl From<ExtractedValuation> for ValuationReading {
    fn from(e: ExtractedValuation) -> Self {
        ValuationReading {
            confidence: e.confidence,
            estimated_value: e.estimated_value,
            price_per_meter: e.price_per_meter,
            price_range: e.price_range,
            last_updated: e.last_updated,
            rental: RentalReading {
                confidence: e.rental_confidence,
                value: e.rental_value,
                period: e.rental_period,
                message: e.rental_message,
            },
        }
    }
}

/// Production source: one remote browser session per lookup, closed on
/// every exit path; an abandoned session keeps costing until the vendor
/// reaps it.
pub struct RebrowserValuationSource {
    client: RebrowserClient,
    site_url: String,
}

impl RebrowserValuationSource {
    pub fn new(client: RebrowserClient, site_url: &str) -> Self {
        Self {
            client,
            site_url: site_url.to_string(),
        }
    }

    async fn drive(&self, session: &BrowserSession, address: &str) -> Result<LookupOutcome> {
        session.goto(&self.site_url).await?;

        session.click(SEARCH_MODAL_BUTTON, BUTTON_TIMEOUT).await?;
        session
            .type_into(SEARCH_INPUT, address, BUTTON_TIMEOUT)
            .await?;

        // No suggestion after typing means the site doesn't know the
        // address. A terminal answer, not an error.
        match session
            .wait_for_element(SUGGESTION_OPTION, SUGGESTION_TIMEOUT)
            .await
        {
            Ok(_) => {}
            Err(RebrowserError::ElementNotFound { .. }) => {
                info!(address, "No property found for address");
                return Ok(LookupOutcome::NotFound);
            }
            Err(e) => return Err(e.into()),
        }

        session.settle(SETTLE_DELAY).await;
        session.click(SUGGESTION_OPTION, BUTTON_TIMEOUT).await?;
        session.settle(SETTLE_DELAY).await;

        let extracted: ExtractedValuation = session
            .evaluate(EXTRACT_JS)
            .await
            .context("Failed to extract valuation from page")?;

        Ok(LookupOutcome::Found(extracted.into()))
    }
}

#[async_trait]
impl ValuationSource for RebrowserValuationSource {
    async fn lookup(&self, address: &str) -> Result<LookupOutcome> {
        info!(address, "Valuation lookup starting");

        let session = self
            .client
            .session()
            .await
            .context("Failed to open browser session")?;

        // Hold the result and close before returning: the session must not
        // outlive the lookup on any path.
        let result = self.drive(&session, address).await;
        session.close().await;

        match &result {
            Ok(LookupOutcome::Found(reading)) => {
                info!(
                    address,
                    estimated_value = reading.estimated_value.as_deref().unwrap_or("-"),
                    "Valuation extracted"
                );
            }
            Ok(LookupOutcome::NotFound) => {}
            Err(e) => warn!(address, error = %e, "Valuation lookup failed"),
        }

        result
    }
}
