use anyhow::{Context, Result};
use tracing::warn;

use fivethirty_core::openfoodfacts::{BarcodeLookup, ProductResponse, product_to_lookup};

const PRODUCT_URL: &str = "https://world.openfoodfacts.org/api/v2/product";

pub struct OpenFoodFactsClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(PRODUCT_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "FiveThirty/{} (meal-planning-app)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, barcode: &str) -> Result<BarcodeLookup> {
        let url = format!("{}/{barcode}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach OpenFoodFacts API")?;

        // 404 is how the API reports an unknown product
        if !resp.status().is_success() {
            return Ok(BarcodeLookup::not_found(barcode));
        }

        let data: ProductResponse = resp
            .json()
            .await
            .context("Failed to parse OpenFoodFacts product response")?;

        Ok(product_to_lookup(barcode, data))
    }

    /// Look up a product. Transport and decode failures are reported in the
    /// result (`found: false` plus an error message), never as `Err`.
    pub async fn lookup_barcode(&self, barcode: &str) -> BarcodeLookup {
        match self.fetch(barcode).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(barcode, error = %format!("{e:#}"), "barcode lookup failed");
                BarcodeLookup::failed(barcode)
            }
        }
    }
}
