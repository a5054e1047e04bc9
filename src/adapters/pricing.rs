use crate::domain::model::{Currency, PriceQuote};
use crate::domain::ports::PriceSource;
use crate::utils::error::{DealError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

/// Wire shape of the pricing collaborator's per-product response.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    product_id: Option<String>,
    sale_price: f64,
    currency: String,
    #[serde(default)]
    pre_tax: bool,
}

/// Marketplace pricing over a JSON HTTP endpoint: one GET per product id.
pub struct HttpPriceSource {
    client: Client,
    endpoint: String,
}

impl HttpPriceSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    fn quote_url(&self, product_id: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), product_id)
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_quote(&self, product_id: &str) -> Result<PriceQuote> {
        let url = self.quote_url(product_id);
        tracing::debug!("Fetching quote: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            DealError::UpstreamFetch {
                product_id: product_id.to_string(),
                message: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(DealError::UpstreamFetch {
                product_id: product_id.to_string(),
                message: format!("status {}", response.status()),
            });
        }

        let body: QuoteResponse =
            response
                .json()
                .await
                .map_err(|e| DealError::UpstreamFetch {
                    product_id: product_id.to_string(),
                    message: format!("malformed quote body: {}", e),
                })?;

        Ok(PriceQuote {
            product_id: body.product_id.unwrap_or_else(|| product_id.to_string()),
            raw_price: body.sale_price,
            currency: Currency::from_code(&body.currency),
            pre_tax: body.pre_tax,
            fetched_at: Utc::now(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: std::collections::HashMap<String, f64>,
}

/// Best-effort live exchange rate: any failure falls back to the configured
/// rate. A stale rate is a data-quality concern, not a cycle blocker.
pub async fn fetch_exchange_rate(endpoint: &str, currency_code: &str, fallback: f64) -> f64 {
    let client = Client::new();
    let fetched = async {
        let response = client.get(endpoint).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body: RatesResponse = response.json().await.ok()?;
        body.rates.get(currency_code).copied().filter(|r| *r > 0.0)
    }
    .await;

    match fetched {
        Some(rate) => {
            tracing::info!("Fetched USD to {} rate: {}", currency_code, rate);
            rate
        }
        None => {
            tracing::warn!(
                "Could not fetch exchange rate from {}, using configured {}",
                endpoint,
                fallback
            );
            fallback
        }
    }
}
