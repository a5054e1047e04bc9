use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the curated catalog. The reference price is already landed
/// (tax-inclusive, display currency); it is the deal-detection baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub category: String,
    pub section: String,
    pub base_price: f64,
    pub final_price: f64,
    pub link: String,
    #[serde(default)]
    pub description: String,
}

impl CatalogEntry {
    /// Stable identity for deduplication: the numeric marketplace product id
    /// when the link carries one, otherwise the link itself.
    pub fn product_id(&self) -> String {
        crate::adapters::catalog::extract_product_id(&self.link)
            .unwrap_or_else(|| self.link.clone())
    }

    /// Baseline for the discount computation. The curated sheet sometimes
    /// only fills the pre-tax column, so fall back to it.
    pub fn reference_price(&self) -> Option<f64> {
        if self.final_price > 0.0 {
            Some(self.final_price)
        } else if self.base_price > 0.0 {
            Some(self.base_price)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Brl,
    #[serde(other)]
    Other,
}

impl Currency {
    pub fn from_code(code: &str) -> Currency {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Currency::Usd,
            "BRL" => Currency::Brl,
            _ => Currency::Other,
        }
    }
}

/// A single marketplace price observation. Consumed once per cycle,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub product_id: String,
    pub raw_price: f64,
    pub currency: Currency,
    /// Set when the source is known to report pre-tax local pricing; the
    /// default assumption is that same-currency listings are tax-inclusive.
    #[serde(default)]
    pub pre_tax: bool,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DealDecision {
    pub product_id: String,
    pub reference_price: f64,
    pub landed_price: f64,
    pub discount_percent: f64,
    pub is_deal: bool,
}

/// Durable record of a dispatched announcement, keyed by product id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    pub product_id: String,
    pub landed_price: f64,
    pub announced_at: DateTime<Utc>,
}

/// Facts handed to the notification channel. Rendering is the channel
/// adapter's business.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub product_name: String,
    pub reference_price: f64,
    pub landed_price: f64,
    pub discount_percent: f64,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub checked: usize,
    pub sent: usize,
    pub skipped_duplicate: usize,
    pub skipped_no_deal: usize,
    pub failed: usize,
}
