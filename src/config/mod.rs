#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::tax::{TaxBracket, TaxSchedule};
use crate::domain::model::Currency;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_float, validate_positive_number,
    validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};

/// Everything one cycle needs, resolved up front. No process-wide mutable
/// state: the engine receives this struct at cycle start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub min_discount_percent: f64,
    pub max_deals_per_run: usize,
    pub duplicate_window_hours: f64,
    pub price_repeat_window_hours: f64,
    pub price_repeat_tolerance: f64,
    pub batch_size: usize,
    pub inter_batch_delay_seconds: f64,
    pub message_delay_seconds: f64,
    pub exchange_rate: f64,
    pub display_currency: String,
    pub retention_days: u32,
    pub tax_brackets: Vec<TaxBracket>,
    pub state_path: String,
    pub catalog_path: String,
    pub catalog_category: String,
    pub price_api_endpoint: String,
    pub rate_api_endpoint: Option<String>,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_discount_percent: 10.0,
            max_deals_per_run: 10,
            duplicate_window_hours: 24.0,
            price_repeat_window_hours: 48.0,
            price_repeat_tolerance: 0.02,
            batch_size: 5,
            inter_batch_delay_seconds: 2.0,
            message_delay_seconds: 3.0,
            exchange_rate: 5.0,
            display_currency: "BRL".to_string(),
            retention_days: 90,
            tax_brackets: default_brackets(),
            state_path: "deals_state.json".to_string(),
            catalog_path: String::new(),
            catalog_category: "EARPHONES".to_string(),
            price_api_endpoint: String::new(),
            rate_api_endpoint: None,
            telegram_bot_token: String::new(),
            telegram_chat_id: String::new(),
        }
    }
}

fn default_brackets() -> Vec<TaxBracket> {
    vec![
        TaxBracket {
            upper_usd: Some(50.0),
            rate: 0.44,
            deduction_usd: 0.0,
        },
        TaxBracket {
            upper_usd: None,
            rate: 0.92,
            deduction_usd: 20.0,
        },
    ]
}

impl Settings {
    /// Environment variable overrides, applied between file config and CLI
    /// flags. Names match the original deployment's .env contract.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram_bot_token = v;
        }
        if let Ok(v) = std::env::var("TELEGRAM_CHANNEL_ID") {
            self.telegram_chat_id = v;
        }
        if let Some(v) = env_parse::<f64>("USD_TO_BRL_RATE") {
            self.exchange_rate = v;
        }
        if let Some(v) = env_parse::<f64>("MIN_DISCOUNT_PERCENT") {
            self.min_discount_percent = v;
        }
        if let Some(v) = env_parse::<usize>("MAX_DEALS_PER_RUN") {
            self.max_deals_per_run = v;
        }
        if let Some(v) = env_parse::<f64>("DUPLICATE_CHECK_HOURS") {
            self.duplicate_window_hours = v;
        }
        if let Some(v) = env_parse::<f64>("MESSAGE_DELAY_SECONDS") {
            self.message_delay_seconds = v;
        }
        if let Ok(v) = std::env::var("DEALS_STATE_PATH") {
            self.state_path = v;
        }
    }

    pub fn tax_schedule(&self) -> Result<TaxSchedule> {
        TaxSchedule::new(self.tax_brackets.clone())
    }

    pub fn display_currency(&self) -> Currency {
        Currency::from_code(&self.display_currency)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_range("min_discount_percent", self.min_discount_percent, 0.0, 100.0)?;
        validate_positive_number("max_deals_per_run", self.max_deals_per_run, 1)?;
        validate_positive_float("duplicate_window_hours", self.duplicate_window_hours)?;
        validate_positive_float("price_repeat_window_hours", self.price_repeat_window_hours)?;
        validate_range("price_repeat_tolerance", self.price_repeat_tolerance, 0.0, 1.0)?;
        validate_positive_number("batch_size", self.batch_size, 1)?;
        validate_positive_float("exchange_rate", self.exchange_rate)?;
        validate_non_empty_string("display_currency", &self.display_currency)?;
        validate_path("state_path", &self.state_path)?;
        validate_path("catalog_path", &self.catalog_path)?;
        validate_url("price_api_endpoint", &self.price_api_endpoint)?;
        if let Some(rate_endpoint) = &self.rate_api_endpoint {
            validate_url("rate_api_endpoint", rate_endpoint)?;
        }
        validate_non_empty_string("telegram_bot_token", &self.telegram_bot_token)?;
        validate_non_empty_string("telegram_chat_id", &self.telegram_chat_id)?;

        // Delays may be zero (tests, aggressive deployments) but not negative
        // or non-finite.
        for (field, value) in [
            ("inter_batch_delay_seconds", self.inter_batch_delay_seconds),
            ("message_delay_seconds", self.message_delay_seconds),
        ] {
            validate_range(field, value, 0.0, f64::MAX)?;
        }

        // Surface a malformed bracket table before any cycle starts.
        self.tax_schedule()?;
        Ok(())
    }
}
