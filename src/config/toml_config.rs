use crate::config::Settings;
use crate::core::tax::TaxBracket;
use crate::utils::error::{DealError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// TOML file configuration. Every field is optional; present values override
/// the built-in defaults and are in turn overridden by env vars and CLI
/// flags.
///
/// ```toml
/// [deals]
/// min_discount_percent = 12.5
/// max_deals_per_run = 8
///
/// [dedup]
/// duplicate_window_hours = 24
///
/// [tax]
/// brackets = [
///   { upper_usd = 50.0, rate = 0.44 },
///   { rate = 0.92, deduction_usd = 20.0 },
/// ]
///
/// [sources]
/// catalog_path = "catalog.csv"
/// price_api_endpoint = "https://prices.example.com/api"
///
/// [telegram]
/// chat_id = "@my_deals_channel"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub deals: Option<DealsSection>,
    pub dedup: Option<DedupSection>,
    pub pacing: Option<PacingSection>,
    pub tax: Option<TaxSection>,
    pub sources: Option<SourcesSection>,
    pub telegram: Option<TelegramSection>,
    pub store: Option<StoreSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealsSection {
    pub min_discount_percent: Option<f64>,
    pub max_deals_per_run: Option<usize>,
    pub exchange_rate: Option<f64>,
    pub display_currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupSection {
    pub duplicate_window_hours: Option<f64>,
    pub price_repeat_window_hours: Option<f64>,
    pub price_repeat_tolerance: Option<f64>,
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PacingSection {
    pub batch_size: Option<usize>,
    pub inter_batch_delay_seconds: Option<f64>,
    pub message_delay_seconds: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxSection {
    pub brackets: Option<Vec<TaxBracket>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesSection {
    pub catalog_path: Option<String>,
    pub catalog_category: Option<String>,
    pub price_api_endpoint: Option<String>,
    pub rate_api_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramSection {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSection {
    pub state_path: Option<String>,
}

impl TomlConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| DealError::InvalidConfigValue {
            field: "config_file".to_string(),
            value: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn apply(self, settings: &mut Settings) {
        macro_rules! set {
            ($section:expr, $($field:ident),+) => {
                if let Some(section) = $section {
                    $(if let Some(value) = section.$field {
                        settings.$field = value;
                    })+
                }
            };
        }

        set!(self.deals, min_discount_percent, max_deals_per_run, exchange_rate, display_currency);
        set!(
            self.dedup,
            duplicate_window_hours,
            price_repeat_window_hours,
            price_repeat_tolerance,
            retention_days
        );
        set!(self.pacing, batch_size, inter_batch_delay_seconds, message_delay_seconds);
        if let Some(sources) = self.sources {
            if let Some(path) = sources.catalog_path {
                settings.catalog_path = path;
            }
            if let Some(category) = sources.catalog_category {
                settings.catalog_category = category;
            }
            if let Some(endpoint) = sources.price_api_endpoint {
                settings.price_api_endpoint = endpoint;
            }
            if sources.rate_api_endpoint.is_some() {
                settings.rate_api_endpoint = sources.rate_api_endpoint;
            }
        }
        if let Some(tax) = self.tax {
            if let Some(brackets) = tax.brackets {
                settings.tax_brackets = brackets;
            }
        }
        if let Some(telegram) = self.telegram {
            if let Some(token) = telegram.bot_token {
                settings.telegram_bot_token = token;
            }
            if let Some(chat_id) = telegram.chat_id {
                settings.telegram_chat_id = chat_id;
            }
        }
        set!(self.store, state_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_overrides_defaults() {
        let parsed: TomlConfig = toml::from_str(
            r#"
            [deals]
            min_discount_percent = 15.0

            [dedup]
            duplicate_window_hours = 12.0

            [tax]
            brackets = [
                { upper_usd = 50.0, rate = 0.44 },
                { rate = 0.92, deduction_usd = 20.0 },
            ]

            [telegram]
            chat_id = "@test_channel"
            "#,
        )
        .unwrap();

        let mut settings = Settings::default();
        parsed.apply(&mut settings);

        assert_eq!(settings.min_discount_percent, 15.0);
        assert_eq!(settings.duplicate_window_hours, 12.0);
        assert_eq!(settings.telegram_chat_id, "@test_channel");
        // Untouched fields keep their defaults.
        assert_eq!(settings.max_deals_per_run, 10);
        assert_eq!(settings.batch_size, 5);
        assert!(settings.tax_schedule().is_ok());
    }

    #[test]
    fn test_empty_file_is_noop() {
        let parsed: TomlConfig = toml::from_str("").unwrap();
        let mut settings = Settings::default();
        let before = settings.clone();
        parsed.apply(&mut settings);
        assert_eq!(settings.batch_size, before.batch_size);
        assert_eq!(settings.exchange_rate, before.exchange_rate);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not [valid toml").unwrap();
        assert!(matches!(
            TomlConfig::from_path(&path),
            Err(DealError::InvalidConfigValue { .. })
        ));
    }
}
