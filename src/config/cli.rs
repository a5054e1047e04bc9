use crate::config::toml_config::TomlConfig;
use crate::config::Settings;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "dealwatch")]
#[command(about = "Watches a curated catalog for marketplace deals and announces them")]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<String>,

    /// Catalog CSV export path
    #[arg(long)]
    pub catalog: Option<String>,

    /// Catalog category label
    #[arg(long)]
    pub category: Option<String>,

    /// Announcement state file
    #[arg(long)]
    pub state: Option<String>,

    /// Pricing API base URL
    #[arg(long)]
    pub price_api: Option<String>,

    /// Minimum discount percent to announce
    #[arg(long)]
    pub min_discount: Option<f64>,

    /// Maximum deals to announce per run
    #[arg(long)]
    pub max_deals: Option<usize>,

    /// Keep running, one cycle every --interval-hours
    #[arg(long)]
    pub continuous: bool,

    /// Check interval for continuous mode, in hours
    #[arg(long, default_value = "6.0")]
    pub interval_hours: f64,

    /// Evaluate deals but skip dispatch and record-keeping
    #[arg(long)]
    pub dry_run: bool,

    /// After the cycle, delete announcement records older than N days
    #[arg(long)]
    pub prune_days: Option<u32>,

    /// Fetch a live exchange rate before the first cycle
    #[arg(long)]
    pub fetch_rate: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Resolution order: defaults -> TOML file -> environment -> CLI flags.
    pub fn resolve_settings(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(path) = &self.config {
            TomlConfig::from_path(path)?.apply(&mut settings);
        }
        settings.apply_env();

        if let Some(catalog) = &self.catalog {
            settings.catalog_path = catalog.clone();
        }
        if let Some(category) = &self.category {
            settings.catalog_category = category.clone();
        }
        if let Some(state) = &self.state {
            settings.state_path = state.clone();
        }
        if let Some(price_api) = &self.price_api {
            settings.price_api_endpoint = price_api.clone();
        }
        if let Some(min_discount) = self.min_discount {
            settings.min_discount_percent = min_discount;
        }
        if let Some(max_deals) = self.max_deals {
            settings.max_deals_per_run = max_deals;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_win() {
        let args = CliArgs::parse_from([
            "dealwatch",
            "--catalog",
            "my.csv",
            "--price-api",
            "https://prices.example.com",
            "--min-discount",
            "20",
        ]);
        let settings = args.resolve_settings().unwrap();
        assert_eq!(settings.catalog_path, "my.csv");
        assert_eq!(settings.min_discount_percent, 20.0);
        // Untouched values stay at defaults.
        assert_eq!(settings.batch_size, 5);
    }

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["dealwatch"]);
        assert!(!args.continuous);
        assert!(!args.dry_run);
        assert_eq!(args.interval_hours, 6.0);
    }
}
