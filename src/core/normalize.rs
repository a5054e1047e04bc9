use crate::core::tax::TaxSchedule;
use crate::domain::model::{Currency, PriceQuote};
use crate::utils::error::{DealError, Result};
use crate::utils::validation::validate_positive_float;

/// Turns a raw marketplace quote into a landed price in the display currency:
/// USD quotes get import tax added and are converted at the configured rate;
/// quotes already in the display currency are assumed tax-inclusive.
#[derive(Debug, Clone)]
pub struct PriceNormalizer {
    display_currency: Currency,
    exchange_rate: f64,
    schedule: TaxSchedule,
}

impl PriceNormalizer {
    pub fn new(
        display_currency: Currency,
        exchange_rate: f64,
        schedule: TaxSchedule,
    ) -> Result<Self> {
        validate_positive_float("exchange_rate", exchange_rate)?;
        Ok(Self {
            display_currency,
            exchange_rate,
            schedule,
        })
    }

    pub fn exchange_rate(&self) -> f64 {
        self.exchange_rate
    }

    pub fn landed_price(&self, quote: &PriceQuote) -> Result<f64> {
        if !quote.raw_price.is_finite() || quote.raw_price < 0.0 {
            return Err(DealError::invalid_price(format!(
                "quote for '{}' has invalid price {}",
                quote.product_id, quote.raw_price
            )));
        }

        if quote.currency == self.display_currency {
            if quote.pre_tax {
                // The listing reports a local pre-tax price: convert back to
                // USD for the bracket lookup, then land it the USD way.
                let usd = quote.raw_price / self.exchange_rate;
                return self.land_usd(usd);
            }
            // Local listings carry tax-inclusive pricing. Domain assumption
            // inherited from the source catalog; see DESIGN.md.
            return Ok(quote.raw_price);
        }

        match quote.currency {
            Currency::Usd => self.land_usd(quote.raw_price),
            _ => Err(DealError::invalid_price(format!(
                "quote for '{}' is in an unsupported currency",
                quote.product_id
            ))),
        }
    }

    fn land_usd(&self, price_usd: f64) -> Result<f64> {
        let tax_usd = self.schedule.compute_tax(price_usd)?;
        Ok((price_usd + tax_usd) * self.exchange_rate)
    }
}
