use crate::domain::model::DealDecision;
use crate::utils::error::{DealError, Result};

/// Deal decision: discount relative to the catalog baseline, with a minimum
/// threshold. A discount exactly at the threshold counts as a deal.
///
/// Both prices must be valid positive landed prices; a zero quote is a fetch
/// error sentinel the caller filters out before this point.
pub fn evaluate(
    product_id: &str,
    reference_price: f64,
    landed_price: f64,
    min_discount_percent: f64,
) -> Result<DealDecision> {
    if !reference_price.is_finite() || reference_price <= 0.0 {
        return Err(DealError::invalid_reference(format!(
            "'{}' has no positive reference price ({})",
            product_id, reference_price
        )));
    }

    let discount_percent = (reference_price - landed_price) / reference_price * 100.0;
    let is_deal = discount_percent >= min_discount_percent;

    Ok(DealDecision {
        product_id: product_id.to_string(),
        reference_price,
        landed_price,
        discount_percent,
        is_deal,
    })
}
