use crate::utils::error::{DealError, Result};
use serde::{Deserialize, Serialize};

/// One rung of the import tax table: prices up to `upper_usd` (inclusive) are
/// taxed at `rate` minus a fixed `deduction_usd`. `upper_usd: None` marks the
/// unbounded top bracket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxBracket {
    pub upper_usd: Option<f64>,
    pub rate: f64,
    #[serde(default)]
    pub deduction_usd: f64,
}

/// Ordered, contiguous, exhaustive bracket table over [0, inf).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSchedule {
    brackets: Vec<TaxBracket>,
}

impl TaxSchedule {
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self> {
        if brackets.is_empty() {
            return Err(invalid_brackets("bracket table cannot be empty"));
        }

        let mut prev_upper = 0.0_f64;
        for (i, bracket) in brackets.iter().enumerate() {
            if !bracket.rate.is_finite() || bracket.rate < 0.0 || bracket.rate > 1.0 {
                return Err(invalid_brackets(format!(
                    "bracket {} rate must be in [0, 1], got {}",
                    i, bracket.rate
                )));
            }
            if !bracket.deduction_usd.is_finite() || bracket.deduction_usd < 0.0 {
                return Err(invalid_brackets(format!(
                    "bracket {} deduction must be non-negative",
                    i
                )));
            }
            match bracket.upper_usd {
                Some(upper) => {
                    if i == brackets.len() - 1 {
                        return Err(invalid_brackets("last bracket must be unbounded"));
                    }
                    if !upper.is_finite() || upper <= prev_upper {
                        return Err(invalid_brackets(format!(
                            "bracket bounds must be strictly increasing, got {} after {}",
                            upper, prev_upper
                        )));
                    }
                    prev_upper = upper;
                }
                None => {
                    if i != brackets.len() - 1 {
                        return Err(invalid_brackets("only the last bracket may be unbounded"));
                    }
                }
            }
        }

        Ok(Self { brackets })
    }

    /// Brazilian import tax brackets for international purchases:
    /// 44% up to $50, 92% minus a $20 deduction above. The jump at the $50
    /// boundary is the real regulation, not a modeling artifact.
    pub fn brazilian_imports() -> Self {
        Self {
            brackets: vec![
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
            ],
        }
    }

    /// Import tax in USD for a USD price. The deduction can push the formula
    /// below zero just above a boundary; tax is floored at zero because the
    /// regulation never refunds.
    pub fn compute_tax(&self, price_usd: f64) -> Result<f64> {
        if !price_usd.is_finite() || price_usd < 0.0 {
            return Err(DealError::invalid_price(format!(
                "tax input must be a non-negative number, got {}",
                price_usd
            )));
        }

        let bracket = self
            .brackets
            .iter()
            .find(|b| match b.upper_usd {
                Some(upper) => price_usd <= upper,
                None => true,
            })
            .expect("validated schedule is exhaustive");

        let tax = price_usd * bracket.rate - bracket.deduction_usd;
        Ok(tax.max(0.0))
    }
}

impl Default for TaxSchedule {
    fn default() -> Self {
        Self::brazilian_imports()
    }
}

fn invalid_brackets(reason: impl Into<String>) -> DealError {
    DealError::InvalidConfigValue {
        field: "tax_brackets".to_string(),
        value: "<bracket table>".to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_bracket() {
        let schedule = TaxSchedule::default();
        assert_eq!(schedule.compute_tax(30.0).unwrap(), 30.0 * 0.44);
        assert_eq!(schedule.compute_tax(0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_boundary_discontinuity_preserved() {
        let schedule = TaxSchedule::default();
        assert_eq!(schedule.compute_tax(50.0).unwrap(), 22.0);
        let just_above = schedule.compute_tax(50.01).unwrap();
        assert!((just_above - 26.0092).abs() < 1e-9);
        // The jump at the boundary is real: 22.0 -> ~26.0
        assert!(just_above > schedule.compute_tax(50.0).unwrap());
    }

    #[test]
    fn test_upper_bracket() {
        let schedule = TaxSchedule::default();
        assert_eq!(schedule.compute_tax(100.0).unwrap(), 100.0 * 0.92 - 20.0);
    }

    #[test]
    fn test_tax_never_negative() {
        // A pathological table where the deduction exceeds the tax just above
        // the boundary.
        let schedule = TaxSchedule::new(vec![
            TaxBracket {
                upper_usd: Some(10.0),
                rate: 0.1,
                deduction_usd: 0.0,
            },
            TaxBracket {
                upper_usd: None,
                rate: 0.2,
                deduction_usd: 50.0,
            },
        ])
        .unwrap();
        assert_eq!(schedule.compute_tax(11.0).unwrap(), 0.0);
    }

    #[test]
    fn test_negative_input_rejected() {
        let schedule = TaxSchedule::default();
        assert!(matches!(
            schedule.compute_tax(-1.0),
            Err(DealError::InvalidPrice { .. })
        ));
        assert!(schedule.compute_tax(f64::NAN).is_err());
    }

    #[test]
    fn test_malformed_tables_rejected() {
        assert!(TaxSchedule::new(vec![]).is_err());

        // Bounded last bracket leaves (50, inf) uncovered.
        assert!(TaxSchedule::new(vec![TaxBracket {
            upper_usd: Some(50.0),
            rate: 0.44,
            deduction_usd: 0.0,
        }])
        .is_err());

        // Non-increasing bounds.
        assert!(TaxSchedule::new(vec![
            TaxBracket {
                upper_usd: Some(50.0),
                rate: 0.44,
                deduction_usd: 0.0,
            },
            TaxBracket {
                upper_usd: Some(40.0),
                rate: 0.5,
                deduction_usd: 0.0,
            },
            TaxBracket {
                upper_usd: None,
                rate: 0.92,
                deduction_usd: 20.0,
            },
        ])
        .is_err());

        // Rate outside [0, 1].
        assert!(TaxSchedule::new(vec![TaxBracket {
            upper_usd: None,
            rate: 1.5,
            deduction_usd: 0.0,
        }])
        .is_err());
    }
}
