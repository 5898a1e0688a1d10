//! Realized-gain tax model: flat rate above a per-trade tax-free threshold.

use super::error::NetreturnError;

const SECTION: &str = "tax";

#[derive(Debug, Clone, PartialEq)]
pub struct TaxConfig {
    /// Flat rate in [0, 1].
    pub tax_rate: f64,
    /// When false the liability is computed but not deducted from cash.
    pub apply_immediately: bool,
    /// Allowance subtracted from each realized gain independently.
    pub tax_free_threshold: f64,
    pub currency: String,
}

impl Default for TaxConfig {
    fn default() -> Self {
        TaxConfig {
            tax_rate: 0.25,
            apply_immediately: true,
            tax_free_threshold: 0.0,
            currency: "EUR".to_string(),
        }
    }
}

impl TaxConfig {
    pub fn flat(tax_rate: f64) -> Self {
        TaxConfig {
            tax_rate,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), NetreturnError> {
        if !self.tax_rate.is_finite() || !(0.0..=1.0).contains(&self.tax_rate) {
            return Err(NetreturnError::ConfigInvalid {
                section: SECTION.to_string(),
                key: "tax_rate".to_string(),
                reason: "tax_rate must be between 0 and 1".to_string(),
            });
        }
        if !self.tax_free_threshold.is_finite() || self.tax_free_threshold < 0.0 {
            return Err(NetreturnError::ConfigInvalid {
                section: SECTION.to_string(),
                key: "tax_free_threshold".to_string(),
                reason: "tax_free_threshold must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxModel {
    config: TaxConfig,
}

impl TaxModel {
    pub fn new(config: TaxConfig) -> Result<Self, NetreturnError> {
        config.validate()?;
        Ok(TaxModel { config })
    }

    pub fn untaxed() -> Self {
        TaxModel {
            config: TaxConfig::flat(0.0),
        }
    }

    pub fn config(&self) -> &TaxConfig {
        &self.config
    }

    pub fn applies_immediately(&self) -> bool {
        self.config.apply_immediately
    }

    /// Tax owed on one realized gain. Losses owe nothing and are not offset.
    pub fn tax(&self, realized_gain: f64) -> f64 {
        if realized_gain <= 0.0 {
            return 0.0;
        }
        let taxable = (realized_gain - self.config.tax_free_threshold).max(0.0);
        taxable * self.config.tax_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_taxed_at_flat_rate() {
        let model = TaxModel::new(TaxConfig::flat(0.25)).unwrap();
        assert!((model.tax(500.0) - 125.0).abs() < f64::EPSILON);
    }

    #[test]
    fn losses_and_zero_owe_nothing() {
        let model = TaxModel::new(TaxConfig::flat(0.25)).unwrap();
        assert_eq!(model.tax(0.0), 0.0);
        assert_eq!(model.tax(-250.0), 0.0);
    }

    #[test]
    fn threshold_is_subtracted_per_gain() {
        let model = TaxModel::new(TaxConfig {
            tax_free_threshold: 100.0,
            ..TaxConfig::flat(0.5)
        })
        .unwrap();
        assert_eq!(model.tax(80.0), 0.0);
        assert_eq!(model.tax(100.0), 0.0);
        assert!((model.tax(300.0) - 100.0).abs() < f64::EPSILON);
        // Each gain gets the full allowance again.
        assert!((model.tax(300.0) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deferred_mode_still_computes_liability() {
        let model = TaxModel::new(TaxConfig {
            apply_immediately: false,
            ..TaxConfig::flat(0.25)
        })
        .unwrap();
        assert!(!model.applies_immediately());
        assert!((model.tax(400.0) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn untaxed_model() {
        assert_eq!(TaxModel::untaxed().tax(1_000.0), 0.0);
    }

    #[test]
    fn rate_out_of_range_rejected() {
        for rate in [-0.1, 1.01, f64::NAN] {
            let err = TaxModel::new(TaxConfig::flat(rate)).unwrap_err();
            assert!(
                matches!(err, NetreturnError::ConfigInvalid { ref key, .. } if key == "tax_rate")
            );
        }
    }

    #[test]
    fn rate_bounds_inclusive() {
        assert!(TaxModel::new(TaxConfig::flat(0.0)).is_ok());
        assert!(TaxModel::new(TaxConfig::flat(1.0)).is_ok());
    }

    #[test]
    fn negative_threshold_rejected() {
        let err = TaxModel::new(TaxConfig {
            tax_free_threshold: -1.0,
            ..Default::default()
        })
        .unwrap_err();
        assert!(
            matches!(err, NetreturnError::ConfigInvalid { key, .. } if key == "tax_free_threshold")
        );
    }
}
