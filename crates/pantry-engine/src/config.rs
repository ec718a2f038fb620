//! Engine configuration.

use chrono::NaiveTime;
use rust_decimal::Decimal;

use crate::error::{EngineError, Result};
use crate::retry::RetryConfig;

/// Tunables for depletion, reminders and rate estimation.
///
/// All times of day are UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Time of day at which the daily depletion tick fires.
    pub daily_tick_time: NaiveTime,
    /// Time of day at which new reminders are scheduled.
    pub reminder_time: NaiveTime,
    /// Re-estimation runs on daily slots whose day number is a multiple of this.
    pub reestimation_interval_days: u32,
    /// How far back the estimator looks for restock events.
    pub lookback_days: u32,
    /// Weight of the observed rate in the blend; the prior gets the rest.
    pub observed_rate_weight: Decimal,
    /// A restock is detected when quantity exceeds the reminder's creation quantity by
    /// `max(restock_margin_floor, restock_margin_fraction * peak_quantity)`.
    pub restock_margin_fraction: Decimal,
    /// Lower bound of the restock-detection margin.
    pub restock_margin_floor: Decimal,
    /// Retry policy for storage operations.
    pub retry: RetryConfig,
    /// Upper bound on items processed concurrently within one batch.
    pub max_concurrent_items: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            daily_tick_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
            reminder_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            reestimation_interval_days: 7,
            lookback_days: 30,
            observed_rate_weight: Decimal::new(7, 1),
            restock_margin_fraction: Decimal::new(5, 1),
            restock_margin_floor: Decimal::new(25, 2),
            retry: RetryConfig::default(),
            max_concurrent_items: 8,
        }
    }
}

impl EngineConfig {
    /// Check the configuration for values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.reestimation_interval_days == 0 {
            return Err(EngineError::Configuration(
                "reestimation_interval_days must be at least 1".into(),
            ));
        }
        if self.lookback_days == 0 {
            return Err(EngineError::Configuration(
                "lookback_days must be at least 1".into(),
            ));
        }
        if self.observed_rate_weight < Decimal::ZERO || self.observed_rate_weight > Decimal::ONE {
            return Err(EngineError::Configuration(format!(
                "observed_rate_weight must be within [0, 1], got {}",
                self.observed_rate_weight
            )));
        }
        if self.restock_margin_fraction < Decimal::ZERO || self.restock_margin_floor < Decimal::ZERO
        {
            return Err(EngineError::Configuration(
                "restock margin settings must not be negative".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(EngineError::Configuration(
                "retry max_attempts must be at least 1".into(),
            ));
        }
        if self.max_concurrent_items == 0 {
            return Err(EngineError::Configuration(
                "max_concurrent_items must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.daily_tick_time, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert_eq!(config.reminder_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(config.observed_rate_weight, dec!(0.7));
        assert_eq!(config.restock_margin_floor, dec!(0.25));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = EngineConfig {
            observed_rate_weight: dec!(1.5),
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Configuration(_))));

        config.observed_rate_weight = dec!(0.7);
        config.reestimation_interval_days = 0;
        assert!(config.validate().is_err());

        config.reestimation_interval_days = 7;
        config.max_concurrent_items = 0;
        assert!(config.validate().is_err());
    }
}
