//! Consumption rate re-estimation.
//!
//! The observed rate is the mean over consecutive restock pairs of
//! `(quantity_after of the earlier restock - quantity_before of the later one) / days
//! between them`. It is blended with the current rate as a prior:
//! `weight * observed + (1 - weight) * prior`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pantry_core::{TrackedItem, UsageEvent};
use pantry_store::Store;
use rust_decimal::Decimal;
use tracing::info;

use crate::depletion::elapsed_days;
use crate::error::{EngineError, Result};
use crate::ledger::Ledger;

/// Mean consumption per day across consecutive restock pairs, oldest first.
///
/// Pairs with no time between them are skipped. Returns `None` when no usable pair exists.
#[must_use]
pub fn observed_rate(restocks: &[UsageEvent]) -> Option<Decimal> {
    let mut total = Decimal::ZERO;
    let mut gaps: u32 = 0;

    for pair in restocks.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        let days = elapsed_days(earlier.occurred_at, later.occurred_at);
        if days <= Decimal::ZERO {
            continue;
        }
        let consumed = earlier
            .quantity_after
            .checked_sub(later.quantity_before)?
            .max(Decimal::ZERO);
        total = total.checked_add(consumed.checked_div(days)?)?;
        gaps += 1;
    }

    if gaps == 0 {
        return None;
    }
    total.checked_div(Decimal::from(gaps))
}

/// Weighted blend of the observed rate and the prior.
///
/// The result always lies between the two inputs.
#[must_use]
pub fn blend(observed: Decimal, prior: Decimal, observed_weight: Decimal) -> Option<Decimal> {
    let weighted_observed = observed.checked_mul(observed_weight)?;
    let weighted_prior = prior.checked_mul(Decimal::ONE - observed_weight)?;
    let blended = weighted_observed.checked_add(weighted_prior)?;
    // Rounding in the products can step just outside the bounds.
    Some(blended.clamp(observed.min(prior), observed.max(prior)))
}

/// A new rate produced for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateEstimate {
    /// Rate observed from restock history.
    pub observed: Decimal,
    /// Rate before re-estimation.
    pub prior: Decimal,
    /// Rate written to the item.
    pub blended: Decimal,
}

/// Re-estimates consumption rates from restock history.
#[derive(Clone)]
pub struct RateEstimator {
    store: Arc<dyn Store>,
    ledger: Ledger,
    lookback_days: u32,
    observed_weight: Decimal,
}

impl RateEstimator {
    /// Create an estimator.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        ledger: Ledger,
        lookback_days: u32,
        observed_weight: Decimal,
    ) -> Self {
        Self {
            store,
            ledger,
            lookback_days,
            observed_weight,
        }
    }

    /// Whether the item's rate is old enough to be re-estimated.
    ///
    /// A rate written fewer than `interval_days` calendar days before `now` is kept.
    #[must_use]
    pub fn is_due(item: &TrackedItem, now: DateTime<Utc>, interval_days: u32) -> bool {
        item.rate_updated_at.map_or(true, |updated| {
            (now.date_naive() - updated.date_naive()).num_days() >= i64::from(interval_days)
        })
    }

    /// Compute a new rate without writing it.
    ///
    /// Returns `Ok(None)` when the lookback window has fewer than two usable restocks.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidItemState`] for a negative prior rate, or a storage error.
    pub fn estimate(&self, item: &TrackedItem, now: DateTime<Utc>) -> Result<Option<RateEstimate>> {
        if item.consumption_rate < Decimal::ZERO {
            return Err(EngineError::invalid_state(
                item.id,
                format!("negative consumption rate {}", item.consumption_rate),
            ));
        }

        let restocks = self
            .ledger
            .recent_restocks(&item.id, now, self.lookback_days)?;
        if restocks.len() < 2 {
            return Ok(None);
        }

        let Some(observed) = observed_rate(&restocks) else {
            return Ok(None);
        };
        let blended = blend(observed, item.consumption_rate, self.observed_weight)
            .ok_or_else(|| EngineError::invalid_state(item.id, "rate blend overflowed"))?;

        Ok(Some(RateEstimate {
            observed,
            prior: item.consumption_rate,
            blended,
        }))
    }

    /// Compute a new rate and persist it on the item.
    ///
    /// # Errors
    ///
    /// Same as [`RateEstimator::estimate`], plus a storage error if the write fails.
    pub fn apply(
        &self,
        mut item: TrackedItem,
        now: DateTime<Utc>,
    ) -> Result<Option<(TrackedItem, RateEstimate)>> {
        let Some(estimate) = self.estimate(&item, now)? else {
            return Ok(None);
        };

        item.consumption_rate = estimate.blended;
        item.rate_updated_at = Some(now);
        item.updated_at = now;
        self.store.put_item(&item)?;

        info!(
            item_id = %item.id,
            observed = %estimate.observed,
            prior = %estimate.prior,
            blended = %estimate.blended,
            "re-estimated consumption rate"
        );

        Ok(Some((item, estimate)))
    }
}
