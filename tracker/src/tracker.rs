use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use tracing::{debug, error, info, instrument, warn};

use common::logger::warn_if_slow;
use history::wire::from_json;
use history::{
    PriceHistory, PricePoint, PruneAction, RetentionPolicy, VendorOffer, apply_observation,
    cheapest_offer, is_available,
};

use crate::error::TrackerError;
use crate::locks::KeyedLocks;
use crate::metrics::Counters;
use crate::model::TrackedUpdate;
use crate::repository::HistoryRepository;

/// Folds observations into persisted per-product histories.
///
/// Guarantees:
/// - updates of one product are serialized (load, fold, save under its key)
/// - a stored history that fails validation is replaced by a fresh one
/// - nothing is saved when the observation is rejected
pub struct PriceTracker {
    repo: Arc<dyn HistoryRepository>,
    locks: KeyedLocks,
    policy: RetentionPolicy,
    counters: Counters,
    slow_storage: Duration,
}

impl PriceTracker {
    pub fn new(repo: Arc<dyn HistoryRepository>, policy: RetentionPolicy, counters: Counters) -> Self {
        Self {
            repo,
            locks: KeyedLocks::new(),
            policy,
            counters,
            slow_storage: Duration::from_millis(100),
        }
    }

    pub fn with_slow_storage_threshold(mut self, threshold: Duration) -> Self {
        self.slow_storage = threshold;
        self
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub async fn observe(
        &self,
        product_id: &str,
        observed: PricePoint,
        today: NaiveDate,
    ) -> Result<TrackedUpdate, TrackerError> {
        self.observe_with_stock(product_id, observed, today, None).await
    }

    /// Reduces vendor offers to a price and observes it. `Ok(None)` when the
    /// product has no offers at all; nothing is stored in that case.
    pub async fn observe_offers(
        &self,
        product_id: &str,
        offers: &[VendorOffer],
        today: NaiveDate,
    ) -> Result<Option<TrackedUpdate>, TrackerError> {
        let Some(observed) = cheapest_offer(offers) else {
            debug!(product_id, "no vendor offers; skipping price history");
            return Ok(None);
        };

        self.observe_with_stock(product_id, observed, today, Some(is_available(offers)))
            .await
            .map(Some)
    }

    #[instrument(skip_all, target = "tracker", fields(product_id = %product_id, %today))]
    async fn observe_with_stock(
        &self,
        product_id: &str,
        observed: PricePoint,
        today: NaiveDate,
        in_stock: Option<bool>,
    ) -> Result<TrackedUpdate, TrackerError> {
        Counters::bump(&self.counters.observations);

        if let Err(e) = observed.validate() {
            Counters::bump(&self.counters.rejected);
            warn!(error = %e, "observation rejected");
            return Err(e.into());
        }

        let _guard = self.locks.lock(product_id).await;

        let (previous, prior_streak) = self.load_or_reset(product_id).await?;

        let outcome = match apply_observation(previous, observed, today, &self.policy) {
            Ok(outcome) => outcome,
            Err(e) if !e.is_recoverable() => {
                error!(error = %e, "refusing to fold observation");
                return Err(e.into());
            }
            Err(e) => {
                Counters::bump(&self.counters.rejected);
                warn!(error = %e, "observation rejected");
                return Err(e.into());
            }
        };

        if outcome.changed {
            Counters::bump(&self.counters.changes);
        }
        match outcome.pruning {
            PruneAction::Untouched => {}
            PruneAction::Promoted { anchor, dropped } => {
                Counters::bump(&self.counters.pruned_promoted);
                debug!(%anchor, dropped, "breakpoint promoted to start anchor");
            }
            PruneAction::Synthesized { anchor, dropped } => {
                Counters::bump(&self.counters.pruned_synthesized);
                debug!(%anchor, dropped, "start anchor synthesized at window boundary");
            }
        }

        let mut update = TrackedUpdate::from_outcome(product_id, today, &outcome);
        update.in_stock = in_stock;
        update.inactive_streak = match in_stock {
            Some(true) => 0,
            Some(false) => prior_streak.saturating_add(1),
            None => prior_streak,
        };

        warn_if_slow("history_save", self.slow_storage, self.repo.save(&update))
            .await
            .context("failed to save price history")?;

        debug!(
            changed = update.changed,
            breakpoints = update.price_history.middle_prices.len(),
            "price history updated"
        );

        Ok(update)
    }

    /// Decoded history of `product_id`. Malformed rows surface as errors here.
    pub async fn history(&self, product_id: &str) -> Result<Option<PriceHistory>, TrackerError> {
        let stored = self
            .repo
            .load(product_id)
            .await
            .context("failed to load price history")?;

        Ok(stored
            .map(|row| from_json(&row.history_json))
            .transpose()?)
    }

    /// Drops the stored history of a retired product.
    #[instrument(skip(self), target = "tracker")]
    pub async fn retire(&self, product_id: &str) -> Result<bool, TrackerError> {
        let _guard = self.locks.lock(product_id).await;

        let removed = self
            .repo
            .remove(product_id)
            .await
            .context("failed to remove price history")?;

        if removed {
            Counters::bump(&self.counters.retired);
            info!("price history retired");
        }
        Ok(removed)
    }

    /// Stored history (if trustworthy) and the stored inactivity streak.
    async fn load_or_reset(
        &self,
        product_id: &str,
    ) -> Result<(Option<PriceHistory>, u32), TrackerError> {
        let stored = warn_if_slow("history_load", self.slow_storage, self.repo.load(product_id))
            .await
            .context("failed to load price history")?;

        let Some(row) = stored else {
            debug!("no stored history; first observation");
            return Ok((None, 0));
        };

        match from_json(&row.history_json) {
            Ok(history) => Ok((Some(history), row.inactive_streak)),
            Err(e) => {
                Counters::bump(&self.counters.reinitialized);
                warn!(error = %e, "stored history is malformed; re-initializing");
                Ok((None, row.inactive_streak))
            }
        }
    }
}
