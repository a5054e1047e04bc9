use crate::domain::model::AnnouncementRecord;
use crate::domain::ports::AnnouncementStore;
use crate::utils::error::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Per-product announcement dedup over a durable store.
///
/// A product is `RecentlyAnnounced` while `now - announced_at` is inside the
/// duplicate window, and falls back to `Silent` lazily on query; nothing runs
/// on timers. Pruning is storage hygiene only, the window check never depends
/// on it.
pub struct DuplicateTracker {
    store: Arc<dyn AnnouncementStore>,
    window: Duration,
    price_repeat_window: Duration,
    price_repeat_tolerance: f64,
}

impl DuplicateTracker {
    pub fn new(
        store: Arc<dyn AnnouncementStore>,
        window_hours: f64,
        price_repeat_window_hours: f64,
        price_repeat_tolerance: f64,
    ) -> Self {
        Self {
            store,
            window: hours_to_duration(window_hours),
            price_repeat_window: hours_to_duration(price_repeat_window_hours),
            price_repeat_tolerance,
        }
    }

    /// True iff an announcement for this product exists inside the window.
    pub async fn is_duplicate(&self, product_id: &str, now: DateTime<Utc>) -> Result<bool> {
        match self.store.load(product_id).await? {
            Some(record) => Ok(now - record.announced_at < self.window),
            None => Ok(false),
        }
    }

    /// True when the last announcement is outside the primary window but the
    /// price has not meaningfully moved since: within the (longer) repeat
    /// window and inside the relative tolerance. Stops the bot re-posting an
    /// unchanged price every cycle.
    pub async fn was_price_repeated(
        &self,
        product_id: &str,
        landed_price: f64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(record) = self.store.load(product_id).await? else {
            return Ok(false);
        };
        if now - record.announced_at >= self.price_repeat_window {
            return Ok(false);
        }
        if record.landed_price <= 0.0 {
            return Ok(false);
        }
        let diff_ratio = (record.landed_price - landed_price).abs() / record.landed_price;
        Ok(diff_ratio <= self.price_repeat_tolerance)
    }

    /// Durable upsert. The store serializes same-key writes; an older
    /// timestamp never supersedes a newer record, so concurrent callers
    /// converge on the last writer by timestamp.
    pub async fn record_announcement(
        &self,
        product_id: &str,
        landed_price: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.store
            .upsert(AnnouncementRecord {
                product_id: product_id.to_string(),
                landed_price,
                announced_at: now,
            })
            .await
    }

    /// Deletes records older than the retention horizon; returns how many
    /// were removed. Idempotent.
    pub async fn prune_older_than(&self, retention_days: u32, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - Duration::days(retention_days as i64);
        let deleted = self.store.prune_before(cutoff).await?;
        if deleted > 0 {
            tracing::info!("Pruned {} announcement records older than {} days", deleted, retention_days);
        }
        Ok(deleted)
    }
}

fn hours_to_duration(hours: f64) -> Duration {
    Duration::seconds((hours * 3600.0) as i64)
}
