use crate::core::evaluate::evaluate;
use crate::core::normalize::PriceNormalizer;
use crate::core::pacing::DispatchPacer;
use crate::core::tracker::DuplicateTracker;
use crate::domain::model::{CatalogEntry, CycleReport, NotificationPayload};
use crate::domain::ports::{DealNotifier, PriceSource};
use crate::utils::error::Result;
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Drives one evaluation pass over the catalog: batched concurrent quote
/// fetches, sequential evaluate/dispatch/record per item, paced dispatches,
/// aggregate report.
///
/// Per-item upstream failures never abort the cycle; only structural
/// configuration errors do. Announcement records are written one item at a
/// time, immediately after a confirmed dispatch, so aborting between batches
/// loses nothing already done.
pub struct CycleEngine {
    normalizer: PriceNormalizer,
    tracker: DuplicateTracker,
    pacer: DispatchPacer,
    source: Arc<dyn PriceSource>,
    notifier: Arc<dyn DealNotifier>,
    min_discount_percent: f64,
    max_deals_per_run: usize,
    batch_size: usize,
    dry_run: bool,
}

impl CycleEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        normalizer: PriceNormalizer,
        tracker: DuplicateTracker,
        pacer: DispatchPacer,
        source: Arc<dyn PriceSource>,
        notifier: Arc<dyn DealNotifier>,
        min_discount_percent: f64,
        max_deals_per_run: usize,
        batch_size: usize,
        dry_run: bool,
    ) -> Self {
        Self {
            normalizer,
            tracker,
            pacer,
            source,
            notifier,
            min_discount_percent,
            max_deals_per_run,
            batch_size: batch_size.max(1),
            dry_run,
        }
    }

    pub async fn run_cycle(
        &self,
        catalog: &[CatalogEntry],
        cancel: &AtomicBool,
    ) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        // Dedup decisions already made this cycle stay answerable even if the
        // store goes away mid-run.
        let mut announced_this_cycle: HashSet<String> = HashSet::new();

        tracing::info!(
            "Starting cycle: {} catalog entries, batch size {}",
            catalog.len(),
            self.batch_size
        );

        let batches: Vec<&[CatalogEntry]> = catalog.chunks(self.batch_size).collect();
        let batch_count = batches.len();

        'cycle: for (batch_index, batch) in batches.into_iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                tracing::warn!(
                    "Cycle cancelled after {}/{} batches",
                    batch_index,
                    batch_count
                );
                break;
            }

            // Quotes for a batch are fetched concurrently; everything that
            // touches the tracker runs sequentially below, which serializes
            // same-product writes.
            let ids: Vec<String> = batch.iter().map(|entry| entry.product_id()).collect();
            let quotes = join_all(ids.iter().map(|id| self.source.fetch_quote(id))).await;

            for ((entry, product_id), quote_result) in batch.iter().zip(&ids).zip(quotes) {
                report.checked += 1;

                let quote = match quote_result {
                    Ok(quote) => quote,
                    Err(e) => {
                        tracing::warn!("{}: quote fetch failed: {}", entry.name, e);
                        report.failed += 1;
                        continue;
                    }
                };

                // A zero/negative sale price is the marketplace's way of
                // saying "no valid quote"; filter before evaluation.
                if quote.raw_price <= 0.0 {
                    tracing::warn!("{}: no valid quote (price {})", entry.name, quote.raw_price);
                    report.failed += 1;
                    continue;
                }

                let Some(reference_price) = entry.reference_price() else {
                    tracing::warn!("{}: catalog row has no reference price", entry.name);
                    report.failed += 1;
                    continue;
                };

                // Normalization errors are structural (bad schedule, bad
                // rate) and abort the cycle by design.
                let landed_price = self.normalizer.landed_price(&quote)?;

                let decision = match evaluate(
                    product_id,
                    reference_price,
                    landed_price,
                    self.min_discount_percent,
                ) {
                    Ok(decision) => decision,
                    Err(e) => {
                        tracing::warn!("{}: {}", entry.name, e);
                        report.failed += 1;
                        continue;
                    }
                };

                if !decision.is_deal {
                    tracing::debug!(
                        "{}: {:.1}% (below {:.1}%)",
                        entry.name,
                        decision.discount_percent,
                        self.min_discount_percent
                    );
                    report.skipped_no_deal += 1;
                    continue;
                }

                if announced_this_cycle.contains(product_id) {
                    report.skipped_duplicate += 1;
                    continue;
                }

                let now = Utc::now();
                let recently_sent = match self.tracker.is_duplicate(product_id, now).await {
                    Ok(dup) => dup,
                    Err(e) => {
                        tracing::error!("{}: tracker read failed: {}", entry.name, e);
                        report.failed += 1;
                        continue;
                    }
                };
                let price_repeated = if recently_sent {
                    true
                } else {
                    self.tracker
                        .was_price_repeated(product_id, landed_price, now)
                        .await
                        .unwrap_or(false)
                };
                if recently_sent || price_repeated {
                    tracing::debug!("{}: skipping, recently announced", entry.name);
                    report.skipped_duplicate += 1;
                    continue;
                }

                if report.sent >= self.max_deals_per_run {
                    tracing::info!("Reached max deals per run ({})", self.max_deals_per_run);
                    break 'cycle;
                }

                tracing::info!(
                    "Deal: {} at {:.2} ({:.1}% off {:.2})",
                    entry.name,
                    decision.landed_price,
                    decision.discount_percent,
                    decision.reference_price
                );

                if self.dry_run {
                    report.sent += 1;
                    announced_this_cycle.insert(product_id.clone());
                    continue;
                }

                let payload = NotificationPayload {
                    product_name: entry.name.clone(),
                    reference_price: decision.reference_price,
                    landed_price: decision.landed_price,
                    discount_percent: decision.discount_percent,
                    link: entry.link.clone(),
                };

                if let Err(e) = self.notifier.send_deal(&payload).await {
                    tracing::warn!("{}: dispatch failed: {}", entry.name, e);
                    report.failed += 1;
                    continue;
                }

                // The record is written only after a confirmed dispatch. If
                // the write fails we count the item failed and accept a
                // possible re-announcement next cycle; losing the dedup
                // record silently would be worse.
                match self
                    .tracker
                    .record_announcement(product_id, decision.landed_price, now)
                    .await
                {
                    Ok(()) => {
                        report.sent += 1;
                        announced_this_cycle.insert(product_id.clone());
                    }
                    Err(e) => {
                        tracing::error!("{}: announcement record write failed: {}", entry.name, e);
                        report.failed += 1;
                        announced_this_cycle.insert(product_id.clone());
                    }
                }

                self.pacer.after_dispatch().await;
            }

            if batch_index + 1 < batch_count {
                self.pacer.after_batch().await;
            }
        }

        tracing::info!(
            "Cycle done: {} checked, {} sent, {} duplicate, {} no-deal, {} failed",
            report.checked,
            report.sent,
            report.skipped_duplicate,
            report.skipped_no_deal,
            report.failed
        );
        Ok(report)
    }

    pub async fn prune(&self, retention_days: u32) -> Result<usize> {
        self.tracker.prune_older_than(retention_days, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::JsonFileStore;
    use crate::core::tax::TaxSchedule;
    use crate::domain::model::{AnnouncementRecord, Currency, PriceQuote};
    use crate::domain::ports::AnnouncementStore;
    use crate::utils::error::DealError;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    struct FixedPrices {
        prices: HashMap<String, f64>,
    }

    #[async_trait]
    impl PriceSource for FixedPrices {
        async fn fetch_quote(&self, product_id: &str) -> crate::utils::error::Result<PriceQuote> {
            match self.prices.get(product_id) {
                Some(&price) => Ok(PriceQuote {
                    product_id: product_id.to_string(),
                    raw_price: price,
                    currency: Currency::Usd,
                    pre_tax: false,
                    fetched_at: Utc::now(),
                }),
                None => Err(DealError::UpstreamFetch {
                    product_id: product_id.to_string(),
                    message: "no such product".into(),
                }),
            }
        }
    }

    struct CountingNotifier {
        sent: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl DealNotifier for CountingNotifier {
        async fn send_deal(
            &self,
            payload: &NotificationPayload,
        ) -> crate::utils::error::Result<()> {
            if self.fail {
                return Err(DealError::UpstreamDispatch {
                    product_id: payload.link.clone(),
                    message: "channel down".into(),
                });
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Reads succeed (empty), writes always fail.
    struct WriteFailingStore;

    #[async_trait]
    impl AnnouncementStore for WriteFailingStore {
        async fn load(&self, _: &str) -> crate::utils::error::Result<Option<AnnouncementRecord>> {
            Ok(None)
        }
        async fn upsert(&self, _: AnnouncementRecord) -> crate::utils::error::Result<()> {
            Err(DealError::tracker("disk full"))
        }
        async fn prune_before(&self, _: DateTime<Utc>) -> crate::utils::error::Result<usize> {
            Err(DealError::tracker("disk full"))
        }
    }

    fn entry(name: &str, id: u64, reference: f64) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            category: "EARPHONES".into(),
            section: "in-ears".into(),
            base_price: 0.0,
            final_price: reference,
            link: format!("https://www.aliexpress.com/item/{:010}.html", id),
            description: String::new(),
        }
    }

    fn engine(
        source: Arc<dyn PriceSource>,
        notifier: Arc<dyn DealNotifier>,
        store: Arc<dyn AnnouncementStore>,
        max_deals: usize,
    ) -> CycleEngine {
        let normalizer =
            PriceNormalizer::new(Currency::Brl, 5.0, TaxSchedule::default()).unwrap();
        let tracker = DuplicateTracker::new(store, 24.0, 48.0, 0.02);
        CycleEngine::new(
            normalizer,
            tracker,
            DispatchPacer::unthrottled(),
            source,
            notifier,
            10.0,
            max_deals,
            2,
            false,
        )
    }

    #[tokio::test]
    async fn test_mixed_cycle_counts() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
        // $30 quote lands at 216 BRL; reference 300 -> 28% deal,
        // reference 145 -> price increase, no deal.
        let source = Arc::new(FixedPrices {
            prices: HashMap::from([
                ("0000000001".to_string(), 30.0),
                ("0000000002".to_string(), 30.0),
            ]),
        });
        let notifier = Arc::new(CountingNotifier {
            sent: AtomicUsize::new(0),
            fail: false,
        });

        let catalog = vec![
            entry("deal", 1, 300.0),
            entry("no-deal", 2, 145.0),
            entry("fetch-fails", 3, 200.0),
        ];

        let engine = engine(source, notifier.clone(), store, 10);
        let report = engine
            .run_cycle(&catalog, &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(report.checked, 3);
        assert_eq!(report.sent, 1);
        assert_eq!(report.skipped_no_deal, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);

        // Second cycle: the sent deal is now a window duplicate.
        let report = engine
            .run_cycle(&catalog, &AtomicBool::new(false))
            .await
            .unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.skipped_duplicate, 1);
    }

    #[tokio::test]
    async fn test_max_deals_per_run_stops_early() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
        let source = Arc::new(FixedPrices {
            prices: (1..=6u64)
                .map(|i| (format!("{:010}", i), 30.0))
                .collect(),
        });
        let notifier = Arc::new(CountingNotifier {
            sent: AtomicUsize::new(0),
            fail: false,
        });

        let catalog: Vec<CatalogEntry> = (1..=6u64)
            .map(|i| entry(&format!("p{}", i), i, 300.0))
            .collect();

        let engine = engine(source, notifier.clone(), store, 2);
        let report = engine
            .run_cycle(&catalog, &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dispatch_failure_leaves_no_record() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
        let source = Arc::new(FixedPrices {
            prices: HashMap::from([("0000000001".to_string(), 30.0)]),
        });
        let notifier = Arc::new(CountingNotifier {
            sent: AtomicUsize::new(0),
            fail: true,
        });

        let catalog = vec![entry("deal", 1, 300.0)];
        let engine = engine(source, notifier, store.clone(), 10);
        let report = engine
            .run_cycle(&catalog, &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 0);
        // No record without a confirmed dispatch.
        assert!(store.load("0000000001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tracker_write_failure_counts_failed_but_send_happened() {
        let source = Arc::new(FixedPrices {
            prices: HashMap::from([("0000000001".to_string(), 30.0)]),
        });
        let notifier = Arc::new(CountingNotifier {
            sent: AtomicUsize::new(0),
            fail: false,
        });

        let catalog = vec![entry("deal", 1, 300.0)];
        let engine = engine(source, notifier.clone(), Arc::new(WriteFailingStore), 10);
        let report = engine
            .run_cycle(&catalog, &AtomicBool::new(false))
            .await
            .unwrap();

        // The message went out, the record write failed: counted failed, and
        // the deal may legitimately be re-announced next cycle.
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 0);
    }

    #[tokio::test]
    async fn test_cancellation_between_batches() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
        let source = Arc::new(FixedPrices {
            prices: (1..=6u64)
                .map(|i| (format!("{:010}", i), 30.0))
                .collect(),
        });
        let notifier = Arc::new(CountingNotifier {
            sent: AtomicUsize::new(0),
            fail: false,
        });

        let catalog: Vec<CatalogEntry> = (1..=6u64)
            .map(|i| entry(&format!("p{}", i), i, 300.0))
            .collect();

        let cancel = AtomicBool::new(true);
        let engine = engine(source, notifier, store, 10);
        let report = engine.run_cycle(&catalog, &cancel).await.unwrap();

        // Cancelled before the first batch: nothing processed, clean report.
        assert_eq!(report.checked, 0);
        assert_eq!(report.sent, 0);
    }
}
