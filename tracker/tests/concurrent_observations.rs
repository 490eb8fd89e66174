use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::task::JoinSet;

use history::{PricePoint, RetentionPolicy};
use tracker::error::TrackerError;
use tracker::metrics::Counters;
use tracker::model::TrackedUpdate;
use tracker::repository::{HistoryRepository, StoredHistory};
use tracker::repository_memory::InMemoryHistoryRepository;
use tracker::tracker::PriceTracker;

/// Wraps the in-memory repository and records how many load-to-save cycles
/// overlap per product.
#[derive(Default)]
struct ProbeRepository {
    inner: InMemoryHistoryRepository,
    in_flight: Mutex<HashMap<String, usize>>,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl HistoryRepository for ProbeRepository {
    async fn load(&self, product_id: &str) -> anyhow::Result<Option<StoredHistory>> {
        {
            let mut in_flight = self.in_flight.lock();
            let n = in_flight.entry(product_id.to_owned()).or_default();
            *n += 1;
            self.max_in_flight.fetch_max(*n, Ordering::SeqCst);
        }
        // Widen the race window between load and save.
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.inner.load(product_id).await
    }

    async fn save(&self, update: &TrackedUpdate) -> anyhow::Result<()> {
        let res = self.inner.save(update).await;
        if let Some(n) = self.in_flight.lock().get_mut(&update.product_id) {
            *n -= 1;
        }
        res
    }

    async fn remove(&self, product_id: &str) -> anyhow::Result<bool> {
        self.inner.remove(product_id).await
    }
}

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, n).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_product_updates_never_overlap() {
    let repo = Arc::new(ProbeRepository::default());
    let tracker = Arc::new(PriceTracker::new(
        repo.clone(),
        RetentionPolicy::default(),
        Counters::default(),
    ));

    let mut set = JoinSet::new();
    for i in 0..32 {
        let tracker = tracker.clone();
        set.spawn(async move {
            let price = 100.0 + f64::from(i % 3);
            tracker
                .observe("snp-hot", PricePoint::new(price, price, 0.0), day(1))
                .await
        });
    }

    while let Some(res) = set.join_next().await {
        res.unwrap().unwrap();
    }

    assert_eq!(repo.max_in_flight.load(Ordering::SeqCst), 1);

    let history = tracker.history("snp-hot").await.unwrap().unwrap();
    assert_eq!(history.start_date(), day(1));
    assert_eq!(history.end_date(), day(1));
    assert_eq!(tracker.counters().snapshot().observations, 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_products_progress_independently() {
    let repo = Arc::new(ProbeRepository::default());
    let tracker = Arc::new(PriceTracker::new(
        repo.clone(),
        RetentionPolicy::default(),
        Counters::default(),
    ));

    let mut set = JoinSet::new();
    for p in 0..8 {
        let tracker = tracker.clone();
        set.spawn(async move {
            let product = format!("snp-{p}");
            for d in 1..=5u32 {
                let price = f64::from(10 * (p + 1) + d as i32);
                tracker
                    .observe(&product, PricePoint::new(price, price, 0.0), day(d))
                    .await?;
            }
            Ok::<_, TrackerError>(())
        });
    }

    while let Some(res) = set.join_next().await {
        res.unwrap().unwrap();
    }

    assert_eq!(repo.max_in_flight.load(Ordering::SeqCst), 1);
    for p in 0..8 {
        let history = tracker.history(&format!("snp-{p}")).await.unwrap().unwrap();
        assert!(history.start_date() <= history.end_date());
        assert_eq!(history.end_point().selling_price, f64::from(10 * (p + 1) + 5));
        assert_eq!(history.middle_prices().len(), 5);
    }
}
