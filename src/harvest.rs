use std::time::Duration;

use crate::error::Result;
use crate::models::NewsItem;
use crate::providers::NewsSource;
use crate::store::NewsStore;

/// Outcome of one fetch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub keywords_processed: usize,
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
}

impl CycleReport {
    /// Nothing was fetched, so nothing was persisted.
    pub fn is_noop(&self) -> bool {
        self.fetched == 0
    }
}

/// Runs fetch cycles: search every keyword, then upsert everything found
/// as a single batch.
pub struct Harvester<'a> {
    source: &'a dyn NewsSource,
    store: &'a dyn NewsStore,
    request_interval: Duration,
}

impl<'a> Harvester<'a> {
    pub fn new(
        source: &'a dyn NewsSource,
        store: &'a dyn NewsStore,
        request_interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            request_interval,
        }
    }

    pub async fn run_cycle(&self, keywords: &[String]) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        if keywords.is_empty() {
            tracing::warn!("No keywords configured, nothing to fetch");
            return Ok(report);
        }

        tracing::info!(keywords = %keywords.join(", "), "Starting fetch cycle");

        let mut batch: Vec<NewsItem> = Vec::new();
        for (idx, keyword) in keywords.iter().enumerate() {
            // Providers rate-limit; keep calls apart.
            if idx > 0 && !self.request_interval.is_zero() {
                tokio::time::sleep(self.request_interval).await;
            }

            let mut items = self.source.search(keyword).await;
            tracing::info!(keyword = %keyword, count = items.len(), "Fetched news");

            for item in &mut items {
                item.ensure_tag(keyword);
            }
            batch.extend(items);
            report.keywords_processed += 1;
        }

        report.fetched = batch.len();
        if batch.is_empty() {
            tracing::warn!(keywords = report.keywords_processed, "No news found");
            return Ok(report);
        }

        let summary = self.store.upsert_batch(batch).await.map_err(|e| {
            tracing::error!(
                store = %self.store.describe(),
                operation = "upsert_batch",
                error = %e,
                "Failed to save news"
            );
            e
        })?;

        report.inserted = summary.inserted;
        report.updated = summary.updated;
        tracing::info!(
            store = %self.store.describe(),
            keywords = report.keywords_processed,
            fetched = report.fetched,
            inserted = report.inserted,
            updated = report.updated,
            "Fetch cycle complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::AppError;
    use crate::models::NewsRecord;
    use crate::store::{JsonStore, SqliteStore, UpsertSummary};

    #[derive(Default)]
    struct FakeSource {
        results: HashMap<String, Vec<NewsItem>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn with(mut self, keyword: &str, items: Vec<NewsItem>) -> Self {
            self.results.insert(keyword.to_string(), items);
            self
        }
    }

    #[async_trait]
    impl NewsSource for FakeSource {
        async fn search(&self, keyword: &str) -> Vec<NewsItem> {
            self.calls.lock().unwrap().push(keyword.to_string());
            self.results.get(keyword).cloned().unwrap_or_default()
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl NewsStore for BrokenStore {
        fn describe(&self) -> String {
            "broken".to_string()
        }

        async fn load_all(&self) -> Result<Vec<NewsRecord>> {
            Ok(Vec::new())
        }

        async fn upsert_batch(&self, _batch: Vec<NewsItem>) -> Result<UpsertSummary> {
            Err(AppError::Config("disk full".to_string()))
        }
    }

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_items_are_tagged_and_ids_follow_keyword_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("news.json"));
        let source = FakeSource::default()
            .with("AI", vec![NewsItem::new("a"), NewsItem::new("b")])
            .with("ML", vec![NewsItem::new("c"), NewsItem::new("a")]);
        let harvester = Harvester::new(&source, &store, Duration::ZERO);

        let report = harvester.run_cycle(&keywords(&["AI", "ML"])).await.unwrap();

        assert_eq!(
            report,
            CycleReport {
                keywords_processed: 2,
                fetched: 4,
                inserted: 3,
                updated: 1
            }
        );
        let records = store.load_all().await.unwrap();
        let by_link: HashMap<&str, &NewsRecord> =
            records.iter().map(|r| (r.link.as_str(), r)).collect();
        assert_eq!(by_link["a"].id, 1);
        assert_eq!(by_link["b"].id, 2);
        assert_eq!(by_link["c"].id, 3);
        assert!(by_link["a"].has_tag("AI") && by_link["a"].has_tag("ML"));
        assert_eq!(*source.calls.lock().unwrap(), keywords(&["AI", "ML"]));
    }

    #[tokio::test]
    async fn test_rerunning_the_same_cycle_inserts_nothing() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let source = FakeSource::default()
            .with("AI", vec![NewsItem::new("a").with_tags(["provider"])]);
        let harvester = Harvester::new(&source, &store, Duration::ZERO);

        let first = harvester.run_cycle(&keywords(&["AI"])).await.unwrap();
        let before = store.load_all().await.unwrap();
        let second = harvester.run_cycle(&keywords(&["AI"])).await.unwrap();

        assert_eq!(first.inserted, 1);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 1);
        let after = store.load_all().await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, before[0].id);
        assert_eq!(after[0].tags, before[0].tags);
    }

    #[tokio::test]
    async fn test_no_results_is_a_noop_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("news.json"));
        let source = FakeSource::default();
        let harvester = Harvester::new(&source, &store, Duration::ZERO);

        let report = harvester.run_cycle(&keywords(&["AI", "ML"])).await.unwrap();

        assert!(report.is_noop());
        assert_eq!(report.keywords_processed, 2);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_no_keywords_skips_the_source() {
        let source = FakeSource::default();
        let harvester = Harvester::new(&source, &BrokenStore, Duration::ZERO);

        let report = harvester.run_cycle(&[]).await.unwrap();

        assert!(report.is_noop());
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_fails_the_cycle() {
        let source = FakeSource::default().with("AI", vec![NewsItem::new("a")]);
        let harvester = Harvester::new(&source, &BrokenStore, Duration::ZERO);

        let result = harvester.run_cycle(&keywords(&["AI"])).await;

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_paced() {
        let source = FakeSource::default();
        let harvester = Harvester::new(&source, &BrokenStore, Duration::from_secs(1));
        let start = tokio::time::Instant::now();

        harvester.run_cycle(&keywords(&["a", "b", "c"])).await.unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }
}
