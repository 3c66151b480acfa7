use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::helpers::timeout::bounded;
use crate::history::dto::{HistoryPage, HistoryPhase, TransactionRecord};
use crate::indexer::handler::HistoryIndexer;

#[derive(Default)]
struct PaginatorState {
    wallet: Option<String>,
    /// Newest first, unique by id
    log: Vec<TransactionRecord>,
    seen: HashSet<String>,
    pages: usize,
    /// The last fetch came back short of its limit
    exhausted: bool,
    phase: HistoryPhase,
    error: Option<String>,
    generation: u64,
}

impl PaginatorState {
    fn visible_len(&self, page_size: usize) -> usize {
        self.log.len().min(self.pages * page_size)
    }

    fn merge(&mut self, records: Vec<TransactionRecord>) {
        for record in records {
            if self.seen.insert(record.id.clone()) {
                self.log.push(record);
            }
        }
        // stable: equal timestamps keep the indexer's order
        self.log.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    fn page(&self, page_size: usize) -> HistoryPage {
        let visible = self.visible_len(page_size);
        let has_more = match self.phase {
            HistoryPhase::Idle => false,
            _ => self.log.len() > visible || (!self.exhausted && self.pages > 0),
        };

        HistoryPage {
            records: self.log[..visible].to_vec(),
            has_more,
            phase: self.phase,
            error: self.error.clone(),
        }
    }
}

/// Incremental "load more" over a wallet's transfer history.
///
/// Keeps every record fetched this session in memory and pages over it,
/// only going back to the indexer when the log runs short.
pub struct HistoryPaginator {
    indexer: Arc<dyn HistoryIndexer>,
    page_size: usize,
    lookahead: usize,
    timeout: Duration,
    state: Mutex<PaginatorState>,
}

impl HistoryPaginator {
    pub fn new(
        indexer: Arc<dyn HistoryIndexer>,
        page_size: usize,
        lookahead: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            indexer,
            page_size: page_size.max(1),
            lookahead,
            timeout,
            state: Mutex::new(PaginatorState::default()),
        }
    }

    /// Fetch the first page (plus lookahead) and restart paging from it.
    ///
    /// On failure the previously shown records stay and the error is set.
    pub async fn load_initial(&self, wallet_address: &str) -> HistoryPage {
        let limit = self.page_size + self.lookahead;
        let generation = {
            let mut state = self.state.lock();
            if state.wallet.as_deref() != Some(wallet_address) {
                let generation = state.generation;
                *state = PaginatorState {
                    generation,
                    ..PaginatorState::default()
                };
                state.wallet = Some(wallet_address.to_string());
            }
            state.generation += 1;
            state.phase = HistoryPhase::Loading;
            state.generation
        };

        let result = bounded(
            self.timeout,
            "history fetch",
            self.indexer.get_transactions(wallet_address, limit),
        )
        .await;

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!("Dropping superseded history load for {}", wallet_address);
            return state.page(self.page_size);
        }

        state.phase = HistoryPhase::Ready;
        match result {
            Ok(records) => {
                state.exhausted = records.len() < limit;
                state.log.clear();
                state.seen.clear();
                state.merge(records);
                state.pages = 1;
                state.error = None;
            }
            Err(e) => {
                warn!("History load failed for {}: {}", wallet_address, e);
                state.error = Some(format!("Could not load transactions: {}", e));
            }
        }

        state.page(self.page_size)
    }

    /// Show one more page, fetching a larger batch only when the log is short.
    ///
    /// Does nothing while another load is outstanding.
    pub async fn load_more(&self) -> HistoryPage {
        let (wallet, limit, generation) = {
            let mut state = self.state.lock();
            if state.phase != HistoryPhase::Ready {
                debug!("load_more ignored while {:?}", state.phase);
                return state.page(self.page_size);
            }
            let Some(wallet) = state.wallet.clone() else {
                return state.page(self.page_size);
            };

            let target = (state.pages + 1) * self.page_size;
            if state.log.len() >= target {
                state.pages += 1;
                return state.page(self.page_size);
            }
            if state.exhausted {
                if state.log.len() > state.pages * self.page_size {
                    state.pages += 1;
                }
                return state.page(self.page_size);
            }

            state.phase = HistoryPhase::LoadingMore;
            (wallet, target + self.lookahead, state.generation)
        };

        let result = bounded(
            self.timeout,
            "history fetch",
            self.indexer.get_transactions(&wallet, limit),
        )
        .await;

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!("Dropping superseded history page for {}", wallet);
            return state.page(self.page_size);
        }

        state.phase = HistoryPhase::Ready;
        match result {
            Ok(records) => {
                state.exhausted = records.len() < limit;
                state.merge(records);
                if state.log.len() > state.pages * self.page_size {
                    state.pages += 1;
                }
                state.error = None;
            }
            Err(e) => {
                warn!("Loading more history failed for {}: {}", wallet, e);
                state.error = Some(format!("Could not load more transactions: {}", e));
            }
        }

        state.page(self.page_size)
    }

    pub fn page(&self) -> HistoryPage {
        self.state.lock().page(self.page_size)
    }

    pub fn phase(&self) -> HistoryPhase {
        self.state.lock().phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.phase(),
            HistoryPhase::Loading | HistoryPhase::LoadingMore
        )
    }

    /// Back to `Idle` with an empty log; outstanding fetches are discarded.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let generation = state.generation + 1;
        *state = PaginatorState {
            generation,
            ..PaginatorState::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeIndexer, record, records};
    use std::sync::atomic::Ordering;

    const WALLET: &str = "0xme";

    fn paginator(indexer: Arc<FakeIndexer>, lookahead: usize) -> Arc<HistoryPaginator> {
        Arc::new(HistoryPaginator::new(
            indexer,
            5,
            lookahead,
            Duration::from_secs(10),
        ))
    }

    fn ids(page: &HistoryPage) -> Vec<String> {
        page.records.iter().map(|r| r.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_initial_load_shows_first_page() {
        let indexer = Arc::new(FakeIndexer::with_records(records(12)));
        let paginator = paginator(indexer.clone(), 5);

        let page = paginator.load_initial(WALLET).await;

        assert_eq!(ids(&page), vec!["t0", "t1", "t2", "t3", "t4"]);
        assert!(page.has_more);
        assert_eq!(page.phase, HistoryPhase::Ready);
        assert_eq!(*indexer.limits.lock(), vec![10]);
    }

    #[tokio::test]
    async fn test_load_more_served_from_lookahead() {
        let indexer = Arc::new(FakeIndexer::with_records(records(12)));
        let paginator = paginator(indexer.clone(), 5);

        paginator.load_initial(WALLET).await;
        let page = paginator.load_more().await;

        assert_eq!(page.records.len(), 10);
        assert_eq!(indexer.calls(), 1);
        assert!(page.has_more);

        let page = paginator.load_more().await;
        assert_eq!(page.records.len(), 12);
        assert_eq!(indexer.calls(), 2);
        assert_eq!(*indexer.limits.lock(), vec![10, 20]);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_overlapping_batches_do_not_duplicate() {
        let indexer = Arc::new(FakeIndexer::with_records(records(8)));
        let paginator = paginator(indexer.clone(), 0);

        paginator.load_initial(WALLET).await;

        // a new transfer lands on top, pushing the old records down a slot
        indexer.store.lock().insert(0, record("new", 1_800_000_000));

        paginator.load_more().await;
        let page = paginator.load_more().await;

        let seen: HashSet<&str> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(seen.len(), page.records.len());
        assert!(page
            .records
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(page.records[0].id, "new");
        assert_eq!(page.records.len(), 9);
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_indexer_order() {
        let batch = vec![record("x", 100), record("y", 100), record("z", 90)];
        let indexer = Arc::new(FakeIndexer::with_records(batch));
        let paginator = paginator(indexer, 5);

        let page = paginator.load_initial(WALLET).await;
        assert_eq!(ids(&page), vec!["x", "y", "z"]);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_shown_records_keep_place_on_timestamp_tie() {
        let batch: Vec<_> = (0..5).map(|i| record(&format!("x{}", i), 100)).collect();
        let indexer = Arc::new(FakeIndexer::with_records(batch));
        let paginator = paginator(indexer.clone(), 0);
        paginator.load_initial(WALLET).await;

        indexer.store.lock().insert(0, record("w", 100));
        let page = paginator.load_more().await;

        assert_eq!(ids(&page), vec!["x0", "x1", "x2", "x3", "x4", "w"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_is_not_reentrant() {
        let indexer = Arc::new(FakeIndexer::with_records(records(30)));
        let paginator = paginator(indexer.clone(), 0);
        paginator.load_initial(WALLET).await;
        assert_eq!(indexer.calls(), 1);

        *indexer.delay.lock() = Some(Duration::from_secs(2));

        let first = {
            let paginator = paginator.clone();
            tokio::spawn(async move { paginator.load_more().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(paginator.phase(), HistoryPhase::LoadingMore);

        let second = paginator.load_more().await;
        assert_eq!(second.records.len(), 5);

        let first = first.await.unwrap();
        assert_eq!(first.records.len(), 10);
        assert_eq!(indexer.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_records() {
        let indexer = Arc::new(FakeIndexer::with_records(records(20)));
        let paginator = paginator(indexer.clone(), 0);
        paginator.load_initial(WALLET).await;

        indexer.fail.store(true, Ordering::SeqCst);
        let page = paginator.load_more().await;

        assert_eq!(page.records.len(), 5);
        assert_eq!(page.phase, HistoryPhase::Ready);
        assert!(page.error.is_some());

        let page = paginator.load_initial(WALLET).await;
        assert_eq!(page.records.len(), 5);
        assert!(page.error.is_some());

        indexer.fail.store(false, Ordering::SeqCst);
        let page = paginator.load_more().await;
        assert_eq!(page.records.len(), 10);
        assert!(page.error.is_none());
    }

    #[tokio::test]
    async fn test_new_wallet_drops_old_log() {
        let indexer = Arc::new(FakeIndexer::with_records(records(7)));
        let paginator = paginator(indexer.clone(), 5);
        paginator.load_initial(WALLET).await;

        indexer.fail.store(true, Ordering::SeqCst);
        let page = paginator.load_initial("0xsomeone-else").await;
        assert!(page.records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_in_flight_fetch() {
        let indexer = Arc::new(FakeIndexer::with_records(records(7)));
        *indexer.delay.lock() = Some(Duration::from_secs(1));
        let paginator = paginator(indexer, 5);

        let pending = {
            let paginator = paginator.clone();
            tokio::spawn(async move { paginator.load_initial(WALLET).await })
        };
        tokio::task::yield_now().await;
        paginator.reset();

        let page = pending.await.unwrap();
        assert!(page.records.is_empty());
        assert_eq!(paginator.phase(), HistoryPhase::Idle);
        assert!(!paginator.page().has_more);
    }
}
