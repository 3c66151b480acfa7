use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Run `tick` every `period`, first one `period` from now.
///
/// The task only holds a weak reference to `owner` and stops once the owner
/// is gone or `tick` returns `false`. The caller keeps the handle to abort it.
pub(crate) fn spawn_poller<T, F, Fut>(owner: Weak<T>, period: Duration, tick: F) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>) -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(owner) = owner.upgrade() else {
                break;
            };
            if !tick(owner).await {
                break;
            }
        }
        log::debug!("Poller stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        ticks: AtomicUsize,
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let counter = Arc::new(Counter::default());
        let handle = spawn_poller(Arc::downgrade(&counter), Duration::from_secs(30), |c| async move {
            c.ticks.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(counter.ticks.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(62)).await;
        assert_eq!(counter.ticks.load(Ordering::SeqCst), 3);

        handle.abort();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_owner_dropped() {
        let counter = Arc::new(Counter::default());
        let handle = spawn_poller(Arc::downgrade(&counter), Duration::from_secs(1), |_| async {
            true
        });

        drop(counter);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_tick_declines() {
        let counter = Arc::new(Counter::default());
        let handle = spawn_poller(Arc::downgrade(&counter), Duration::from_secs(1), |c| async move {
            c.ticks.fetch_add(1, Ordering::SeqCst) < 1
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(handle.is_finished());
        assert_eq!(counter.ticks.load(Ordering::SeqCst), 2);
    }
}
