// src/quiz/ticker.rs

use std::{ops::ControlFlow, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{Instant, interval_at},
};

/// A repeating tick source backed by a spawned task.
///
/// The first tick fires one `period` after spawning. The callback stops the
/// ticker by returning `ControlFlow::Break`. Dropping the handle aborts the
/// task, so a ticker never outlives the value that owns it.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                if on_tick().is_break() {
                    break;
                }
            }
        });

        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    fn counting(period: Duration, stop_after: u32) -> (Ticker, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let ticker = Ticker::spawn(period, move || {
            let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= stop_after {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        (ticker, count)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_until_break() {
        let (ticker, count) = counting(Duration::from_secs(1), 3);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(ticker.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_ticking() {
        let (ticker, count) = counting(Duration::from_secs(1), u32::MAX);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        drop(ticker);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticking() {
        let (ticker, count) = counting(Duration::from_secs(1), u32::MAX);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        ticker.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
