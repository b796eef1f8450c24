//! Periodic refresh of the guard's daily statistics.
//!
//! Runs on its own thread and only talks to the rest of the program through
//! a channel; it never touches check-in state.

use crate::error::CheckInError;
use crate::model::GuardStats;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

pub type StatsUpdate = Result<GuardStats, CheckInError>;

pub struct StatsPoller {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StatsPoller {
    /// Fetch once immediately, then every `interval`, until stopped or until
    /// the returned receiver is dropped.
    pub fn spawn<F>(interval: Duration, mut fetch: F) -> (StatsPoller, Receiver<StatsUpdate>)
    where
        F: FnMut() -> StatsUpdate + Send + 'static,
    {
        let (updates_tx, updates_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("stats-poller".to_owned())
            .spawn(move || loop {
                let update = fetch();
                if let Err(e) = &update {
                    warn!("statistics refresh failed: {}", e);
                }
                if updates_tx.send(update).is_err() {
                    debug!("statistics receiver gone, stopping");
                    break;
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Without a thread there are simply no updates
                warn!("could not start statistics poller: {}", e);
                None
            }
        };
        (
            StatsPoller {
                stop: Some(stop_tx),
                handle,
            },
            updates_rx,
        )
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatsPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn stats(total: u32) -> GuardStats {
        GuardStats {
            total_today: total,
            permanent: total,
            fixed_term: 0,
            last_delivery: None,
        }
    }

    #[test]
    fn polls_repeatedly_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let (poller, updates) = StatsPoller::spawn(Duration::from_millis(5), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) as u32;
            Ok(stats(n))
        });

        let first = updates.recv().unwrap().unwrap();
        let second = updates.recv().unwrap().unwrap();
        assert_eq!(first.total_today, 0);
        assert_eq!(second.total_today, 1);

        poller.stop();
        let fetched = count.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), fetched);
    }

    #[test]
    fn errors_are_delivered_not_fatal() {
        let (poller, updates) = StatsPoller::spawn(Duration::from_millis(5), || {
            Err(CheckInError::Network("down".to_owned()))
        });
        assert!(updates.recv().unwrap().is_err());
        assert!(updates.recv().unwrap().is_err());
        poller.stop();
    }

    #[test]
    fn dropping_receiver_ends_thread() {
        let (poller, updates) = StatsPoller::spawn(Duration::from_millis(1), || Ok(stats(1)));
        drop(updates);
        // Joins without hanging
        poller.stop();
    }
}
