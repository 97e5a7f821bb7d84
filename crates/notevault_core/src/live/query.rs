//! Reactive query handle.

use super::tracker::{InvalidationTracker, Table};
use log::warn;
use std::fmt::Display;
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A live query result: the current value plus every later distinct value.
///
/// Values are snapshots. A slow reader may skip intermediate values but
/// always observes the latest one. Dropping the handle (or calling
/// [`LiveQuery::cancel`]) stops the refresh task.
#[derive(Debug)]
pub struct LiveQuery<T> {
    receiver: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> LiveQuery<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Runs `fetch` once and keeps re-running it after writes to `tables`.
    ///
    /// The initial fetch error is returned to the caller. Later fetch errors
    /// keep the previous value and are logged.
    pub async fn start<F, Fut, E>(
        tracker: &InvalidationTracker,
        tables: &'static [Table],
        name: &'static str,
        fetch: F,
    ) -> Result<Self, E>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        // Subscribe before the first fetch so a write racing with it is not lost.
        let mut changes = tracker.subscribe();
        let mut seen = *changes.borrow_and_update();
        let initial = fetch().await?;
        let (sender, receiver) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sender.closed() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }

                let current = *changes.borrow_and_update();
                if !seen.changed_since(&current, tables) {
                    continue;
                }
                seen = current;

                match fetch().await {
                    Ok(value) => {
                        sender.send_if_modified(|held| {
                            if *held == value {
                                false
                            } else {
                                *held = value;
                                true
                            }
                        });
                    }
                    Err(err) => {
                        warn!(
                            "event=live_query_refresh module=live status=error query={} error={}",
                            name, err
                        );
                    }
                }
            }
        });

        Ok(Self { receiver, task })
    }

    /// Wraps a receiver fed by an already spawned task.
    pub(crate) fn from_parts(receiver: watch::Receiver<T>, task: JoinHandle<()>) -> Self {
        Self { receiver, task }
    }

    /// Returns the latest value and marks it as seen.
    pub fn current(&mut self) -> T {
        self.receiver.borrow_and_update().clone()
    }

    /// Returns the latest value without marking it as seen.
    pub fn peek(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Waits for the next distinct value.
    ///
    /// Returns `None` once the source has stopped.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Waits until the value satisfies `predicate`, checking the current one first.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Option<T> {
        let value = self.receiver.wait_for(|value| predicate(value)).await.ok()?;
        Some(value.clone())
    }

    /// Returns an extra receiver sharing this query's values.
    ///
    /// Extra receivers end when this handle is dropped.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.receiver.clone()
    }

    /// Stops the refresh task.
    pub fn cancel(self) {}

    /// Returns whether the refresh task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
