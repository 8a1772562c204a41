use std::{future::Future, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::debug;

/// Collapses bursts of search terms into one downstream call per pause.
///
/// A term is emitted once `quiet` has elapsed without a newer one, and only
/// if it differs from the previous emission. Dropping the debouncer aborts
/// its task; searches already handed to `on_term` run to completion.
pub struct SearchDebouncer {
    tx: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
    quiet: Duration,
}

impl SearchDebouncer {
    pub fn spawn<F, Fut>(quiet: Duration, mut on_term: F) -> Self
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let task = tokio::spawn(async move {
            let mut last_emitted: Option<String> = None;

            while let Some(mut pending) = rx.recv().await {
                loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(term) => pending = term,
                            None => return,
                        },
                        _ = sleep(quiet) => break,
                    }
                }

                if last_emitted.as_deref() == Some(pending.as_str()) {
                    debug!(term = %pending, "suppressing repeated search term");
                    continue;
                }
                last_emitted = Some(pending.clone());
                tokio::spawn(on_term(pending));
            }
        });

        Self { tx, task, quiet }
    }

    pub fn push(&self, term: impl Into<String>) {
        // Only fails after teardown, when nobody is listening anyway.
        let _ = self.tx.send(term.into());
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "tests/search_tests.rs"]
mod tests;
