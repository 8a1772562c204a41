use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{trace, warn};

use crate::store::StoreEvent;

const TOAST_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Toast>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(TOAST_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.tx.subscribe()
    }

    pub fn notify(&self, toast: Toast) {
        trace!(severity = ?toast.severity, summary = %toast.summary, "toast");
        let _ = self.tx.send(toast);
    }

    pub fn success(&self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Severity::Success, summary, detail);
    }

    pub fn info(&self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Severity::Info, summary, detail);
    }

    pub fn warn(&self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Severity::Warn, summary, detail);
    }

    pub fn error(&self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Severity::Error, summary, detail);
    }

    fn push(&self, severity: Severity, summary: impl Into<String>, detail: impl Into<String>) {
        self.notify(Toast {
            severity,
            summary: summary.into(),
            detail: detail.into(),
        });
    }
}

/// Forwards list/search failures raised by a store as error toasts.
///
/// Mutation failures are left to whoever issued the mutation, so each
/// failure is toasted once. The caller owns the handle and aborts it on
/// teardown.
pub fn spawn_error_relay(
    mut events: broadcast::Receiver<StoreEvent>,
    notifier: Notifier,
    summary: impl Into<String>,
) -> JoinHandle<()> {
    let summary = summary.into();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(StoreEvent::ErrorRaised { operation, message }) if operation.is_fetch() => {
                    notifier.error(summary.clone(), message);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "error relay lagged behind store events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/notify_tests.rs"]
mod tests;
