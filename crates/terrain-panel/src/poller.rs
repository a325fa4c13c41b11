//! Periodic refresh of a panel's data.
//!
//! The poller fires a fetch on every tick without waiting for, or
//! cancelling, the previous one. Whichever fetch resolves last wins. Once
//! the view is destroyed, late results are dropped.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::PanelError;

/// What a panel currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelState<T> {
    Loading,
    Ready { data: T, fetched_at: DateTime<Utc> },
    Error(String),
}

/// Shared, destroyable holder of a panel's state.
#[derive(Debug)]
pub struct PanelView<T> {
    state: Arc<RwLock<PanelState<T>>>,
    destroyed: Arc<AtomicBool>,
}

impl<T> Clone for PanelView<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            destroyed: Arc::clone(&self.destroyed),
        }
    }
}

impl<T: Clone> PanelView<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(PanelState::Loading)),
            destroyed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Record a fetch result. Returns false if the view is already gone.
    pub async fn apply(&self, result: Result<T, PanelError>) -> bool {
        if self.is_destroyed() {
            return false;
        }
        let next = match result {
            Ok(data) => PanelState::Ready {
                data,
                fetched_at: Utc::now(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Panel refresh failed");
                PanelState::Error(e.to_string())
            }
        };
        *self.state.write().await = next;
        true
    }

    pub async fn state(&self) -> PanelState<T> {
        self.state.read().await.clone()
    }

    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl<T: Clone> Default for PanelView<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task re-running a fetch at a fixed interval.
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    /// Start polling into `view`. The first fetch runs immediately.
    pub fn start<T, F, Fut>(view: PanelView<T>, interval: Duration, fetch: F) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, PanelError>> + Send + 'static,
    {
        let interval = interval.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if view.is_destroyed() {
                    tracing::debug!("Panel destroyed, polling stopped");
                    break;
                }
                let view = view.clone();
                let pending = fetch();
                tokio::spawn(async move {
                    view.apply(pending.await).await;
                });
            }
        });
        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
