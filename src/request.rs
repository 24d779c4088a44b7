//! In-flight request tracking and cooperative cancellation
//!
//! Each `check_password` call registers a handle with a cancellation token.
//! Cancellation is cooperative: the token is checked at every suspension
//! point (rate-limiter wait, network await, backoff sleep) and never rolls
//! back cache or breaker state already committed by other calls.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

/// Cooperative cancellation token scoped to one check
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Check cancellation without suspending
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Suspend until the token fires.
    ///
    /// Never resolves if the request completes without being cancelled, so
    /// always race this against the actual work in a `select!`.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped without firing: this request can no
                // longer be cancelled.
                std::future::pending::<()>().await;
            }
        }
    }
}

struct RequestEntry {
    cancel: watch::Sender<bool>,
    started_at: Instant,
}

/// Registry of in-flight checks, keyed by request id
pub struct RequestRegistry {
    inner: Mutex<HashMap<Uuid, RequestEntry>>,
}

impl RequestRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new in-flight request, returning its id and token
    pub fn register(&self) -> (Uuid, CancelToken) {
        let (tx, rx) = watch::channel(false);
        let id = Uuid::new_v4();

        let mut inner = self.inner.lock().expect("request registry poisoned");
        inner.insert(
            id,
            RequestEntry {
                cancel: tx,
                started_at: Instant::now(),
            },
        );

        (id, CancelToken { rx })
    }

    /// Remove a completed request from the registry
    pub fn complete(&self, id: &Uuid) {
        let mut inner = self.inner.lock().expect("request registry poisoned");
        inner.remove(id);
    }

    /// Fire the cancellation token for one request.
    ///
    /// Returns false if the id is unknown or already completed. The entry
    /// stays registered until the cancelled call resolves.
    pub fn cancel(&self, id: &Uuid) -> bool {
        let inner = self.inner.lock().expect("request registry poisoned");
        match inner.get(id) {
            Some(entry) => {
                let _ = entry.cancel.send(true);
                true
            }
            None => false,
        }
    }

    /// Fire every in-flight token, returning how many were signalled
    pub fn cancel_all(&self) -> usize {
        let inner = self.inner.lock().expect("request registry poisoned");
        for entry in inner.values() {
            let _ = entry.cancel.send(true);
        }
        inner.len()
    }

    /// Number of requests currently in flight
    pub fn active(&self) -> usize {
        self.inner.lock().expect("request registry poisoned").len()
    }

    /// Ids of requests currently in flight, oldest first
    pub fn active_ids(&self) -> Vec<Uuid> {
        let inner = self.inner.lock().expect("request registry poisoned");
        let mut entries: Vec<_> = inner.iter().collect();
        entries.sort_by_key(|(_, e)| e.started_at);
        entries.into_iter().map(|(id, _)| *id).collect()
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}
