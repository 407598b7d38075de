use std::{collections::HashMap, fmt, future::Future};

use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::WorkerError;
use crate::mirror::channels::ChannelKind;

/// What a long-lived receiver worker does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerRole {
    /// Control-port accept loop (owns all sessions).
    Acceptor,
    /// Receive loop of one data channel.
    Channel(ChannelKind),
}

impl WorkerRole {
    pub fn is_channel(&self) -> bool {
        matches!(self, WorkerRole::Channel(_))
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerRole::Acceptor => write!(f, "acceptor"),
            WorkerRole::Channel(kind) => write!(f, "{kind} loop"),
        }
    }
}

struct Worker {
    role: WorkerRole,
    handle: JoinHandle<()>,
}

/// Tracks the receiver's spawned workers so shutdown can join them in
/// order. Workers still tracked when the pool drops are aborted.
#[derive(Default)]
pub struct WorkerPool {
    workers: HashMap<u64, Worker>,
    next_id: u64,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `fut` on the runtime under `role`. Returns the worker id.
    pub fn spawn<F>(&mut self, role: WorkerRole, fut: F) -> u64
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.workers.insert(
            id,
            Worker {
                role,
                handle: tokio::spawn(fut),
            },
        );
        id
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Await every worker matching `pred` and stop tracking it. Callers
    /// cancel the workers first; this only waits.
    pub async fn join_where(&mut self, pred: impl Fn(&WorkerRole) -> bool) -> Vec<WorkerError> {
        let ids: Vec<u64> = self
            .workers
            .iter()
            .filter(|(_, w)| pred(&w.role))
            .map(|(id, _)| *id)
            .collect();

        let mut failures = Vec::new();
        for id in ids {
            let Some(worker) = self.workers.remove(&id) else {
                continue;
            };
            if let Err(e) = worker.handle.await {
                let e = WorkerError::from(e);
                warn!("{} worker {id} ended abnormally: {e}", worker.role);
                failures.push(e);
            }
        }
        failures
    }

    pub async fn join_all(&mut self) -> Vec<WorkerError> {
        self.join_where(|_| true).await
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in self.workers.values() {
            worker.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn join_where_only_awaits_matching_role() {
        let mut pool = WorkerPool::new();
        let done = Arc::new(AtomicUsize::new(0));

        for kind in ChannelKind::ALL {
            let done = Arc::clone(&done);
            pool.spawn(WorkerRole::Channel(kind), async move {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.spawn(WorkerRole::Acceptor, std::future::pending());

        assert_eq!(pool.len(), 5);
        let failures = pool.join_where(WorkerRole::is_channel).await;
        assert!(failures.is_empty());
        assert_eq!(done.load(Ordering::SeqCst), 4);
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn panic_is_reported() {
        let mut pool = WorkerPool::new();
        pool.spawn(WorkerRole::Acceptor, async { panic!("boom") });
        let failures = pool.join_all().await;
        assert!(matches!(failures.as_slice(), [WorkerError::Panicked(_)]));
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn drop_aborts_remaining_workers() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut pool = WorkerPool::new();
        pool.spawn(WorkerRole::Acceptor, async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        drop(pool);
        assert!(rx.await.is_err());
    }
}
