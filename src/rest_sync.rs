//! RestSync - Serialized REST Work Queue
//!
//! All upstream REST traffic, from every client connection and every
//! periodic loop, funnels through one instance of this queue. The single
//! consumer runs one job to completion before the next begins, so calls
//! reach the exchange in enqueue order and at most one is ever in flight.
//! The exchange rate-limits aggressively; this gives predictable pacing.

use futures_util::FutureExt;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot, watch};

/// Bound on jobs waiting in the queue before `push` backpressures
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Producer handle: enqueue REST jobs and gate the consumer.
///
/// Clone freely; all clones feed the same consumer.
#[derive(Clone)]
pub struct RestSync {
    tx: mpsc::Sender<(Job, Option<oneshot::Sender<()>>)>,
    gate: watch::Sender<bool>,
}

/// The consumer end. Obtained from [`RestSync::new`] and driven by
/// [`RestSyncConsumer::run`], usually inside `tokio::spawn`.
pub struct RestSyncConsumer {
    rx: mpsc::Receiver<(Job, Option<oneshot::Sender<()>>)>,
    gate: watch::Receiver<bool>,
}

impl RestSync {
    /// Creates a queue (initially running) and its consumer.
    pub fn new(capacity: usize) -> (RestSync, RestSyncConsumer) {
        let (tx, rx) = mpsc::channel(capacity);
        let (gate_tx, gate_rx) = watch::channel(true);
        (
            RestSync { tx, gate: gate_tx },
            RestSyncConsumer { rx, gate: gate_rx },
        )
    }

    /// Enqueues a job, waiting for queue capacity. The returned receiver
    /// fires when the job has run to completion.
    pub async fn push<F>(&self, job: F) -> oneshot::Receiver<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .tx
            .send((Box::pin(job), Some(done_tx)))
            .await
            .is_err()
        {
            tracing::warn!("REST queue consumer is gone; job dropped");
        }
        done_rx
    }

    /// Enqueues a job without waiting. A full queue drops the job with a
    /// warning; pushers that must not lose work use `push`.
    pub fn push_nowait<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.tx.try_send((Box::pin(job), None)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("REST queue full; job dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("REST queue consumer is gone; job dropped");
            }
        }
    }

    /// Wakes a stopped consumer.
    pub fn start(&self) {
        let _ = self.gate.send(true);
    }

    /// Parks the consumer before its next job. Pending jobs stay enqueued.
    pub fn stop(&self) {
        let _ = self.gate.send(false);
    }

    pub fn is_running(&self) -> bool {
        *self.gate.borrow()
    }
}

impl RestSyncConsumer {
    /// Consumer loop: runs jobs strictly one at a time, in enqueue order.
    /// A panicking job is caught and logged; the loop never dies with it.
    pub async fn run(mut self) {
        loop {
            if !*self.gate.borrow() {
                if self.gate.changed().await.is_err() {
                    return;
                }
                continue;
            }
            tokio::select! {
                changed = self.gate.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                next = self.rx.recv() => {
                    let Some((job, done)) = next else {
                        tracing::debug!("REST queue closed; consumer exiting");
                        return;
                    };
                    if let Err(panic) = std::panic::AssertUnwindSafe(job).catch_unwind().await {
                        tracing::error!("REST job panicked: {:?}", panic);
                    }
                    if let Some(done) = done {
                        let _ = done.send(());
                    }
                }
            }
        }
    }
}
