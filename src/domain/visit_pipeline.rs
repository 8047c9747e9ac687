//! Asynchronous, batched visit ingestion.
//!
//! Redirect handlers hand [`VisitEvent`]s to a [`VisitRecorder`], which pushes
//! them onto a bounded channel without ever waiting. A single background task
//! drains the channel into batches and writes each batch with one
//! [`VisitRepository::record_batch`] call.
//!
//! # Flush triggers
//!
//! A batch is flushed when it reaches `batch_size` events, or when the flush
//! interval ticks with a non-empty batch, whichever comes first. The interval
//! bounds how stale the stored counters can get under low traffic.
//!
//! # Loss model
//!
//! Analytics are best-effort. Events are dropped (and counted) when the queue is
//! full, and a batch is dropped after `flush_retries` failed retries. Neither
//! case is ever reported to the producer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

use crate::domain::entities::VisitEvent;
use crate::domain::repositories::VisitRepository;

/// Tuning knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of events buffered between producers and the consumer.
    pub queue_capacity: usize,
    /// Flush as soon as this many events are buffered.
    pub batch_size: usize,
    /// Flush a non-empty batch at least this often.
    pub flush_interval: Duration,
    /// Retries per batch after the first failed write.
    pub flush_retries: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            batch_size: 100,
            flush_interval: Duration::from_millis(1000),
            flush_retries: 3,
        }
    }
}

/// Producer side of the pipeline. Cheap to clone.
#[derive(Clone)]
pub struct VisitRecorder {
    tx: mpsc::Sender<VisitEvent>,
    dropped: Arc<AtomicU64>,
}

impl VisitRecorder {
    /// Enqueues a visit without blocking.
    ///
    /// If the queue is full or the pipeline has shut down, the event is dropped
    /// and the drop counter is incremented.
    pub fn record(&self, event: VisitEvent) {
        if let Err(e) = self.tx.try_send(event) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("visits_dropped_total").increment(1);

            match e {
                mpsc::error::TrySendError::Full(ev) => {
                    debug!(code = %ev.code, "Visit queue full, dropping event");
                }
                mpsc::error::TrySendError::Closed(ev) => {
                    debug!(code = %ev.code, "Visit pipeline closed, dropping event");
                }
            }
        }
    }

    /// Number of events lost so far (queue overflow or failed flushes).
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of events currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owner handle for the background consumer.
pub struct VisitPipelineHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl VisitPipelineHandle {
    /// Stops accepting events, flushes everything already queued and waits for
    /// the consumer to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            error!("Visit pipeline task failed: {}", e);
        }
    }
}

pub struct VisitPipeline;

impl VisitPipeline {
    /// Spawns the consumer task on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `queue_capacity` or `batch_size` is zero, or if called outside
    /// a Tokio runtime.
    pub fn spawn(
        repository: Arc<dyn VisitRepository>,
        config: PipelineConfig,
    ) -> (VisitRecorder, VisitPipelineHandle) {
        assert!(config.queue_capacity > 0, "queue_capacity must be positive");
        assert!(config.batch_size > 0, "batch_size must be positive");

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let dropped = Arc::new(AtomicU64::new(0));

        let consumer = Consumer {
            repository,
            config,
            dropped: dropped.clone(),
        };
        let task = tokio::spawn(consumer.run(rx, shutdown_rx));

        (
            VisitRecorder { tx, dropped },
            VisitPipelineHandle {
                shutdown: shutdown_tx,
                task,
            },
        )
    }
}

struct Consumer {
    repository: Arc<dyn VisitRepository>,
    config: PipelineConfig,
    dropped: Arc<AtomicU64>,
}

impl Consumer {
    async fn run(self, mut rx: mpsc::Receiver<VisitEvent>, mut shutdown: oneshot::Receiver<()>) {
        info!(
            batch_size = self.config.batch_size,
            flush_interval_ms = self.config.flush_interval.as_millis() as u64,
            "Visit pipeline started"
        );

        let mut batch = Vec::with_capacity(self.config.batch_size);
        let mut ticker = time::interval(self.config.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        let mut listening_for_shutdown = true;

        loop {
            tokio::select! {
                biased;

                signal = &mut shutdown, if listening_for_shutdown => {
                    listening_for_shutdown = false;
                    // A dropped handle is not a shutdown request.
                    if signal.is_ok() {
                        debug!("Visit pipeline shutting down, draining queue");
                        rx.close();
                    }
                }

                received = rx.recv() => match received {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= self.config.batch_size {
                            self.flush(&mut batch).await;
                            ticker.reset();
                        }
                    }
                    None => break,
                },

                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        self.flush(&mut batch).await;
                    }
                }
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch).await;
        }

        info!(dropped = self.dropped.load(Ordering::Relaxed), "Visit pipeline stopped");
    }

    async fn flush(&self, batch: &mut Vec<VisitEvent>) {
        let events = std::mem::replace(batch, Vec::with_capacity(self.config.batch_size));
        let size = events.len();

        let strategy = ExponentialBackoff::from_millis(10)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(self.config.flush_retries);

        let result = Retry::start(strategy, || async {
            self.repository.record_batch(&events).await.inspect_err(|e| {
                warn!(batch_size = size, "Visit batch write failed, will retry: {}", e);
            })
        })
        .await;

        match result {
            Ok(written) => {
                metrics::counter!("visits_flushed_total").increment(written);
                debug!(batch_size = size, "Flushed visit batch");
            }
            Err(e) => {
                self.dropped.fetch_add(size as u64, Ordering::Relaxed);
                metrics::counter!("visits_dropped_total").increment(size as u64);
                error!(
                    batch_size = size,
                    retries = self.config.flush_retries,
                    "Dropping visit batch after retries: {}",
                    e
                );
            }
        }
    }
}
