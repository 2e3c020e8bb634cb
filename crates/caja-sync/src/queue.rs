//! # Write Queue
//!
//! Single background worker that delivers mutations to the remote, in
//! order, one at a time, with a pause between deliveries.
//!
//! ## Queue Behavior
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Write Queue Flow                                  │
//! │                                                                         │
//! │  enqueue(m1) ──┐                                                        │
//! │  enqueue(m2) ──┼──► [ m1 | m2 | m3 ]  (unbounded, FIFO)                │
//! │  enqueue(m3) ──┘           │                                            │
//! │                            ▼                                            │
//! │                    ┌───────────────┐                                    │
//! │                    │ single worker │  one delivery in flight, ever     │
//! │                    └───────┬───────┘                                    │
//! │                            │                                            │
//! │              deliver ──► ok? ──► pacing sleep ──► next                 │
//! │                 │                                                       │
//! │                 └─ transient error ──► backoff, retry (max_attempts)   │
//! │                 │                                                       │
//! │                 └─ permanent error / retries exhausted                 │
//! │                        ──► log + drop, NEXT ITEM STILL RUNS            │
//! │                                                                         │
//! │  PACING                                                                 │
//! │  ──────                                                                 │
//! │  Sheet backends throttle rapid-fire writes. The worker sleeps          │
//! │  pacing_delay after every item so a checkout burst (sale + stock       │
//! │  updates + customer) stays under the limit.                            │
//! │                                                                         │
//! │  RETRY BACKOFF (Exponential)                                           │
//! │  Attempt 1 fails: wait 500ms                                           │
//! │  Attempt 2 fails: wait 1s                                              │
//! │  Attempt 3 fails: drop (default max_attempts = 3)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Enqueueing never waits for the network. Callers get `Ok` back as soon
//! as the mutation is in the channel; delivery succeeds or dies later
//! without them. On shutdown, undelivered items are discarded: every
//! mutation is already reflected in the local store and the next full
//! refresh reconciles with whatever the server actually recorded.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::QueueSettings;
use crate::error::{SyncError, SyncResult};
use crate::protocol::OutboundMutation;
use crate::service::{NoOpEvents, SyncEvents};

// =============================================================================
// Mutation Sender Trait
// =============================================================================

/// Delivery seam between the queue and the transport.
///
/// Production wires in [`RemoteClient`](crate::client::RemoteClient);
/// tests substitute recording fakes.
#[async_trait]
pub trait MutationSender: Send + Sync {
    /// Attempts to deliver one mutation.
    async fn deliver(&self, mutation: &OutboundMutation) -> SyncResult<()>;
}

// =============================================================================
// Queue Counters
// =============================================================================

/// Shared delivery counters, readable from any handle clone.
#[derive(Debug, Default)]
struct QueueCounters {
    /// Enqueued but not yet resolved (delivered or dropped).
    pending: AtomicUsize,

    /// Delivered successfully since the worker started.
    sent: AtomicU64,

    /// Dropped after exhausting retries or hitting a permanent error.
    dropped: AtomicU64,
}

// =============================================================================
// Write Queue Handle
// =============================================================================

/// Handle for enqueueing mutations and observing the worker.
///
/// Cheap to clone; all clones feed the same worker.
#[derive(Clone)]
pub struct WriteQueueHandle {
    queue_tx: mpsc::UnboundedSender<OutboundMutation>,
    shutdown_tx: mpsc::Sender<()>,
    counters: Arc<QueueCounters>,
}

impl WriteQueueHandle {
    /// Queues a mutation for delivery and returns immediately.
    ///
    /// Fails only when the worker has shut down.
    pub fn enqueue(&self, mutation: OutboundMutation) -> SyncResult<()> {
        debug!(mutation = %mutation.describe(), "Enqueueing mutation");
        self.queue_tx
            .send(mutation)
            .map_err(|_| SyncError::ChannelClosed)?;
        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Queues several mutations in order. Returns how many were accepted.
    ///
    /// Stops at the first failure; earlier items stay queued.
    pub fn enqueue_all<I>(&self, mutations: I) -> SyncResult<usize>
    where
        I: IntoIterator<Item = OutboundMutation>,
    {
        let mut accepted = 0;
        for mutation in mutations {
            self.enqueue(mutation)?;
            accepted += 1;
        }
        Ok(accepted)
    }

    /// Number of mutations waiting for or in delivery.
    pub fn pending(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    /// Number of mutations delivered successfully.
    pub fn sent(&self) -> u64 {
        self.counters.sent.load(Ordering::Relaxed)
    }

    /// Number of mutations dropped after failing delivery.
    pub fn dropped(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    /// Signals the worker to stop. Undelivered mutations are discarded.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

// =============================================================================
// Write Queue Worker
// =============================================================================

/// The background delivery worker. Constructed via [`WriteQueue::spawn`].
pub struct WriteQueue {
    sender: Arc<dyn MutationSender>,
    settings: QueueSettings,
    queue_rx: mpsc::UnboundedReceiver<OutboundMutation>,
    shutdown_rx: mpsc::Receiver<()>,
    counters: Arc<QueueCounters>,
    events: Arc<dyn SyncEvents>,
}

impl WriteQueue {
    /// Spawns the worker task and returns a handle to it.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let client = Arc::new(RemoteClient::new(&config.remote)?);
    /// let queue = WriteQueue::spawn(client, config.queue.clone());
    ///
    /// queue.enqueue(stock_update("p-1", 3))?;  // returns immediately
    /// ```
    pub fn spawn(sender: Arc<dyn MutationSender>, settings: QueueSettings) -> WriteQueueHandle {
        Self::spawn_with_events(sender, settings, Arc::new(NoOpEvents))
    }

    /// Spawns the worker with an event sink observing deliveries.
    pub fn spawn_with_events(
        sender: Arc<dyn MutationSender>,
        settings: QueueSettings,
        events: Arc<dyn SyncEvents>,
    ) -> WriteQueueHandle {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let counters = Arc::new(QueueCounters::default());

        let worker = WriteQueue {
            sender,
            settings,
            queue_rx,
            shutdown_rx,
            counters: counters.clone(),
            events,
        };
        tokio::spawn(worker.run());

        WriteQueueHandle {
            queue_tx,
            shutdown_tx,
            counters,
        }
    }

    /// Main worker loop. One delivery at a time, paced.
    async fn run(mut self) {
        info!(
            pacing_ms = self.settings.pacing_delay_ms,
            max_attempts = self.settings.max_attempts,
            "Write queue worker starting"
        );

        loop {
            tokio::select! {
                Some(mutation) = self.queue_rx.recv() => {
                    self.deliver_with_retry(&mutation).await;
                    self.counters.pending.fetch_sub(1, Ordering::SeqCst);

                    // Pace even after failures: the next item should not
                    // slam a backend that just pushed back
                    tokio::time::sleep(self.settings.pacing_delay()).await;
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Write queue worker shutting down");
                    break;
                }

                else => break,
            }
        }

        let abandoned = self.counters.pending.load(Ordering::SeqCst);
        if abandoned > 0 {
            warn!(abandoned, "Write queue stopped with undelivered mutations");
        }
        info!(
            sent = self.counters.sent.load(Ordering::Relaxed),
            dropped = self.counters.dropped.load(Ordering::Relaxed),
            "Write queue worker stopped"
        );
    }

    /// Delivers one mutation, retrying transient failures with backoff.
    ///
    /// A failure here never propagates: the mutation is either counted as
    /// sent or logged and counted as dropped, and the worker moves on.
    async fn deliver_with_retry(&self, mutation: &OutboundMutation) {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.settings.initial_backoff(),
            max_interval: self.settings.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        for attempt in 1..=self.settings.max_attempts {
            match self.sender.deliver(mutation).await {
                Ok(()) => {
                    debug!(
                        mutation = %mutation.describe(),
                        attempt,
                        "Mutation delivered"
                    );
                    self.counters.sent.fetch_add(1, Ordering::Relaxed);
                    self.events.mutation_sent(mutation);
                    return;
                }

                Err(e) if e.is_retryable() && attempt < self.settings.max_attempts => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or_else(|| self.settings.max_backoff());
                    warn!(
                        mutation = %mutation.describe(),
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Delivery failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }

                Err(e) => {
                    warn!(
                        mutation = %mutation.describe(),
                        correlation_id = %mutation.id,
                        attempt,
                        error = %e,
                        "Mutation dropped"
                    );
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    self.events.mutation_dropped(mutation, &e);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::stock_update;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Test double that records deliveries and fails on request.
    #[derive(Default)]
    struct RecordingSender {
        delivered: Mutex<Vec<String>>,
        attempts: AtomicUsize,
        /// Product ids that fail with a permanent error.
        reject: Vec<String>,
        /// Number of initial attempts that fail with a transient error.
        flaky_failures: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl RecordingSender {
        fn delivered_ids(&self) -> Vec<String> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MutationSender for RecordingSender {
        async fn deliver(&self, mutation: &OutboundMutation) -> SyncResult<()> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            // Give overlapping deliveries a window to be observed
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.attempts.fetch_add(1, Ordering::SeqCst);

            let id = mutation.data["id"].as_str().unwrap_or("").to_string();
            if self.reject.contains(&id) {
                return Err(SyncError::HttpStatus { status: 404 });
            }
            if self.flaky_failures.load(Ordering::SeqCst) > 0 {
                self.flaky_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(SyncError::RequestFailed("connection reset".into()));
            }

            self.delivered.lock().unwrap().push(id);
            Ok(())
        }
    }

    fn fast_settings() -> QueueSettings {
        QueueSettings {
            pacing_delay_ms: 1,
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_secs: 1,
        }
    }

    async fn wait_until_idle(handle: &WriteQueueHandle) {
        for _ in 0..500 {
            if handle.pending() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("queue did not drain");
    }

    #[tokio::test]
    async fn test_delivers_in_fifo_order() {
        let sender = Arc::new(RecordingSender::default());
        let queue = WriteQueue::spawn(sender.clone(), fast_settings());

        queue.enqueue(stock_update("1", 10)).unwrap();
        queue.enqueue(stock_update("2", 20)).unwrap();
        queue.enqueue(stock_update("3", 30)).unwrap();

        wait_until_idle(&queue).await;

        assert_eq!(sender.delivered_ids(), vec!["1", "2", "3"]);
        assert_eq!(queue.sent(), 3);
        assert_eq!(queue.dropped(), 0);
    }

    #[tokio::test]
    async fn test_failed_item_does_not_block_the_next() {
        let sender = Arc::new(RecordingSender {
            reject: vec!["2".to_string()],
            ..RecordingSender::default()
        });
        let queue = WriteQueue::spawn(sender.clone(), fast_settings());

        queue.enqueue(stock_update("1", 10)).unwrap();
        queue.enqueue(stock_update("2", 20)).unwrap();
        queue.enqueue(stock_update("3", 30)).unwrap();

        wait_until_idle(&queue).await;

        // Item 2 fails permanently; 1 and 3 still arrive, in order
        assert_eq!(sender.delivered_ids(), vec!["1", "3"]);
        assert_eq!(queue.sent(), 2);
        assert_eq!(queue.dropped(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_retries_then_succeeds() {
        let sender = Arc::new(RecordingSender {
            flaky_failures: AtomicUsize::new(1),
            ..RecordingSender::default()
        });
        let queue = WriteQueue::spawn(sender.clone(), fast_settings());

        queue.enqueue(stock_update("1", 10)).unwrap();
        wait_until_idle(&queue).await;

        assert_eq!(sender.delivered_ids(), vec!["1"]);
        assert_eq!(sender.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(queue.sent(), 1);
        assert_eq!(queue.dropped(), 0);
    }

    #[tokio::test]
    async fn test_permanent_failure_does_not_retry() {
        let sender = Arc::new(RecordingSender {
            reject: vec!["1".to_string()],
            ..RecordingSender::default()
        });
        let queue = WriteQueue::spawn(sender.clone(), fast_settings());

        queue.enqueue(stock_update("1", 10)).unwrap();
        wait_until_idle(&queue).await;

        // 404 is not retryable: exactly one attempt
        assert_eq!(sender.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(queue.dropped(), 1);
    }

    #[tokio::test]
    async fn test_retries_exhaust_then_drop() {
        let sender = Arc::new(RecordingSender {
            flaky_failures: AtomicUsize::new(10),
            ..RecordingSender::default()
        });
        let queue = WriteQueue::spawn(sender.clone(), fast_settings());

        queue.enqueue(stock_update("1", 10)).unwrap();
        wait_until_idle(&queue).await;

        assert_eq!(sender.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(queue.sent(), 0);
        assert_eq!(queue.dropped(), 1);
    }

    #[tokio::test]
    async fn test_single_delivery_in_flight() {
        let sender = Arc::new(RecordingSender::default());
        let queue = WriteQueue::spawn(sender.clone(), fast_settings());

        for i in 0..8 {
            queue.enqueue(stock_update(&i.to_string(), i)).unwrap();
        }
        wait_until_idle(&queue).await;

        assert_eq!(sender.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(queue.sent(), 8);
    }

    #[tokio::test]
    async fn test_enqueue_fails_after_shutdown() {
        let sender = Arc::new(RecordingSender::default());
        let queue = WriteQueue::spawn(sender, fast_settings());

        queue.shutdown().await;

        // Worker exit is asynchronous; poll until the channel closes
        let mut closed = false;
        for _ in 0..200 {
            if queue.enqueue(stock_update("1", 1)).is_err() {
                closed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(closed, "queue should reject enqueues after shutdown");
    }

    /// Event sink that counts delivery outcomes.
    #[derive(Default)]
    struct CountingEvents {
        sent: AtomicUsize,
        dropped: AtomicUsize,
    }

    impl SyncEvents for CountingEvents {
        fn mutation_sent(&self, _mutation: &OutboundMutation) {
            self.sent.fetch_add(1, Ordering::SeqCst);
        }

        fn mutation_dropped(&self, _mutation: &OutboundMutation, _error: &SyncError) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_event_sink_sees_each_outcome() {
        let sender = Arc::new(RecordingSender {
            reject: vec!["2".to_string()],
            ..RecordingSender::default()
        });
        let events = Arc::new(CountingEvents::default());
        let queue = WriteQueue::spawn_with_events(sender, fast_settings(), events.clone());

        queue.enqueue(stock_update("1", 10)).unwrap();
        queue.enqueue(stock_update("2", 20)).unwrap();
        queue.enqueue(stock_update("3", 30)).unwrap();
        wait_until_idle(&queue).await;

        assert_eq!(events.sent.load(Ordering::SeqCst), 2);
        assert_eq!(events.dropped.load(Ordering::SeqCst), 1);
    }

    /// Records the clock reading of each delivery; never fails, never sleeps.
    #[derive(Default)]
    struct TimestampingSender {
        timestamps: Mutex<Vec<tokio::time::Instant>>,
    }

    #[async_trait]
    impl MutationSender for TimestampingSender {
        async fn deliver(&self, _mutation: &OutboundMutation) -> SyncResult<()> {
            self.timestamps
                .lock()
                .unwrap()
                .push(tokio::time::Instant::now());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_spaces_out_deliveries() {
        let sender = Arc::new(TimestampingSender::default());
        let settings = QueueSettings {
            pacing_delay_ms: 200,
            max_attempts: 1,
            initial_backoff_ms: 1,
            max_backoff_secs: 1,
        };
        let queue = WriteQueue::spawn(sender.clone(), settings);

        queue.enqueue(stock_update("1", 10)).unwrap();
        queue.enqueue(stock_update("2", 20)).unwrap();
        wait_until_idle(&queue).await;

        let times = sender.timestamps.lock().unwrap().clone();
        assert_eq!(times.len(), 2);
        assert!(
            times[1] - times[0] >= Duration::from_millis(200),
            "second delivery arrived {}ms after the first",
            (times[1] - times[0]).as_millis()
        );
    }
}
