//! Dispatch loop and worker pool.
//!
//! One dispatch task polls the queue on a fixed interval and feeds a bounded
//! intake channel; N workers drain it. The channel capacity equals the
//! worker count, so when every worker is busy the dispatch task blocks on
//! the hand-off and claim throughput throttles itself to worker
//! availability.
//!
//! Shutdown: `stop` flips a watch signal that ends the dispatch loop, which
//! drops the intake sender; workers finish whatever they hold, drain the
//! closed channel, and exit. `join` then waits for all of them. In-flight
//! work is never aborted.

pub mod work;

pub use self::work::ItemProcessor;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::domain::{QueueError, QueueItem};
use crate::queue::Queue;

/// Knobs for [`Engine::start`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the dispatch loop asks the queue for work.
    pub poll_interval: Duration,
    /// Number of workers, and the intake channel's capacity.
    pub concurrency: usize,
}

type SharedIntake = Arc<Mutex<mpsc::Receiver<QueueItem>>>;

/// Running dispatch/worker engine.
pub struct Engine {
    shutdown_tx: watch::Sender<bool>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Spawn the worker pool and the dispatch loop. Non-blocking.
    pub fn start(queue: Arc<dyn Queue>, processor: Arc<ItemProcessor>, config: EngineConfig) -> Self {
        let concurrency = config.concurrency.max(1);
        let (intake_tx, intake_rx) = mpsc::channel::<QueueItem>(concurrency);
        let intake_rx: SharedIntake = Arc::new(Mutex::new(intake_rx));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut workers = Vec::with_capacity(concurrency);
        for worker_id in 0..concurrency {
            info!(worker_id, "started worker");
            workers.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&intake_rx),
                Arc::clone(&queue),
                Arc::clone(&processor),
            )));
        }

        let dispatcher = tokio::spawn(dispatch_loop(
            queue,
            intake_tx,
            config.poll_interval,
            shutdown_rx,
        ));

        Self {
            shutdown_tx,
            dispatcher,
            workers,
        }
    }

    /// Ask the dispatch loop to stop claiming. In-flight items keep running.
    pub fn stop(&self) {
        // Receivers may already be gone; nothing to do then.
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for the dispatch loop and every worker to finish.
    pub async fn join(self) {
        let _ = self.dispatcher.await;
        for worker in self.workers {
            let _ = worker.await;
        }
    }

    /// Stop and wait.
    pub async fn shutdown_and_join(self) {
        self.stop();
        self.join().await;
    }
}

async fn dispatch_loop(
    queue: Arc<dyn Queue>,
    intake: mpsc::Sender<QueueItem>,
    poll_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    // A blocked hand-off can outlast a tick; do not try to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("stopping dispatch loop");
                    break;
                }
            }
            _ = ticker.tick() => {
                debug!("checking queue for new items");
                match queue.claim_next().await {
                    Ok(item) => {
                        // Blocks while all workers are busy. Send only fails
                        // when every worker is gone, and then there is no
                        // one left to dispatch to.
                        if intake.send(item).await.is_err() {
                            error!("intake channel closed, stopping dispatch loop");
                            break;
                        }
                    }
                    Err(QueueError::ClaimUnavailable) => {
                        debug!("did not get an item from queue");
                    }
                    Err(QueueError::ClaimConflict) => {
                        info!("lost claim race, waiting for next tick");
                    }
                    Err(err) => {
                        // Adapter trouble is logged and survived; the next
                        // tick tries again.
                        error!(error = %err, "claim failed");
                    }
                }
            }
        }
    }
    // `intake` drops here, closing the channel; workers drain it and exit.
}

async fn worker_loop(
    worker_id: usize,
    intake: SharedIntake,
    queue: Arc<dyn Queue>,
    processor: Arc<ItemProcessor>,
) {
    loop {
        let item = { intake.lock().await.recv().await };
        let Some(item) = item else {
            break;
        };

        info!(worker_id, id = %item.id, "processing item");
        match processor.process(&item).await {
            Ok(()) => match queue.complete(&item.id).await {
                Ok(()) => info!(worker_id, id = %item.id, "item processed and marked done"),
                Err(err) => error!(worker_id, id = %item.id, error = %err, "failed to mark item as done"),
            },
            Err(err) => {
                // No completion on failure: the item stays leased and comes
                // back whole once the lease expires.
                error!(worker_id, id = %item.id, error = %err, "failed to process item");
            }
        }
    }
    debug!(worker_id, "worker stopped");
}


#[cfg(test)]
mod tests {
    use super::testutil::FakeGateway;
    use super::*;
    use crate::domain::Payload;
    use crate::ports::{FixedClock, LeaseStore, MetadataStore};
    use crate::queue::LeaseQueue;
    use crate::store::memory::{InMemoryLeaseStore, InMemoryMetadataStore};
    use chrono::Utc;

    const HOUR: Duration = Duration::from_secs(3600);

    struct Harness {
        lease_store: Arc<InMemoryLeaseStore>,
        metadata_store: Arc<InMemoryMetadataStore>,
        queue: Arc<dyn Queue>,
        clock: FixedClock,
    }

    fn harness(gateway: Arc<FakeGateway>) -> (Harness, Engine) {
        let lease_store = Arc::new(InMemoryLeaseStore::new());
        let metadata_store = Arc::new(InMemoryMetadataStore::new());
        let clock = FixedClock::new(Utc::now());
        let queue: Arc<dyn Queue> = Arc::new(LeaseQueue::new(
            "ipfs",
            HOUR,
            Arc::clone(&lease_store),
            clock.clone(),
        ));
        let processor = Arc::new(ItemProcessor::new(gateway, metadata_store.clone()));
        let engine = Engine::start(
            Arc::clone(&queue),
            processor,
            EngineConfig {
                poll_interval: Duration::from_millis(10),
                concurrency: 2,
            },
        );
        (
            Harness {
                lease_store,
                metadata_store,
                queue,
                clock,
            },
            engine,
        )
    }

    async fn eventually(mut done: impl AsyncFnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if done().await {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn claims_processes_and_completes_an_item() {
        let (harness, engine) = harness(Arc::new(FakeGateway::default()));

        harness
            .queue
            .add_item(Payload::new(vec!["Qm1".to_string(), "Qm2".to_string()]))
            .await
            .unwrap();

        let store = harness.metadata_store.clone();
        let lease_store = harness.lease_store.clone();
        eventually(async || {
            store.scan("Qm").await.unwrap().len() == 2 && lease_store.is_empty().await
        })
        .await;

        assert_eq!(harness.metadata_store.read("Qm1").await.unwrap().id, "Qm1");
        engine.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn failed_item_stays_leased_until_expiry() {
        let gateway = Arc::new(FakeGateway::failing_on(&["QmBad"]));
        let (harness, engine) = harness(gateway.clone());

        let id = harness
            .queue
            .add_item(Payload::new(vec![
                "QmGood".to_string(),
                "QmBad".to_string(),
            ]))
            .await
            .unwrap();

        // The good sibling lands even though the item as a whole fails.
        let store = harness.metadata_store.clone();
        eventually(async || store.read("QmGood").await.is_ok()).await;

        let record = harness.lease_store.get(&id).await.unwrap().unwrap();
        assert!(record.locked, "failed item must keep its lease");
        assert!(matches!(
            harness.queue.claim_next().await,
            Err(QueueError::ClaimUnavailable)
        ));

        // After expiry the whole batch is claimable and retried; let the
        // gateway recover so the retry drains the item.
        gateway.heal("QmBad");
        harness
            .clock
            .advance(chrono::Duration::hours(1) + chrono::Duration::seconds(1));

        let lease_store = harness.lease_store.clone();
        let store = harness.metadata_store.clone();
        eventually(async || lease_store.is_empty().await && store.read("QmBad").await.is_ok())
            .await;

        // Retried QmGood overwrote itself, no duplicate record.
        assert_eq!(harness.metadata_store.scan("QmGood").await.unwrap().len(), 1);
        engine.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn shutdown_joins_all_workers() {
        let (_harness, engine) = harness(Arc::new(FakeGateway::default()));

        tokio::time::timeout(Duration::from_secs(5), engine.shutdown_and_join())
            .await
            .expect("engine did not shut down in time");
    }
}
