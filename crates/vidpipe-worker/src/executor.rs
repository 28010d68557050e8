//! The worker poll loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vidpipe_queue::{Delivery, QueueResult};

use crate::config::WorkerConfig;
use crate::context::{MessageSink, ProcessingContext, QueueDriver};
use crate::error::WorkerResult;
use crate::handler;
use crate::metrics;

/// Executor driving the receive/dispatch loop.
///
/// In-flight pipelines are bounded by a semaphore; when every permit is
/// taken the loop stops receiving instead of stacking batches, so
/// back-pressure reaches the queue rather than local memory.
pub struct WorkerExecutor<Q: QueueDriver + 'static> {
    config: WorkerConfig,
    queue: Arc<Q>,
    ctx: Arc<ProcessingContext>,
    permits: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl<Q: QueueDriver + 'static> WorkerExecutor<Q> {
    /// Create a new executor.
    pub fn new(config: WorkerConfig, queue: Q, ctx: ProcessingContext) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            ctx: Arc::new(ctx),
            permits,
            shutdown,
            consumer_name,
        }
    }

    /// Run the loop until shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            consumer = %self.consumer_name,
            max_concurrent = self.config.max_concurrent,
            "Starting worker executor"
        );

        self.queue.init().await?;

        let claim_task = self.spawn_claim_task();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                _ = self.poll_once() => {}
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight messages to complete");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_inflight()).await;

        info!("Worker executor stopped");
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// One loop iteration: receive a batch sized to the free permits and
    /// dispatch each delivery to its own task.
    async fn poll_once(&self) {
        if self.permits.available_permits() == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return;
        }

        let start = Instant::now();
        let result = self.receive_batch().await;
        metrics::record_poll(start.elapsed().as_secs_f64());

        match result {
            Ok(deliveries) if deliveries.is_empty() => {
                tokio::time::sleep(self.config.idle_delay).await;
            }
            Ok(deliveries) => {
                debug!(count = deliveries.len(), "Received messages");
                self.dispatch(deliveries).await;
            }
            Err(e) => {
                error!("Failed to receive messages: {}", e);
                metrics::record_poll_error();
                tokio::time::sleep(self.config.idle_delay).await;
            }
        }
    }

    async fn receive_batch(&self) -> QueueResult<Vec<Delivery>> {
        let count = self
            .permits
            .available_permits()
            .min(self.config.batch_size);
        self.queue
            .receive(
                &self.consumer_name,
                self.config.receive_block.as_millis() as u64,
                count,
            )
            .await
    }

    /// Dispatch deliveries without waiting for their pipelines; the next
    /// iteration starts as soon as every delivery holds a permit.
    async fn dispatch(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let ctx = Arc::clone(&self.ctx);
            let sink: Arc<dyn MessageSink> = Arc::clone(&self.queue) as Arc<dyn MessageSink>;
            let cancel = self.shutdown.subscribe();

            tokio::spawn(async move {
                let _permit = permit;
                handler::handle_message(ctx, sink, delivery, cancel).await;
            });
        }
    }

    /// Periodically claim messages stuck pending past the visibility
    /// timeout (crashed or hung consumers) and feed them through the same
    /// bounded dispatch.
    fn spawn_claim_task(&self) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let ctx = Arc::clone(&self.ctx);
        let permits = Arc::clone(&self.permits);
        let shutdown = self.shutdown.clone();
        let mut shutdown_rx = self.shutdown.subscribe();
        let consumer_name = self.consumer_name.clone();
        let claim_interval = self.config.claim_interval;
        let batch_size = self.config.batch_size;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match queue.claim_pending(&consumer_name, batch_size).await {
                            Ok(deliveries) if !deliveries.is_empty() => {
                                info!(count = deliveries.len(), "Claimed pending messages");
                                for delivery in deliveries {
                                    let permit = match Arc::clone(&permits).acquire_owned().await {
                                        Ok(permit) => permit,
                                        Err(_) => return,
                                    };
                                    let ctx = Arc::clone(&ctx);
                                    let sink: Arc<dyn MessageSink> =
                                        Arc::clone(&queue) as Arc<dyn MessageSink>;
                                    let cancel = shutdown.subscribe();

                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        handler::handle_message(ctx, sink, delivery, cancel).await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("Failed to claim pending messages: {}", e);
                            }
                        }
                    }
                }
            }
        })
    }

    /// Wait for every permit to return.
    async fn wait_for_inflight(&self) {
        loop {
            if self.permits.available_permits() == self.config.max_concurrent {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeQueueDriver, TestHarness};

    fn executor_over(
        harness: &TestHarness,
        driver: FakeQueueDriver,
    ) -> Arc<WorkerExecutor<FakeQueueDriver>> {
        let config = harness.ctx.config.clone();
        let ctx = ProcessingContext {
            config: config.clone(),
            storage: Arc::clone(&harness.ctx.storage),
            metadata: Arc::clone(&harness.ctx.metadata),
            transcoder: Arc::clone(&harness.ctx.transcoder),
            analyzer: Arc::clone(&harness.ctx.analyzer),
        };
        Arc::new(WorkerExecutor::new(config, driver, ctx))
    }

    async fn run_until_shutdown(executor: Arc<WorkerExecutor<FakeQueueDriver>>) {
        let run = {
            let executor = Arc::clone(&executor);
            tokio::spawn(async move { executor.run().await })
        };
        // Give the loop a few iterations; the paused clock auto-advances
        // through the idle delays.
        tokio::time::sleep(Duration::from_secs(60)).await;
        executor.shutdown();
        run.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn empty_receive_idles_and_dispatches_nothing() {
        let harness = TestHarness::new();
        let driver = FakeQueueDriver::new(Arc::clone(&harness.sink));

        let executor = executor_over(&harness, driver.clone());
        run_until_shutdown(executor).await;

        assert!(driver.receive_calls() > 1);
        assert!(harness.sink.acks().is_empty());
        assert!(harness.storage.downloads().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn receive_error_does_not_stop_the_loop() {
        let harness = TestHarness::new();
        let driver = FakeQueueDriver::new(Arc::clone(&harness.sink));
        driver.push_error("connection reset");

        let executor = executor_over(&harness, driver.clone());
        run_until_shutdown(executor).await;

        // The loop kept polling after the failed receive.
        assert!(driver.receive_calls() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn received_batch_is_processed_and_acked() {
        let harness = TestHarness::new();
        harness.storage.insert_object("v1-a.mp4", b"bytes");
        harness.storage.insert_object("v2-b.mp4", b"bytes");

        let driver = FakeQueueDriver::new(Arc::clone(&harness.sink));
        driver.push_batch(vec![
            harness.delivery("v1", "v1-a.mp4"),
            harness.delivery("v2", "v2-b.mp4"),
        ]);

        let executor = executor_over(&harness, driver.clone());
        run_until_shutdown(executor).await;

        assert_eq!(harness.sink.acks().len(), 2);
        assert!(harness.metadata.record("v1").is_some());
        assert!(harness.metadata.record("v2").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn receive_count_never_exceeds_free_permits() {
        let harness = TestHarness::new();
        let driver = FakeQueueDriver::new(Arc::clone(&harness.sink));

        let executor = executor_over(&harness, driver.clone());
        run_until_shutdown(executor).await;

        let config = WorkerConfig::default();
        for count in driver.receive_counts() {
            assert!(count <= config.batch_size);
        }
    }
}
