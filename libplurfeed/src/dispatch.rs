//! Async dispatch for engine operations
//!
//! Engine operations block on network I/O, so the [`Dispatcher`] runs each
//! one on a blocking worker and hands the caller a [`DispatchHandle`] right
//! away. At most `workers` operations run at once; the rest wait for a free
//! slot without holding anything up.
//!
//! Results come back in one of two ways:
//!
//! - await the handle (or call [`DispatchHandle::blocking_wait`] from a
//!   plain thread)
//! - register a callback with [`DispatchHandle::on_complete`]; it is queued
//!   on a caller-owned [`CompletionQueue`] and runs only when the caller
//!   drains that queue, never on a worker
//!
//! Only failures of the dispatch mechanism surface as [`DispatchError`].
//! Platform failures are already folded into the operation's return value by
//! the engine.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use libplurfeed::dispatch::{CompletionQueue, Dispatcher};
//! use libplurfeed::engine::AggregationEngine;
//! use libplurfeed::registry::AdapterRegistry;
//!
//! # #[tokio::main]
//! # async fn main() -> libplurfeed::error::Result<()> {
//! let engine = Arc::new(AggregationEngine::new(Arc::new(AdapterRegistry::new())));
//! let dispatcher = Dispatcher::new(engine, 4)?;
//!
//! // Future form
//! let feed = dispatcher.fetch_aggregated_feed(20).await?;
//! assert!(feed.is_empty());
//!
//! // Callback form
//! let mut queue = CompletionQueue::new();
//! dispatcher
//!     .fetch_aggregated_feed(20)
//!     .on_complete(&queue.sender(), |result| {
//!         println!("{} posts", result.map(|posts| posts.len()).unwrap_or(0));
//!     });
//! queue.run_next().await;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, info, warn};

use crate::engine::{AggregationEngine, AggregationReport};
use crate::error::{panic_message, DispatchError};
use crate::types::{CredentialMaterial, InteractionData, PlatformId, UnifiedPost};

type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Bounded worker pool in front of an [`AggregationEngine`]
pub struct Dispatcher {
    engine: Arc<AggregationEngine>,
    permits: Arc<Semaphore>,
    workers: usize,
    runtime: Handle,
}

impl Dispatcher {
    /// Create a dispatcher on the current tokio runtime
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::NoRuntime` when called outside a runtime; use
    /// [`with_handle`](Self::with_handle) from plain threads.
    pub fn new(engine: Arc<AggregationEngine>, workers: usize) -> DispatchResult<Self> {
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        Ok(Self::with_handle(engine, workers, runtime))
    }

    /// Create a dispatcher that schedules work on `runtime`
    pub fn with_handle(engine: Arc<AggregationEngine>, workers: usize, runtime: Handle) -> Self {
        let workers = workers.max(1);
        info!("Starting dispatcher with {} workers", workers);

        Self {
            engine,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            runtime,
        }
    }

    pub fn engine(&self) -> &Arc<AggregationEngine> {
        &self.engine
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Workers not currently running an operation
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Stop accepting work
    ///
    /// Operations already running complete and deliver normally; queued and
    /// later submissions resolve to `DispatchError::PoolClosed`.
    pub fn shutdown(&self) {
        if !self.permits.is_closed() {
            info!("Shutting down dispatcher");
            self.permits.close();
        }
    }

    /// Run `operation` against the engine on a worker
    ///
    /// Returns immediately. The operation starts once a worker is free.
    pub fn submit<T, F>(&self, operation: F) -> DispatchHandle<T>
    where
        F: FnOnce(&AggregationEngine) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let handle = DispatchHandle {
            receiver,
            runtime: self.runtime.clone(),
        };

        if self.permits.is_closed() {
            let _ = sender.send(Err(DispatchError::PoolClosed));
            return handle;
        }

        let engine = Arc::clone(&self.engine);
        let permits = Arc::clone(&self.permits);

        self.runtime.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(permit) => {
                    let joined = tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        operation(engine.as_ref())
                    })
                    .await;

                    joined.map_err(|e| {
                        if e.is_panic() {
                            let message = panic_message(&*e.into_panic());
                            warn!("Dispatched operation panicked: {}", message);
                            DispatchError::WorkerPanicked(message)
                        } else {
                            DispatchError::ResultDropped
                        }
                    })
                }
                Err(_) => Err(DispatchError::PoolClosed),
            };

            if sender.send(outcome).is_err() {
                debug!("Dispatch result discarded; handle was dropped");
            }
        });

        handle
    }

    pub fn fetch_aggregated_feed(&self, limit: usize) -> DispatchHandle<Vec<UnifiedPost>> {
        self.submit(move |engine| engine.fetch_aggregated_feed(limit))
    }

    /// Aggregated feed at the engine's default limit
    pub fn fetch_default_feed(&self) -> DispatchHandle<Vec<UnifiedPost>> {
        self.submit(|engine| engine.fetch_default_feed())
    }

    pub fn fetch_aggregated_report(&self, limit: usize) -> DispatchHandle<AggregationReport> {
        self.submit(move |engine| engine.fetch_aggregated_report(limit))
    }

    pub fn fetch_platform_feed(
        &self,
        platform: PlatformId,
        limit: usize,
    ) -> DispatchHandle<Vec<UnifiedPost>> {
        self.submit(move |engine| engine.fetch_platform_feed(platform, limit))
    }

    pub fn post_to_multiple_platforms(
        &self,
        content: impl Into<String>,
        media: Vec<String>,
        platforms: Vec<PlatformId>,
    ) -> DispatchHandle<BTreeMap<PlatformId, bool>> {
        let content = content.into();
        self.submit(move |engine| engine.post_to_multiple_platforms(&content, &media, &platforms))
    }

    pub fn authenticate_platform(
        &self,
        platform: PlatformId,
        material: CredentialMaterial,
    ) -> DispatchHandle<bool> {
        self.submit(move |engine| engine.authenticate_platform(platform, &material))
    }

    pub fn perform_social_interaction(
        &self,
        post: UnifiedPost,
        kind: impl Into<String>,
        data: InteractionData,
    ) -> DispatchHandle<bool> {
        let kind = kind.into();
        self.submit(move |engine| engine.perform_social_interaction(&post, &kind, &data))
    }
}

/// Pending result of a dispatched operation
///
/// Resolves exactly once, after the operation has fully completed.
#[must_use = "dropping a DispatchHandle discards the operation's result"]
pub struct DispatchHandle<T> {
    receiver: oneshot::Receiver<DispatchResult<T>>,
    runtime: Handle,
}

impl<T: Send + 'static> DispatchHandle<T> {
    /// Block the current thread until the result arrives
    ///
    /// # Panics
    ///
    /// Panics if called from within an async context.
    pub fn blocking_wait(self) -> DispatchResult<T> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(DispatchError::ResultDropped))
    }

    /// Queue `callback` on `completions` once the result arrives
    ///
    /// The callback runs when the owner of the [`CompletionQueue`] drains it.
    pub fn on_complete<C>(self, completions: &CompletionSender, callback: C)
    where
        C: FnOnce(DispatchResult<T>) + Send + 'static,
    {
        let completions = completions.clone();
        let runtime = self.runtime.clone();

        runtime.spawn(async move {
            let outcome = self.await;
            if completions.deliver(move || callback(outcome)).is_err() {
                warn!("Completion queue is gone; dropping dispatch result");
            }
        });
    }
}

impl<T> Future for DispatchHandle<T> {
    type Output = DispatchResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(DispatchError::ResultDropped)))
    }
}

type Completion = Box<dyn FnOnce() + Send>;

/// Caller-owned queue of finished callbacks
///
/// Whoever owns the queue decides which thread callbacks run on by choosing
/// where to drain it.
pub struct CompletionQueue {
    sender: mpsc::UnboundedSender<Completion>,
    receiver: mpsc::UnboundedReceiver<Completion>,
}

impl CompletionQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> CompletionSender {
        CompletionSender {
            sender: self.sender.clone(),
        }
    }

    /// Run every callback that is ready, without waiting
    ///
    /// Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(callback) = self.receiver.try_recv() {
            callback();
            ran += 1;
        }
        ran
    }

    /// Wait for the next callback and run it
    pub async fn run_next(&mut self) {
        if let Some(callback) = self.receiver.recv().await {
            callback();
        }
    }

    /// Block the current thread until the next callback arrives, then run it
    ///
    /// # Panics
    ///
    /// Panics if called from within an async context.
    pub fn blocking_run_next(&mut self) {
        if let Some(callback) = self.receiver.blocking_recv() {
            callback();
        }
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for posting callbacks onto a [`CompletionQueue`]
#[derive(Clone)]
pub struct CompletionSender {
    sender: mpsc::UnboundedSender<Completion>,
}

impl CompletionSender {
    /// Queue `callback` for the queue's owner to run
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::CallbackUndeliverable` if the queue has been
    /// dropped.
    pub fn deliver<F>(&self, callback: F) -> DispatchResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(Box::new(callback))
            .map_err(|_| DispatchError::CallbackUndeliverable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::mock::{sample_posts, MockAdapter};
    use crate::registry::AdapterRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};
    use std::time::{Duration, Instant};

    fn engine_with(adapters: Vec<MockAdapter>) -> Arc<AggregationEngine> {
        let registry = Arc::new(AdapterRegistry::new());
        for adapter in adapters {
            registry.register_adapter(Arc::new(adapter)).unwrap();
        }
        Arc::new(AggregationEngine::new(registry))
    }

    #[tokio::test]
    async fn test_future_resolves_with_engine_result() {
        let engine = engine_with(vec![MockAdapter::with_posts(
            PlatformId::Mastodon,
            sample_posts(PlatformId::Mastodon, 3, 1_000, 10),
        )]);
        let dispatcher = Dispatcher::new(engine, 2).unwrap();

        let feed = dispatcher.fetch_aggregated_feed(10).await.unwrap();
        assert_eq!(feed.len(), 3);

        let empty = dispatcher
            .fetch_platform_feed(PlatformId::YouTube, 10)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_callback_runs_on_draining_thread_not_worker() {
        let dispatcher = Dispatcher::new(engine_with(vec![]), 2).unwrap();
        let mut queue = CompletionQueue::new();

        let worker_thread: Arc<Mutex<Option<ThreadId>>> = Arc::new(Mutex::new(None));
        let callback_thread: Arc<Mutex<Option<ThreadId>>> = Arc::new(Mutex::new(None));

        let worker = Arc::clone(&worker_thread);
        let seen = Arc::clone(&callback_thread);
        dispatcher
            .submit(move |_| {
                *worker.lock().unwrap() = Some(thread::current().id());
                7
            })
            .on_complete(&queue.sender(), move |result| {
                assert_eq!(result, Ok(7));
                *seen.lock().unwrap() = Some(thread::current().id());
            });

        queue.run_next().await;

        let callback_thread = callback_thread.lock().unwrap().unwrap();
        assert_eq!(callback_thread, thread::current().id());
        assert_ne!(Some(callback_thread), *worker_thread.lock().unwrap());
    }

    #[tokio::test]
    async fn test_callbacks_wait_for_caller_to_drain() {
        let dispatcher = Dispatcher::new(engine_with(vec![]), 2).unwrap();
        let mut queue = CompletionQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ran);
        let handle = dispatcher.authenticate_platform(PlatformId::Bluesky, CredentialMaterial::new());
        handle.on_complete(&queue.sender(), move |result| {
            assert_eq!(result, Ok(false));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        assert_eq!(queue.run_pending(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(queue.run_pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_bounds_concurrency() {
        let dispatcher = Dispatcher::new(engine_with(vec![]), 2).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                dispatcher.submit(move |_| {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(dispatcher.idle_workers(), 2);
    }

    #[tokio::test]
    async fn test_submit_does_not_block_caller() {
        let engine = engine_with(vec![MockAdapter::with_delay(
            PlatformId::Bluesky,
            Vec::new(),
            Duration::from_millis(200),
        )]);
        let dispatcher = Dispatcher::new(engine, 1).unwrap();

        let start = Instant::now();
        let first = dispatcher.fetch_aggregated_feed(5);
        let second = dispatcher.fetch_aggregated_feed(5);
        assert!(start.elapsed() < Duration::from_millis(200));

        assert!(first.await.unwrap().is_empty());
        assert!(second.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_work() {
        let dispatcher = Dispatcher::new(engine_with(vec![]), 1).unwrap();
        dispatcher.shutdown();

        assert!(dispatcher.is_closed());
        assert_eq!(
            dispatcher.fetch_aggregated_feed(5).await,
            Err(DispatchError::PoolClosed)
        );
    }

    #[tokio::test]
    async fn test_worker_panic_is_dispatch_error() {
        let dispatcher = Dispatcher::new(engine_with(vec![]), 1).unwrap();

        let result = dispatcher
            .submit(|_| -> usize { panic!("operation blew up") })
            .await;
        assert_eq!(
            result,
            Err(DispatchError::WorkerPanicked("operation blew up".to_string()))
        );

        // The pool keeps working afterwards
        assert_eq!(dispatcher.submit(|_| 1).await, Ok(1));
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let result = Dispatcher::new(engine_with(vec![]), 1);
        assert!(matches!(result, Err(DispatchError::NoRuntime)));
    }

    #[test]
    fn test_plain_thread_caller_with_handle() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let engine = engine_with(vec![MockAdapter::with_posts(
            PlatformId::TikTok,
            sample_posts(PlatformId::TikTok, 2, 1_000, 10),
        )]);
        let dispatcher = Dispatcher::with_handle(engine, 2, runtime.handle().clone());

        let feed = dispatcher.fetch_aggregated_feed(5).blocking_wait().unwrap();
        assert_eq!(feed.len(), 2);

        let mut queue = CompletionQueue::new();
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);
        dispatcher
            .post_to_multiple_platforms("hi", Vec::new(), vec![PlatformId::TikTok])
            .on_complete(&queue.sender(), move |result| {
                sink.lock().unwrap().push(result.unwrap());
            });

        queue.blocking_run_next();
        let results = results.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get(&PlatformId::TikTok), Some(&true));
    }

    #[test]
    fn test_deliver_to_dropped_queue_fails() {
        let queue = CompletionQueue::new();
        let sender = queue.sender();
        drop(queue);

        assert_eq!(sender.deliver(|| {}), Err(DispatchError::CallbackUndeliverable));
    }
}
