//! Typed bounded task queues
//!
//! Each queue is an `mpsc` channel drained by one worker task, so tasks on a
//! queue run one at a time in FIFO order while different queues run
//! concurrently. A semaphore sized to the queue capacity gives `put` its
//! backpressure. All queues of a fabric share one [`InFlight`] counter,
//! which is what [`InFlight::idle`] waits on.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::error::RuntimeError;
use crate::infra::install::MessageSink;

/// Count of queued plus running tasks across a fabric
#[derive(Debug, Clone)]
pub struct InFlight {
    count: watch::Sender<usize>,
}

impl InFlight {
    /// Create a counter at zero
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self { count }
    }

    /// Current number of tasks
    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    fn enter(&self) {
        self.count.send_modify(|c| *c += 1);
    }

    fn exit(&self) {
        self.count.send_modify(|c| *c = c.saturating_sub(1));
    }

    /// Wait until no task is queued or running
    pub async fn idle(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|c| *c == 0).await;
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

/// A task plus the capacity slot it occupies while waiting
///
/// Tasks enqueued past capacity by [`QueueSender::put_nowait`] carry no slot.
type Slot<T> = (T, Option<OwnedSemaphorePermit>);

/// Producer side of a queue
///
/// Every task goes through one unbounded channel in call order, so a queue
/// stays FIFO no matter how it was fed. Capacity is enforced by a semaphore
/// that [`put`](Self::put) waits on.
#[derive(Debug)]
pub struct QueueSender<T> {
    name: &'static str,
    tx: mpsc::UnboundedSender<Slot<T>>,
    permits: Arc<Semaphore>,
    in_flight: InFlight,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
            permits: Arc::clone(&self.permits),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<T: Send + 'static> QueueSender<T> {
    /// Queue name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Enqueue a task, waiting while the queue is full
    ///
    /// Cancelling the wait leaves nothing queued or counted.
    pub async fn put(&self, task: T) -> Result<(), RuntimeError> {
        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            return Err(self.closed());
        };
        self.in_flight.enter();
        if self.tx.send((task, Some(permit))).is_err() {
            self.in_flight.exit();
            return Err(self.closed());
        }
        Ok(())
    }

    /// Enqueue from synchronous code or from a queue's own worker
    ///
    /// Never waits. A full queue takes the task anyway, behind everything
    /// already queued. Callers are workers posting install messages (one
    /// per 10% of progress plus the start and end lines of a download) and
    /// missing-tool requests (one per tool of a platform), so the overshoot
    /// is bounded by the work in flight.
    pub fn put_nowait(&self, task: T) {
        self.in_flight.enter();
        let permit = Arc::clone(&self.permits).try_acquire_owned().ok();
        if self.tx.send((task, permit)).is_err() {
            tracing::warn!("Queue '{}' closed, task dropped", self.name);
            self.in_flight.exit();
        }
    }

    fn closed(&self) -> RuntimeError {
        RuntimeError::QueueClosed {
            queue: self.name.to_string(),
        }
    }
}

impl MessageSink for QueueSender<String> {
    fn send(&self, message: String) {
        self.put_nowait(message);
    }
}

/// A queue whose worker has not started yet
///
/// Splitting creation from start lets handlers hold senders of any queue,
/// including their own.
#[derive(Debug)]
pub struct PendingQueue<T> {
    sender: QueueSender<T>,
    rx: mpsc::UnboundedReceiver<Slot<T>>,
}

/// Create a queue with the given capacity
pub fn queue<T: Send + 'static>(
    name: &'static str,
    capacity: usize,
    in_flight: &InFlight,
) -> PendingQueue<T> {
    let (tx, rx) = mpsc::unbounded_channel();
    PendingQueue {
        sender: QueueSender {
            name,
            tx,
            permits: Arc::new(Semaphore::new(capacity.max(1))),
            in_flight: in_flight.clone(),
        },
        rx,
    }
}

impl<T: Send + 'static> PendingQueue<T> {
    /// Producer handle
    pub fn sender(&self) -> QueueSender<T> {
        self.sender.clone()
    }

    /// Start the worker running `handler` for each task in order
    ///
    /// A panicking task is logged and does not stop the worker.
    pub fn start<F, Fut>(self, mut handler: F) -> TaskQueue<T>
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Self { sender, mut rx } = self;
        let name = sender.name;
        let in_flight = sender.in_flight.clone();

        let worker = tokio::spawn(async move {
            while let Some((task, permit)) = rx.recv().await {
                // Dequeued tasks no longer count against capacity
                drop(permit);
                if AssertUnwindSafe(handler(task)).catch_unwind().await.is_err() {
                    tracing::error!("Task on queue '{name}' panicked");
                }
                in_flight.exit();
            }
            tracing::debug!("Queue '{name}' worker finished");
        });

        TaskQueue { sender, worker }
    }
}

/// A running queue
#[derive(Debug)]
pub struct TaskQueue<T> {
    sender: QueueSender<T>,
    worker: JoinHandle<()>,
}

impl<T: Send + 'static> TaskQueue<T> {
    /// Producer handle
    pub fn sender(&self) -> QueueSender<T> {
        self.sender.clone()
    }

    /// Enqueue a task
    pub async fn put(&self, task: T) -> Result<(), RuntimeError> {
        self.sender.put(task).await
    }

    /// Abort the worker; queued tasks are discarded
    pub fn stop(&self) {
        self.sender.permits.close();
        self.worker.abort();
    }

    /// Whether the worker has exited
    pub fn is_stopped(&self) -> bool {
        self.worker.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_and_idle() {
        let in_flight = InFlight::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let queue = queue::<u32>("numbers", 2, &in_flight).start(move |n| {
            let sink = Arc::clone(&sink);
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                sink.lock().unwrap().push(n);
            }
        });

        for n in 0..5 {
            queue.put(n).await.unwrap();
        }
        in_flight.idle().await;

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(in_flight.count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_put_nowait_burst_keeps_order() {
        let in_flight = InFlight::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let queue = queue::<u32>("burst", 1, &in_flight).start(move |n| {
            let sink = Arc::clone(&sink);
            async move {
                tokio::task::yield_now().await;
                sink.lock().unwrap().push(n);
            }
        });
        let sender = queue.sender();

        for n in 0..200 {
            sender.put_nowait(n);
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
        for n in 200..210 {
            sender.put_nowait(n);
        }
        queue.put(210).await.unwrap();
        in_flight.idle().await;

        assert_eq!(*seen.lock().unwrap(), (0..=210).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_put_waits_for_capacity() {
        let in_flight = InFlight::new();
        let (release, gate) = tokio::sync::watch::channel(false);
        let queue = queue::<u32>("gated", 1, &in_flight).start(move |_| {
            let mut gate = gate.clone();
            async move {
                let _ = gate.wait_for(|open| *open).await;
            }
        });

        // First task runs and blocks, second fills the only slot
        queue.put(0).await.unwrap();
        queue.put(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let third = tokio::time::timeout(Duration::from_millis(50), queue.put(2)).await;
        assert!(third.is_err());

        release.send(true).unwrap();
        queue.put(3).await.unwrap();
        in_flight.idle().await;
        assert_eq!(in_flight.count(), 0);
    }

    #[tokio::test]
    async fn test_handler_can_enqueue_on_own_queue() {
        let in_flight = InFlight::new();
        let pending = queue::<u32>("countdown", 4, &in_flight);
        let again = pending.sender();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let queue = pending.start(move |n| {
            let again = again.clone();
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(n);
                if n > 0 {
                    again.put(n - 1).await.unwrap();
                }
            }
        });

        queue.put(3).await.unwrap();
        in_flight.idle().await;
        assert_eq!(*seen.lock().unwrap(), vec![3, 2, 1, 0]);
    }

    #[tokio::test]
    async fn test_panic_does_not_stop_worker() {
        let in_flight = InFlight::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let queue = queue::<u32>("fragile", 4, &in_flight).start(move |n| {
            let sink = Arc::clone(&sink);
            async move {
                assert!(n != 1, "boom");
                sink.lock().unwrap().push(n);
            }
        });

        for n in 0..3 {
            queue.put(n).await.unwrap();
        }
        in_flight.idle().await;
        assert_eq!(*seen.lock().unwrap(), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_stop_closes_queue() {
        let in_flight = InFlight::new();
        let queue = queue::<u32>("stopped", 1, &in_flight).start(|_| async {});
        queue.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(queue.is_stopped());
        let err = queue.put(1).await.unwrap_err();
        assert!(matches!(err, RuntimeError::QueueClosed { .. }));
        assert_eq!(in_flight.count(), 0);
    }
}
