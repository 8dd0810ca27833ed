//! Cancellable handles for long-lived listeners: the position watch and the
//! shared record listener. Both release their resources on every exit path,
//! including a plain drop.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::Receiver;
use tokio::task::JoinHandle;

/// A spawned listener task. Dropping or stopping the handle deactivates it
/// and aborts the task.
#[derive(Debug)]
pub struct ListenerHandle {
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Spawns `listener` with the shared activity flag. Listeners check the
    /// flag before acting on each received item.
    pub fn spawn<F, Fut>(listener: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(listener(active.clone()));

        Self {
            active,
            task: Some(task),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
            && self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Deactivates the listener and waits until its task is gone.
    pub async fn stop(mut self) {
        self.active.store(false, Ordering::SeqCst);

        if let Some(task) = self.task.take() {
            task.abort();
            // cancellation is the expected outcome
            let _ = task.await;
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Stream of values from an external event source. Unsubscribing (or
/// dropping) closes the channel so the producer stops delivering.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: Receiver<T>,
    forwarder: Option<ListenerHandle>,
}

impl<T> Subscription<T> {
    pub fn new(receiver: Receiver<T>) -> Self {
        Self {
            receiver,
            forwarder: None,
        }
    }

    /// Subscription fed by a background task that is torn down with it.
    pub fn with_forwarder(receiver: Receiver<T>, forwarder: ListenerHandle) -> Self {
        Self {
            receiver,
            forwarder: Some(forwarder),
        }
    }

    /// Waits for the next value; `None` once the source is gone.
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await.ok()
    }

    pub fn try_next(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }

    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.receiver.close();
        // forwarder is aborted by its own drop
        self.forwarder.take();
    }
}
