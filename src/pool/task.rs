use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
};

use parking_lot::{Condvar, Mutex};

use crate::foundation::error::{IngestError, IngestResult};

struct Slot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

struct SlotState<T> {
    result: Option<IngestResult<T>>,
    waker: Option<Waker>,
    completed: bool,
    detached: bool,
}

/// Single-owner handle to a value that is being computed elsewhere.
///
/// Awaiting a `Task` suspends until the producer publishes a value or an error,
/// then resumes wherever the awaiting future is next polled. For futures
/// spawned on a [`ThreadPool`](crate::ThreadPool) that is a pool worker. The
/// result is handed out exactly once: both `.await` and [`Task::wait`] consume
/// the handle. Fan-out is done by collecting several tasks and then awaiting
/// each of them.
///
/// Dropping a task without awaiting it detaches it. The work still runs to
/// completion; an error result is logged instead of being lost silently.
#[must_use = "a Task does nothing observable unless awaited; use `detach` to fire and forget"]
pub struct Task<T> {
    slot: Arc<Slot<T>>,
}

/// Producer side of a [`Task`]. Dropping it unfulfilled yields `TaskAbandoned`.
pub(crate) struct Promise<T> {
    slot: Option<Arc<Slot<T>>>,
}

/// Create a connected producer/consumer pair.
pub(crate) fn pair<T>() -> (Promise<T>, Task<T>) {
    let slot = Arc::new(Slot {
        state: Mutex::new(SlotState {
            result: None,
            waker: None,
            completed: false,
            detached: false,
        }),
        ready: Condvar::new(),
    });
    (
        Promise {
            slot: Some(Arc::clone(&slot)),
        },
        Task { slot },
    )
}

impl<T> Slot<T> {
    fn complete(&self, result: IngestResult<T>) {
        let waker = {
            let mut st = self.state.lock();
            st.completed = true;
            if st.detached {
                drop(st);
                if let Err(e) = result {
                    tracing::error!(error = %e, "unhandled error in detached task");
                }
                return;
            }
            st.result = Some(result);
            st.waker.take()
        };
        self.ready.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T> Promise<T> {
    pub(crate) fn fulfil(mut self, result: IngestResult<T>) {
        if let Some(slot) = self.slot.take() {
            slot.complete(result);
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.complete(Err(IngestError::TaskAbandoned));
        }
    }
}

impl<T> Task<T> {
    /// A task whose value is already available.
    pub fn ready(value: T) -> Self {
        Self::completed(Ok(value))
    }

    /// A task that already failed.
    pub fn failed(err: IngestError) -> Self {
        Self::completed(Err(err))
    }

    fn completed(result: IngestResult<T>) -> Self {
        let (promise, task) = pair();
        promise.fulfil(result);
        task
    }

    /// Whether the result is available without suspending.
    pub fn is_ready(&self) -> bool {
        self.slot.state.lock().result.is_some()
    }

    /// Block the calling thread until the result is available.
    ///
    /// Only for explicit join points outside the pool; calling this from a
    /// pool worker can starve the pool.
    pub fn wait(self) -> IngestResult<T> {
        let mut st = self.slot.state.lock();
        loop {
            if let Some(result) = st.result.take() {
                return result;
            }
            if st.completed {
                return Err(IngestError::TaskAbandoned);
            }
            self.slot.ready.wait(&mut st);
        }
    }

    /// Let the work finish in the background; errors are logged.
    pub fn detach(self) {}
}

impl<T> Future for Task<T> {
    type Output = IngestResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut st = self.slot.state.lock();
        if let Some(result) = st.result.take() {
            return Poll::Ready(result);
        }
        if st.completed {
            panic!("`Task` polled after completion");
        }
        match &mut st.waker {
            Some(w) if w.will_wake(cx.waker()) => {}
            slot => *slot = Some(cx.waker().clone()),
        }
        Poll::Pending
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        let mut st = self.slot.state.lock();
        if !st.completed {
            st.detached = true;
            st.waker = None;
        } else if let Some(Err(e)) = st.result.take() {
            tracing::error!(error = %e, "unhandled error in detached task");
        }
    }
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.slot.state.lock();
        f.debug_struct("Task")
            .field("completed", &st.completed)
            .field("detached", &st.detached)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pool/task.rs"]
mod tests;
