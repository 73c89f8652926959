use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::BinaryHeap,
    future::Future,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering as AtomicOrdering},
    },
    task::{Context, Poll, Wake, Waker},
    thread::JoinHandle,
};

use anyhow::Context as _;
use parking_lot::{Condvar, Mutex};

use crate::{
    foundation::{
        config::IngestConfig,
        error::{IngestError, IngestResult},
    },
    pool::{
        priority::Priority,
        task::{self, Promise, Task},
    },
};

type Job = Box<dyn FnOnce() + Send + 'static>;
type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct QueuedJob {
    priority: Priority,
    /// Monotonic submission counter for FIFO ordering within the same priority.
    sequence: u64,
    job: Job,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first, then lower sequence (older) first
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            other_ordering => other_ordering,
        }
    }
}

#[derive(Default)]
struct Queue {
    heap: BinaryHeap<QueuedJob>,
    next_sequence: u64,
    running: usize,
    shutting_down: bool,
    stopped: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    work_available: Condvar,
    idle: Condvar,
}

impl Shared {
    fn push(&self, priority: Priority, job: Job) {
        {
            let mut q = self.queue.lock();
            if q.stopped {
                // Dropping the job drops any promise it owns, which abandons the task.
                drop(q);
                tracing::warn!(%priority, "job submitted after pool shutdown was discarded");
                drop(job);
                return;
            }
            let sequence = q.next_sequence;
            q.next_sequence += 1;
            q.heap.push(QueuedJob {
                priority,
                sequence,
                job,
            });
        }
        self.work_available.notify_one();
    }
}

/// Fixed set of worker threads executing jobs in priority order.
///
/// Jobs with higher [`Priority`] are started first; jobs of equal priority run
/// in submission order. There is no cancellation: a queued job always runs.
/// [`ThreadPool::shutdown`] (also run on drop) lets the workers drain the queue
/// and joins them.
pub struct ThreadPool {
    handle: PoolHandle,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// Cheap, clonable scheduling handle onto a [`ThreadPool`].
///
/// Components that schedule work hold one of these rather than the pool
/// itself, so only the owner of the pool decides when it is torn down.
#[derive(Clone)]
pub struct PoolHandle {
    shared: Arc<Shared>,
    num_threads: usize,
}

impl ThreadPool {
    /// Start `num_threads` workers.
    pub fn new(num_threads: usize) -> IngestResult<Self> {
        if num_threads == 0 {
            return Err(IngestError::config("thread pool needs at least one worker"));
        }

        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            work_available: Condvar::new(),
            idle: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(num_threads);
        for index in 0..num_threads {
            let worker_shared = Arc::clone(&shared);
            let handle = std::thread::Builder::new()
                .name(format!("hdr-ingest-worker-{index}"))
                .spawn(move || worker_loop(&worker_shared, index))
                .with_context(|| format!("spawn pool worker {index}"))?;
            workers.push(handle);
        }

        tracing::debug!(num_threads, "thread pool started");
        Ok(Self {
            handle: PoolHandle {
                shared,
                num_threads,
            },
            workers: Mutex::new(workers),
        })
    }

    /// Start a pool sized by `config`.
    pub fn from_config(config: &IngestConfig) -> IngestResult<Self> {
        config.validate()?;
        Self::new(config.resolved_worker_threads())
    }

    /// Scheduling handle to pass to components.
    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    /// Number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.handle.num_threads
    }

    /// See [`PoolHandle::enqueue`].
    pub fn enqueue(&self, priority: Priority, work: impl FnOnce() + Send + 'static) {
        self.handle.enqueue(priority, work);
    }

    /// See [`PoolHandle::spawn`].
    pub fn spawn<T, F>(&self, priority: Priority, future: F) -> Task<T>
    where
        T: Send + 'static,
        F: Future<Output = IngestResult<T>> + Send + 'static,
    {
        self.handle.spawn(priority, future)
    }

    /// See [`PoolHandle::parallel_for`].
    pub fn parallel_for<F>(&self, begin: usize, end: usize, priority: Priority, body: F) -> Task<()>
    where
        F: Fn(usize) -> IngestResult<()> + Send + Sync + 'static,
    {
        self.handle.parallel_for(begin, end, priority, body)
    }

    /// See [`PoolHandle::schedule`].
    pub fn schedule(&self, priority: Priority) -> Schedule {
        self.handle.schedule(priority)
    }

    /// Block until the queue is empty and no job is running.
    pub fn wait_until_idle(&self) {
        let shared = &self.handle.shared;
        let mut q = shared.queue.lock();
        while !(q.heap.is_empty() && q.running == 0) {
            shared.idle.wait(&mut q);
        }
    }

    /// Drain all queued work and join the workers. Idempotent.
    pub fn shutdown(&self) {
        let shared = &self.handle.shared;
        shared.queue.lock().shutting_down = true;
        shared.work_available.notify_all();

        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }

        let current = std::thread::current().id();
        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                tracing::error!("pool worker terminated abnormally");
            }
        }

        let leftover = {
            let mut q = shared.queue.lock();
            q.stopped = true;
            std::mem::take(&mut q.heap)
        };
        if !leftover.is_empty() {
            tracing::warn!(jobs = leftover.len(), "discarding jobs queued during shutdown");
        }
        tracing::debug!("thread pool stopped");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl PoolHandle {
    /// Number of worker threads behind this handle.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Schedule one unit of work. Effects are observable only through state the
    /// closure captures.
    pub fn enqueue(&self, priority: Priority, work: impl FnOnce() + Send + 'static) {
        self.shared.push(priority, Box::new(work));
    }

    /// Run `future` on the pool and return a handle to its result.
    ///
    /// Nothing runs on the calling thread: the first poll is queued at
    /// `priority`, and every later wake-up re-queues the future at its current
    /// priority (see [`PoolHandle::schedule`]).
    pub fn spawn<T, F>(&self, priority: Priority, future: F) -> Task<T>
    where
        T: Send + 'static,
        F: Future<Output = IngestResult<T>> + Send + 'static,
    {
        let (promise, task) = task::pair();
        let wrapped = async move { promise.fulfil(future.await) };
        let spawned = Arc::new(SpawnedFuture {
            future: Mutex::new(Some(Box::pin(wrapped))),
            priority: AtomicI64::new(priority.0),
            queued: AtomicBool::new(false),
            shared: Arc::clone(&self.shared),
        });
        spawned.enqueue();
        task
    }

    /// Suspension point that moves the awaiting future onto a worker at `priority`.
    ///
    /// Inside a future started with [`PoolHandle::spawn`] the future is
    /// re-queued at `priority`, which also becomes its priority for later
    /// wake-ups. Anywhere else the caller's waker is invoked from a worker once a
    /// job at `priority` gets its turn.
    pub fn schedule(&self, priority: Priority) -> Schedule {
        Schedule {
            shared: Arc::clone(&self.shared),
            priority,
            yielded: false,
        }
    }

    /// Run `body(i)` for every `i` in `begin..end` on the pool.
    ///
    /// The range is split into about one contiguous chunk per worker, each
    /// queued at `priority`. A chunk stops at its first error, but every other
    /// chunk still runs to completion so no partially written output is left
    /// behind by an early abort. The first recorded error is what the returned
    /// task resolves to.
    pub fn parallel_for<F>(&self, begin: usize, end: usize, priority: Priority, body: F) -> Task<()>
    where
        F: Fn(usize) -> IngestResult<()> + Send + Sync + 'static,
    {
        let range = end.saturating_sub(begin);
        if range == 0 {
            return Task::ready(());
        }

        let num_chunks = self.num_threads.clamp(1, range);
        let (promise, task) = task::pair();
        let join = Arc::new(ChunkJoin {
            remaining: AtomicUsize::new(num_chunks),
            first_error: Mutex::new(None),
            promise: Mutex::new(Some(promise)),
        });
        let body = Arc::new(body);

        let base = range / num_chunks;
        let extra = range % num_chunks;
        let mut start = begin;
        for chunk in 0..num_chunks {
            let len = base + usize::from(chunk < extra);
            let stop = start + len;
            let body = Arc::clone(&body);
            let join = Arc::clone(&join);
            self.enqueue(priority, move || {
                for i in start..stop {
                    if let Err(e) = body(i) {
                        join.record(e);
                        break;
                    }
                }
                join.finish_chunk();
            });
            start = stop;
        }

        task
    }
}

struct ChunkJoin {
    remaining: AtomicUsize,
    first_error: Mutex<Option<IngestError>>,
    promise: Mutex<Option<Promise<()>>>,
}

impl ChunkJoin {
    fn record(&self, err: IngestError) {
        let mut first = self.first_error.lock();
        if first.is_none() {
            *first = Some(err);
        } else {
            tracing::debug!(error = %err, "additional parallel_for failure dropped");
        }
    }

    fn finish_chunk(&self) {
        if self.remaining.fetch_sub(1, AtomicOrdering::AcqRel) != 1 {
            return;
        }
        let result = match self.first_error.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        };
        if let Some(promise) = self.promise.lock().take() {
            promise.fulfil(result);
        }
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<SpawnedFuture>>> = const { RefCell::new(None) };
}

struct SpawnedFuture {
    future: Mutex<Option<BoxFuture>>,
    priority: AtomicI64,
    queued: AtomicBool,
    shared: Arc<Shared>,
}

impl SpawnedFuture {
    fn enqueue(self: &Arc<Self>) {
        if self.queued.swap(true, AtomicOrdering::AcqRel) {
            return;
        }
        let this = Arc::clone(self);
        let priority = Priority(self.priority.load(AtomicOrdering::Acquire));
        self.shared.push(priority, Box::new(move || this.run()));
    }

    fn run(self: Arc<Self>) {
        self.queued.store(false, AtomicOrdering::Release);

        let waker = Waker::from(Arc::clone(&self));
        let mut cx = Context::from_waker(&waker);

        let mut slot = self.future.lock();
        let Some(future) = slot.as_mut() else {
            return;
        };

        let previous = CURRENT.with(|c| c.replace(Some(Arc::clone(&self))));
        let poll = future.as_mut().poll(&mut cx);
        CURRENT.with(|c| c.replace(previous));

        if poll.is_ready() {
            *slot = None;
        }
    }
}

impl Wake for SpawnedFuture {
    fn wake(self: Arc<Self>) {
        self.enqueue();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.enqueue();
    }
}

/// Future returned by [`PoolHandle::schedule`].
#[must_use = "futures do nothing unless awaited"]
pub struct Schedule {
    shared: Arc<Shared>,
    priority: Priority,
    yielded: bool,
}

impl Future for Schedule {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;

        let current = CURRENT.with(|c| c.borrow().clone());
        match current {
            Some(spawned) if Arc::ptr_eq(&spawned.shared, &self.shared) => {
                spawned
                    .priority
                    .store(self.priority.0, AtomicOrdering::Release);
                spawned.enqueue();
            }
            _ => {
                let waker = cx.waker().clone();
                self.shared.push(self.priority, Box::new(move || waker.wake()));
            }
        }
        Poll::Pending
    }
}

fn worker_loop(shared: &Shared, index: usize) {
    loop {
        let job = {
            let mut q = shared.queue.lock();
            loop {
                if let Some(job) = q.heap.pop() {
                    q.running += 1;
                    break Some(job);
                }
                if q.shutting_down && q.running == 0 {
                    break None;
                }
                shared.work_available.wait(&mut q);
            }
        };

        let Some(job) = job else {
            shared.work_available.notify_all();
            return;
        };

        if panic::catch_unwind(AssertUnwindSafe(job.job)).is_err() {
            // Panics are logic defects (failed invariants), never bad input.
            tracing::error!(worker = index, "pool job panicked; aborting");
            std::process::abort();
        }

        let mut q = shared.queue.lock();
        q.running -= 1;
        if q.running == 0 && q.heap.is_empty() {
            shared.idle.notify_all();
            if q.shutting_down {
                shared.work_available.notify_all();
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pool/thread_pool.rs"]
mod tests;
