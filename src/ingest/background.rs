use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering as AtomicOrdering},
    },
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::{
    foundation::selector::ChannelSelector,
    imageio::loader::LoaderRegistry,
    ingest::load::try_load_image,
    model::image::Image,
    pool::{priority::Priority, thread_pool::PoolHandle},
};

/// Outcome of one background load request, published in request order.
#[derive(Clone, Debug)]
pub struct ImageAddition {
    /// Position of the request among all requests of its loader.
    pub sequence: u64,
    /// Whether the consumer should switch to the first image on arrival.
    pub select_on_arrival: bool,
    /// Decoded images; never empty once published.
    pub images: Vec<Arc<Image>>,
}

struct PendingAddition(ImageAddition);

impl PartialEq for PendingAddition {
    fn eq(&self, other: &Self) -> bool {
        self.0.sequence == other.0.sequence
    }
}

impl Eq for PendingAddition {}

impl PartialOrd for PendingAddition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingAddition {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on sequence
        other.0.sequence.cmp(&self.0.sequence)
    }
}

/// Reorders completions by sequence number.
#[derive(Default)]
pub(crate) struct PublishQueue {
    pending: BinaryHeap<PendingAddition>,
    next_expected: u64,
    published: VecDeque<ImageAddition>,
}

impl PublishQueue {
    /// Record a finished request and publish every now-contiguous completion.
    ///
    /// Returns whether the published queue grew. Failed requests (no images)
    /// advance the sequence but are never published.
    pub(crate) fn complete(&mut self, addition: ImageAddition) -> bool {
        self.pending.push(PendingAddition(addition));

        let mut grew = false;
        while self
            .pending
            .peek()
            .is_some_and(|top| top.0.sequence == self.next_expected)
        {
            let Some(PendingAddition(next)) = self.pending.pop() else {
                break;
            };
            self.next_expected += 1;
            if !next.images.is_empty() {
                self.published.push_back(next);
                grew = true;
            }
        }
        grew
    }

    pub(crate) fn drain(&mut self) -> Vec<ImageAddition> {
        self.published.drain(..).collect()
    }

    pub(crate) fn pop(&mut self) -> Option<ImageAddition> {
        self.published.pop_front()
    }

    pub(crate) fn has_published(&self) -> bool {
        !self.published.is_empty()
    }

    pub(crate) fn next_expected(&self) -> u64 {
        self.next_expected
    }
}

struct Shared {
    queue: Mutex<PublishQueue>,
    changed: Condvar,
}

/// Loads images on the pool and hands them out in the order they were requested.
///
/// Requests are decoded concurrently, newest first, but a result only becomes
/// visible once every earlier request has finished. One consumer may poll
/// while any number of threads enqueue.
pub struct BackgroundImagesLoader {
    pool: PoolHandle,
    registry: LoaderRegistry,
    next_sequence: AtomicU64,
    shared: Arc<Shared>,
}

impl BackgroundImagesLoader {
    /// Loader scheduling onto `pool` and decoding with `registry`.
    pub fn new(pool: PoolHandle, registry: LoaderRegistry) -> Self {
        Self {
            pool,
            registry,
            next_sequence: AtomicU64::new(0),
            shared: Arc::new(Shared {
                queue: Mutex::new(PublishQueue::default()),
                changed: Condvar::new(),
            }),
        }
    }

    /// Request a load of `path`; returns the request's sequence number.
    ///
    /// The sequence number is assigned before anything is scheduled, so it
    /// reflects call order even when called from several threads.
    pub fn enqueue(&self, path: impl Into<PathBuf>, selector: ChannelSelector, select_on_arrival: bool) -> u64 {
        let sequence = self.next_sequence.fetch_add(1, AtomicOrdering::AcqRel);
        let priority = Priority::background(Image::next_draw_id());
        let path = path.into();

        tracing::debug!(sequence, path = %path.display(), %priority, "queued background load");

        let pool = self.pool.clone();
        let registry = self.registry.clone();
        let shared = Arc::clone(&self.shared);
        self.pool
            .spawn(priority, async move {
                let images = try_load_image(&pool, &registry, &path, &selector, priority).await;
                let grew = shared.queue.lock().complete(ImageAddition {
                    sequence,
                    select_on_arrival,
                    images,
                });
                if grew {
                    tracing::debug!(sequence, "background loads published");
                }
                shared.changed.notify_all();
                Ok(())
            })
            .detach();

        sequence
    }

    /// Take every published addition, oldest first.
    pub fn drain_published(&self) -> Vec<ImageAddition> {
        self.shared.queue.lock().drain()
    }

    /// Take the oldest published addition, if any.
    pub fn try_pop(&self) -> Option<ImageAddition> {
        self.shared.queue.lock().pop()
    }

    /// Block until something is published or `timeout` passes.
    ///
    /// Returns whether a published addition is available.
    pub fn wait_published(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut queue = self.shared.queue.lock();
        while !queue.has_published() {
            if self.shared.changed.wait_until(&mut queue, deadline).timed_out() {
                return queue.has_published();
            }
        }
        true
    }

    /// Block until every request issued so far has been released, or `timeout` passes.
    ///
    /// Returns whether nothing is pending. Published additions stay queued for
    /// the consumer.
    pub fn wait_settled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut queue = self.shared.queue.lock();
        loop {
            let issued = self.next_sequence.load(AtomicOrdering::Acquire);
            if queue.next_expected() >= issued {
                return true;
            }
            if self.shared.changed.wait_until(&mut queue, deadline).timed_out() {
                return queue.next_expected() >= self.next_sequence.load(AtomicOrdering::Acquire);
            }
        }
    }

    /// Requests whose outcome has not been released yet.
    pub fn pending(&self) -> u64 {
        let issued = self.next_sequence.load(AtomicOrdering::Acquire);
        issued.saturating_sub(self.shared.queue.lock().next_expected())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ingest/background.rs"]
mod tests;
