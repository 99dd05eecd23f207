use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::batch::{Batch, BatchStatus, CreationStamp, Priority};

/// Heap entry. The key is captured at insert time; it is immutable on the
/// batch anyway.
struct QueueEntry {
    rank: u8,
    created: CreationStamp,
    batch: Arc<Batch>,
}

impl QueueEntry {
    fn new(batch: Arc<Batch>) -> Self {
        let (rank, created) = batch.ordering_key();
        Self {
            rank,
            created,
            batch,
        }
    }

    fn key(&self) -> (u8, CreationStamp) {
        (self.rank, self.created)
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // BinaryHeap is a max-heap; invert so the lowest (rank, stamp) surfaces.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Pending counts per priority band.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PendingCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PendingCounts {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }

    fn bump(&mut self, priority: Priority) {
        match priority {
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }
}

/// Pending-work priority queue ordered by `(priority rank, creation stamp)`.
///
/// Holds shared references to batches owned by their ingestion. A batch is
/// in the queue exactly while it is `yet_to_start`: [`BatchQueue::pop_next`]
/// removes the head and marks it `triggered` under the same lock, so no batch
/// is ever handed out twice.
pub struct BatchQueue {
    heap: Mutex<BinaryHeap<QueueEntry>>,
}

impl Default for BatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("BatchQueue");
        match self.heap.try_lock() {
            Ok(heap) => {
                debug.field("pending", &heap.len());
            }
            Err(_) => {
                debug.field("pending", &"<locked>");
            }
        }
        debug.finish()
    }
}

impl BatchQueue {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
        }
    }

    /// Insert every batch in one critical section; returns the depth after
    /// the insert. Batches that already left `yet_to_start` are skipped.
    pub async fn enqueue_many<I>(&self, batches: I) -> usize
    where
        I: IntoIterator<Item = Arc<Batch>>,
    {
        let mut heap = self.heap.lock().await;
        for batch in batches {
            if batch.status() != BatchStatus::YetToStart {
                tracing::warn!(
                    target: "batch::queue",
                    batch = %batch.id(),
                    status = ?batch.status(),
                    "refusing to enqueue batch that already started"
                );
                continue;
            }
            heap.push(QueueEntry::new(batch));
        }
        heap.len()
    }

    /// Remove the head (lowest rank, then earliest stamp) and mark it
    /// `triggered` before releasing the lock.
    pub async fn pop_next(&self) -> Option<Arc<Batch>> {
        let mut heap = self.heap.lock().await;
        while let Some(entry) = heap.pop() {
            if entry.batch.mark_triggered() {
                return Some(entry.batch);
            }
            tracing::warn!(
                target: "batch::queue",
                batch = %entry.batch.id(),
                status = ?entry.batch.status(),
                "dropping queued batch that was no longer pending"
            );
        }
        None
    }

    pub async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.heap.lock().await.is_empty()
    }

    pub async fn pending_counts(&self) -> PendingCounts {
        let heap = self.heap.lock().await;
        let mut counts = PendingCounts::default();
        for entry in heap.iter() {
            counts.bump(entry.batch.priority());
        }
        counts
    }
}
