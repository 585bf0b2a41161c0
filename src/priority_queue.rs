//! Bucket priority queue over cell indices.
//!
//! Priorities are small non-negative integers (path distances plus
//! heuristics), so an array of buckets beats a binary heap. The queue does
//! not remember priorities: callers track each cell's current priority and
//! hand the old one back to [`HexCellPriorityQueue::change`].

/// Bucket queue keyed by integer priority.
///
/// Cells inside one bucket come out last-in, first-out.
#[derive(Clone, Debug, Default)]
pub struct HexCellPriorityQueue {
    buckets: Vec<Vec<usize>>,
    count: usize,
    minimum: usize,
}

impl HexCellPriorityQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued cells.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the queue holds no cells.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Inserts `cell` with `priority`, growing the bucket array as needed.
    pub fn enqueue(&mut self, cell: usize, priority: usize) {
        if self.count == 0 || priority < self.minimum {
            self.minimum = priority;
        }
        self.count += 1;
        if priority >= self.buckets.len() {
            self.buckets.resize_with(priority + 1, Vec::new);
        }
        self.buckets[priority].push(cell);
    }

    /// Removes and returns a cell with the lowest priority.
    pub fn dequeue(&mut self) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        while self.minimum < self.buckets.len() {
            if let Some(cell) = self.buckets[self.minimum].pop() {
                self.count -= 1;
                return Some(cell);
            }
            self.minimum += 1;
        }
        None
    }

    /// Moves `cell` from `old_priority` to `new_priority`.
    ///
    /// `old_priority` must be the priority the cell was queued with. If the
    /// cell is not found in that bucket it is still enqueued at the new one.
    pub fn change(&mut self, cell: usize, old_priority: usize, new_priority: usize) {
        if let Some(bucket) = self.buckets.get_mut(old_priority)
            && let Some(pos) = bucket.iter().rposition(|&c| c == cell)
        {
            bucket.remove(pos);
            self.count -= 1;
        }
        self.enqueue(cell, new_priority);
    }

    /// Empties every bucket while keeping their storage.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.count = 0;
        self.minimum = usize::MAX;
    }
}
