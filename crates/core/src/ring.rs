//! Fixed-capacity queue with oldest-first eviction.
//!
//! Every pushed element gets an absolute sequence number that stays valid
//! until the element is evicted, so callers can keep `id -> seq` maps
//! without re-indexing when the front of the buffer drops off.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
    /// Sequence number of `items[0]`
    head_seq: u64,
}

impl<T> RingBuffer<T> {
    /// Create a buffer holding at most `capacity` items (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            head_seq: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sequence number the next pushed item will receive.
    pub fn next_seq(&self) -> u64 {
        self.head_seq + self.items.len() as u64
    }

    /// Number of items evicted since creation or the last `clear`.
    pub fn evicted(&self) -> u64 {
        self.head_seq
    }

    /// Append an item, returning the evicted oldest item when full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.head_seq += 1;
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn get(&self, seq: u64) -> Option<&T> {
        let offset = seq.checked_sub(self.head_seq)?;
        self.items.get(usize::try_from(offset).ok()?)
    }

    pub fn get_mut(&mut self, seq: u64) -> Option<&mut T> {
        let offset = seq.checked_sub(self.head_seq)?;
        self.items.get_mut(usize::try_from(offset).ok()?)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// Drop everything and restart sequence numbering.
    pub fn clear(&mut self) {
        self.items.clear();
        self.head_seq = 0;
    }
}

impl<T> Extend<T> for RingBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
