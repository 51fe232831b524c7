//! Fixed-capacity ring buffer for per-tick append-only tapes.
//!
//! Stock history and transaction tapes grow by one entry per tick for the
//! whole session; a cursor over a pre-sized buffer avoids reallocating or
//! shifting on every push.

use serde::{Deserialize, Serialize};

/// Bounded ring buffer with a write cursor.
///
/// `push` overwrites the oldest entry once `len == capacity`; iteration
/// always yields oldest to newest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingBuffer<T> {
    items: Vec<T>,
    capacity: usize,
    /// Index of the next write when the buffer is full
    cursor: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
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

    /// Append an entry, evicting the oldest if at capacity.
    pub fn push(&mut self, item: T) {
        if self.items.len() < self.capacity {
            self.items.push(item);
        } else {
            self.items[self.cursor] = item;
            self.cursor = (self.cursor + 1) % self.capacity;
        }
    }

    /// Most recently pushed entry.
    pub fn last(&self) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        let idx = if self.items.len() < self.capacity {
            self.items.len() - 1
        } else {
            (self.cursor + self.capacity - 1) % self.capacity
        };
        self.items.get(idx)
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (tail, head) = if self.items.len() < self.capacity {
            (&self.items[..], &self.items[..0])
        } else {
            (&self.items[self.cursor..], &self.items[..self.cursor])
        };
        tail.iter().chain(head.iter())
    }

    /// The `n` newest entries, oldest first.
    pub fn tail(&self, n: usize) -> Vec<&T> {
        let len = self.items.len();
        let skip = len.saturating_sub(n);
        self.iter().skip(skip).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_below_capacity() {
        let mut ring = RingBuffer::new(4);
        ring.push(1);
        ring.push(2);

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.last(), Some(&2));
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_push_wraps_and_evicts_oldest() {
        let mut ring = RingBuffer::new(3);
        for i in 1..=5 {
            ring.push(i);
        }

        assert_eq!(ring.len(), 3);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(ring.last(), Some(&5));
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        let mut ring = RingBuffer::new(8);
        for i in 0..1000 {
            ring.push(i);
            assert!(ring.len() <= ring.capacity());
        }
    }

    #[test]
    fn test_tail_returns_newest() {
        let mut ring = RingBuffer::new(4);
        for i in 0..6 {
            ring.push(i);
        }

        let tail: Vec<i32> = ring.tail(2).into_iter().copied().collect();
        assert_eq!(tail, vec![4, 5]);
    }
}
