//! Fixed-capacity ring buffers backing the trail store.
//!
//! Three flavours, one per access pattern:
//!
//! - [`TickRing`]: slots written at a cursor owned by someone else. All
//!   per-object histories share one cursor, so slot `i` of every history
//!   belongs to the same tick.
//! - [`OverwriteRing`]: appends until full, then overwrites the oldest
//!   element in place with its own cursor. Used for trail segments.
//! - [`FifoRing`]: queue that evicts from the front. Used for afterimages.
//!
//! None of them ever grows past its capacity.

use std::collections::VecDeque;

// ============================================================================
// TICK RING
// ============================================================================

/// Fixed slots addressed by an external, shared write cursor.
#[derive(Debug, Clone)]
pub struct TickRing<T> {
    slots: Vec<Option<T>>,

    /// Number of occupied slots
    filled: usize,

    /// Slot of the most recent write
    last: Option<usize>,
}

impl<T> TickRing<T> {
    /// Creates an empty ring. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            filled: 0,
            last: None,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots (never more than `capacity`).
    #[inline]
    pub fn len(&self) -> usize {
        self.filled
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Writes `value` at `cursor % capacity`, returning what it replaced.
    pub fn write(&mut self, cursor: usize, value: T) -> Option<T> {
        let slot = cursor % self.slots.len();
        let previous = self.slots[slot].replace(value);
        if previous.is_none() {
            self.filled += 1;
        }
        self.last = Some(slot);
        previous
    }

    /// Reads the slot at `cursor % capacity`.
    pub fn get(&self, cursor: usize) -> Option<&T> {
        self.slots[cursor % self.slots.len()].as_ref()
    }

    /// The most recently written value.
    pub fn last(&self) -> Option<&T> {
        self.last.and_then(|slot| self.slots[slot].as_ref())
    }

    /// Slot index of the most recent write.
    pub fn last_slot(&self) -> Option<usize> {
        self.last
    }

    /// Occupied slots oldest → newest, assuming writes advanced with the cursor.
    pub fn iter_chronological(&self) -> impl Iterator<Item = &T> + '_ {
        let cap = self.slots.len();
        let start = self.last.map(|slot| (slot + 1) % cap).unwrap_or(0);
        (0..cap).filter_map(move |offset| self.slots[(start + offset) % cap].as_ref())
    }

    /// The newest `n` values, oldest first.
    pub fn latest(&self, n: usize) -> Vec<&T> {
        let all: Vec<&T> = self.iter_chronological().collect();
        let skip = all.len().saturating_sub(n);
        all.into_iter().skip(skip).collect()
    }
}

// ============================================================================
// OVERWRITE RING
// ============================================================================

/// Append-only ring that overwrites its oldest element once full.
#[derive(Debug, Clone)]
pub struct OverwriteRing<T> {
    items: Vec<T>,
    capacity: usize,

    /// Next slot to overwrite once full (always the oldest element)
    cursor: usize,

    /// Total number of pushes since creation
    pushed: u64,
}

impl<T> OverwriteRing<T> {
    /// Creates an empty ring. Storage grows lazily up to `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity: capacity.max(1),
            cursor: 0,
            pushed: 0,
        }
    }

    /// Appends `value`, returning the slot it landed in.
    pub fn push(&mut self, value: T) -> usize {
        self.pushed += 1;
        if self.items.len() < self.capacity {
            self.items.push(value);
            return self.items.len() - 1;
        }

        let slot = self.cursor;
        self.items[slot] = value;
        self.cursor = (self.cursor + 1) % self.capacity;
        slot
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Total pushes, including overwritten ones.
    pub fn total_pushed(&self) -> u64 {
        self.pushed
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        self.items.get(slot)
    }

    /// Elements in storage order (slot 0 first).
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Elements oldest → newest.
    pub fn iter_chronological(&self) -> impl Iterator<Item = &T> + '_ {
        let (newer, older) = self.items.split_at(self.cursor);
        older.iter().chain(newer.iter())
    }

    /// The most recently pushed element.
    pub fn newest(&self) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        if self.is_full() {
            let slot = (self.cursor + self.capacity - 1) % self.capacity;
            self.items.get(slot)
        } else {
            self.items.last()
        }
    }
}

// ============================================================================
// FIFO RING
// ============================================================================

/// Bounded queue evicting its oldest entry on overflow.
#[derive(Debug, Clone)]
pub struct FifoRing<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> FifoRing<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `value`, returning the evicted entry if the ring was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(value);
        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Oldest → newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.items.iter()
    }

    /// Newest → oldest.
    pub fn newest_first(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tick_ring_write_and_wrap() {
        let mut ring = TickRing::new(3);
        assert!(ring.is_empty());

        for cursor in 0..3 {
            assert_eq!(ring.write(cursor, cursor * 10), None);
        }
        assert!(ring.is_full());

        // Cursor 3 wraps onto slot 0
        assert_eq!(ring.write(3, 30), Some(0));
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.get(0), Some(&30));
        assert_eq!(ring.last(), Some(&30));

        let chrono: Vec<_> = ring.iter_chronological().copied().collect();
        assert_eq!(chrono, vec![10, 20, 30]);
        assert_eq!(ring.latest(2), vec![&20, &30]);
    }

    #[test]
    fn test_tick_ring_rewrite_same_slot() {
        let mut ring = TickRing::new(4);
        ring.write(1, 'a');
        ring.write(1, 'b');
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.get(1), Some(&'b'));
    }

    #[test]
    fn test_overwrite_ring_replaces_oldest() {
        let mut ring = OverwriteRing::new(3);
        assert_eq!(ring.push('a'), 0);
        assert_eq!(ring.push('b'), 1);
        assert_eq!(ring.push('c'), 2);
        assert_eq!(ring.newest(), Some(&'c'));

        assert_eq!(ring.push('d'), 0);
        assert_eq!(ring.push('e'), 1);
        assert_eq!(ring.as_slice(), &['d', 'e', 'c']);

        let chrono: Vec<_> = ring.iter_chronological().copied().collect();
        assert_eq!(chrono, vec!['c', 'd', 'e']);
        assert_eq!(ring.newest(), Some(&'e'));
        assert_eq!(ring.total_pushed(), 5);
    }

    #[test]
    fn test_fifo_ring_evicts_front() {
        let mut ring = FifoRing::new(2);
        assert_eq!(ring.push(1), None);
        assert_eq!(ring.push(2), None);
        assert_eq!(ring.push(3), Some(1));

        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(ring.newest_first().copied().collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        assert_eq!(TickRing::<u8>::new(0).capacity(), 1);
        assert_eq!(OverwriteRing::<u8>::new(0).capacity(), 1);
        assert_eq!(FifoRing::<u8>::new(0).capacity(), 1);
    }

    proptest! {
        #[test]
        fn prop_overwrite_ring_keeps_latest(cap in 1usize..64, values in prop::collection::vec(any::<u32>(), 0..300)) {
            let mut ring = OverwriteRing::new(cap);
            for (n, v) in values.iter().enumerate() {
                let slot = ring.push(*v);
                // The n-th push lands in slot n mod capacity
                prop_assert_eq!(slot, n % cap);
                prop_assert!(ring.len() <= cap);
            }

            let expected: Vec<u32> = values.iter().skip(values.len().saturating_sub(cap)).copied().collect();
            let actual: Vec<u32> = ring.iter_chronological().copied().collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn prop_fifo_ring_keeps_latest(cap in 1usize..32, values in prop::collection::vec(any::<i16>(), 0..200)) {
            let mut ring = FifoRing::new(cap);
            for v in &values {
                ring.push(*v);
                prop_assert!(ring.len() <= cap);
            }
            let expected: Vec<i16> = values.iter().skip(values.len().saturating_sub(cap)).copied().collect();
            prop_assert_eq!(ring.iter().copied().collect::<Vec<_>>(), expected);
        }

        #[test]
        fn prop_tick_ring_sequential_cursor(cap in 1usize..40, values in prop::collection::vec(any::<u16>(), 1..200)) {
            let mut ring = TickRing::new(cap);
            for (cursor, v) in values.iter().enumerate() {
                ring.write(cursor, *v);
                prop_assert!(ring.len() <= cap);
            }
            let expected: Vec<u16> = values.iter().skip(values.len().saturating_sub(cap)).copied().collect();
            prop_assert_eq!(ring.iter_chronological().copied().collect::<Vec<_>>(), expected);
        }
    }
}
