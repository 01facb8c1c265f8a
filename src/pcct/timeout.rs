use std::{cmp::Reverse, collections::BinaryHeap};

use crate::clock::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(super) struct Deadline {
    pub at: Timestamp,
    pub slot: u32,
    pub generation: u32,
}

// Pending PIT deadlines, earliest first.
// Erasing an entry leaves its items in place. The table skips them once due, and sweeps
//  them out with `retain` when too many pile up.
#[derive(Default)]
pub(super) struct TimeoutQueue {
    heap: BinaryHeap<Reverse<Deadline>>,
}

impl TimeoutQueue {
    pub fn schedule(&mut self, deadline: Deadline) {
        self.heap.push(Reverse(deadline));
    }

    // Next deadline that is due at `now`
    pub fn pop_due(&mut self, now: Timestamp) -> Option<Deadline> {
        match self.heap.peek() {
            Some(Reverse(d)) if d.at <= now => self.heap.pop().map(|Reverse(d)| d),
            _ => None,
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Deadline) -> bool) {
        self.heap.retain(|Reverse(d)| keep(d));
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deadline(at: u64, slot: u32) -> Deadline {
        Deadline {
            at: Timestamp::from_ms(at),
            slot,
            generation: 0,
        }
    }

    #[test]
    fn test_pop_in_order() {
        let mut queue = TimeoutQueue::default();
        queue.schedule(deadline(300, 1));
        queue.schedule(deadline(100, 2));
        queue.schedule(deadline(200, 3));

        assert_eq!(queue.pop_due(Timestamp::from_ms(50)), None);
        let due: Vec<u32> = std::iter::from_fn(|| queue.pop_due(Timestamp::from_ms(200)))
            .map(|d| d.slot)
            .collect();
        assert_eq!(due, vec![2, 3]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_due(Timestamp::from_ms(300)).map(|d| d.slot), Some(1));
    }

    #[test]
    fn test_retain() {
        let mut queue = TimeoutQueue::default();
        for slot in 0..6 {
            queue.schedule(deadline(100 * slot as u64, slot));
        }
        queue.retain(|d| d.slot % 2 == 1);
        assert_eq!(queue.len(), 3);
        let due: Vec<u32> = std::iter::from_fn(|| queue.pop_due(Timestamp::from_ms(1000)))
            .map(|d| d.slot)
            .collect();
        assert_eq!(due, vec![1, 3, 5]);
    }
}
