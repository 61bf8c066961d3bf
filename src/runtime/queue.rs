//! Bounded priority queue with backpressure.
//!
//! Entries are kept sorted by descending priority, FIFO within a priority
//! band, so the head is always the next event to dispatch. When the queue is
//! full an incoming event either evicts the oldest entry of the lowest band
//! (if it strictly outranks it) or is dropped. Every eviction and every drop
//! bumps `dropped_count`.
//!
//! Insertion is a binary search plus an O(n) shift; dequeue is O(1).

use std::collections::VecDeque;

use serde::Serialize;
use tracing::debug;

use crate::domain::{Event, EventId};

/// Result of offering an event to a full or non-full queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Inserted without displacing anything.
    Inserted,
    /// Inserted after evicting a lower-priority event.
    Evicted(Event),
    /// Rejected: the queue is full of equal-or-higher priority entries.
    Dropped,
}

impl EnqueueOutcome {
    pub fn is_queued(&self) -> bool {
        !matches!(self, Self::Dropped)
    }
}

/// Outcome of cancelling a queued event by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    NotCancellable,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueueStats {
    pub size: usize,
    pub capacity: usize,
    pub dropped_count: u64,
    pub utilization_percent: f64,
}

pub struct PriorityQueue {
    entries: VecDeque<Event>,
    capacity: usize,
    dropped_count: u64,
}

impl PriorityQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            dropped_count: 0,
        }
    }

    /// Offer an event. Returns `true` if it ended up in the queue.
    pub fn enqueue(&mut self, event: Event) -> bool {
        self.offer(event).is_queued()
    }

    /// Offer an event and report exactly what happened to it.
    pub fn offer(&mut self, event: Event) -> EnqueueOutcome {
        if self.entries.len() < self.capacity {
            self.insert_sorted(event);
            return EnqueueOutcome::Inserted;
        }

        // Full. The lowest band sits at the back; its oldest member is the
        // victim.
        let lowest = match self.entries.back() {
            Some(tail) => tail.priority(),
            None => {
                self.dropped_count += 1;
                return EnqueueOutcome::Dropped;
            }
        };

        if lowest >= event.priority() {
            self.dropped_count += 1;
            debug!(
                event = %event.name(),
                priority = event.priority(),
                lowest,
                "Queue full, dropping event"
            );
            return EnqueueOutcome::Dropped;
        }

        let victim_index = self.entries.partition_point(|e| e.priority() > lowest);
        let Some(victim) = self.entries.remove(victim_index) else {
            self.dropped_count += 1;
            return EnqueueOutcome::Dropped;
        };
        self.dropped_count += 1;
        debug!(
            evicted = %victim.name(),
            evicted_priority = victim.priority(),
            incoming = %event.name(),
            incoming_priority = event.priority(),
            "Queue full, evicting lowest-priority event"
        );

        self.insert_sorted(event);
        EnqueueOutcome::Evicted(victim)
    }

    fn insert_sorted(&mut self, event: Event) {
        let index = self
            .entries
            .partition_point(|e| e.priority() >= event.priority());
        self.entries.insert(index, event);
    }

    /// Remove the head: highest priority, oldest among ties.
    pub fn dequeue(&mut self) -> Option<Event> {
        self.entries.pop_front()
    }

    /// Flag a queued event as cancelled so dispatch skips it.
    pub fn cancel(&mut self, id: EventId) -> CancelOutcome {
        match self.entries.iter_mut().find(|e| e.id() == id) {
            Some(event) => {
                if event.cancel() {
                    CancelOutcome::Cancelled
                } else {
                    CancelOutcome::NotCancellable
                }
            }
            None => CancelOutcome::NotFound,
        }
    }

    /// Discard every queued event. Does not count as dropping.
    pub fn clear(&mut self) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        cleared
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    pub fn stats(&self) -> QueueStats {
        let utilization_percent = if self.capacity == 0 {
            100.0
        } else {
            self.entries.len() as f64 / self.capacity as f64 * 100.0
        };
        QueueStats {
            size: self.entries.len(),
            capacity: self.capacity,
            dropped_count: self.dropped_count,
            utilization_percent,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EmitOptions, EventDefinition, Payload};
    use proptest::prelude::*;

    fn event(priority: u8) -> Event {
        let def = EventDefinition::new(format!("p{priority}"), priority, 1000.0);
        Event::new(&def, Payload::new(), EmitOptions::new())
    }

    fn cancellable_event(priority: u8) -> Event {
        let def = EventDefinition::new("soft", priority, 1000.0).cancellable();
        Event::new(&def, Payload::new(), EmitOptions::new())
    }

    fn drain(queue: &mut PriorityQueue) -> Vec<Event> {
        std::iter::from_fn(|| queue.dequeue()).collect()
    }

    #[test]
    fn empty_queue_dequeues_nothing() {
        let mut queue = PriorityQueue::new(4);
        assert!(queue.dequeue().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn dequeues_highest_priority_first() {
        let mut queue = PriorityQueue::new(10);
        for p in [3, 9, 1, 7] {
            queue.enqueue(event(p));
        }
        let order: Vec<_> = drain(&mut queue).iter().map(Event::priority).collect();
        assert_eq!(order, vec![9, 7, 3, 1]);
    }

    #[test]
    fn equal_priorities_are_fifo() {
        let mut queue = PriorityQueue::new(10);
        let first = event(5);
        let second = event(5);
        let third = event(5);
        let ids = [first.id(), second.id(), third.id()];
        queue.enqueue(first);
        queue.enqueue(event(8));
        queue.enqueue(second);
        queue.enqueue(third);

        let drained = drain(&mut queue);
        assert_eq!(drained[0].priority(), 8);
        let band: Vec<_> = drained[1..].iter().map(Event::id).collect();
        assert_eq!(band, ids);
    }

    #[test]
    fn full_queue_drops_equal_priority() {
        let mut queue = PriorityQueue::new(2);
        queue.enqueue(event(5));
        queue.enqueue(event(5));
        let before: Vec<_> = queue.iter().map(Event::id).collect();

        assert!(!queue.enqueue(event(5)));
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.dropped_count(), 1);
        let after: Vec<_> = queue.iter().map(Event::id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn full_queue_drops_lower_priority() {
        let mut queue = PriorityQueue::new(1);
        queue.enqueue(event(5));
        assert_eq!(queue.offer(event(2)), EnqueueOutcome::Dropped);
        assert_eq!(queue.dropped_count(), 1);
    }

    #[test]
    fn higher_priority_evicts_oldest_of_lowest_band() {
        let mut queue = PriorityQueue::new(3);
        let old_low = event(2);
        let old_low_id = old_low.id();
        queue.enqueue(event(6));
        queue.enqueue(old_low);
        queue.enqueue(event(2));

        match queue.offer(event(4)) {
            EnqueueOutcome::Evicted(victim) => assert_eq!(victim.id(), old_low_id),
            other => panic!("expected eviction, got {other:?}"),
        }
        assert_eq!(queue.size(), 3);
        assert_eq!(queue.dropped_count(), 1);

        let order: Vec<_> = drain(&mut queue).iter().map(Event::priority).collect();
        assert_eq!(order, vec![6, 4, 2]);
    }

    #[test]
    fn scenario_overflow_keeps_capacity_and_counts_drops() {
        let mut queue = PriorityQueue::new(1000);
        for _ in 0..1500 {
            queue.enqueue(event(5));
        }
        assert_eq!(queue.size(), 1000);
        assert_eq!(queue.dropped_count(), 500);
    }

    #[test]
    fn zero_capacity_drops_everything() {
        let mut queue = PriorityQueue::new(0);
        assert!(!queue.enqueue(event(10)));
        assert_eq!(queue.dropped_count(), 1);
        assert_eq!(queue.stats().utilization_percent, 100.0);
    }

    #[test]
    fn stats_report_utilization() {
        let mut queue = PriorityQueue::new(4);
        queue.enqueue(event(1));
        queue.enqueue(event(1));
        let stats = queue.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.capacity, 4);
        assert_eq!(stats.dropped_count, 0);
        assert!((stats.utilization_percent - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cancel_marks_only_cancellable_events() {
        let mut queue = PriorityQueue::new(4);
        let soft = cancellable_event(3);
        let hard = event(3);
        let (soft_id, hard_id) = (soft.id(), hard.id());
        queue.enqueue(soft);
        queue.enqueue(hard);

        assert_eq!(queue.cancel(soft_id), CancelOutcome::Cancelled);
        assert_eq!(queue.cancel(hard_id), CancelOutcome::NotCancellable);
        assert_eq!(queue.cancel(EventId::new()), CancelOutcome::NotFound);

        let drained = drain(&mut queue);
        assert!(drained[0].is_cancelled());
        assert!(!drained[1].is_cancelled());
    }

    #[test]
    fn clear_does_not_touch_dropped_count() {
        let mut queue = PriorityQueue::new(1);
        queue.enqueue(event(1));
        queue.enqueue(event(1));
        assert_eq!(queue.clear(), 1);
        assert!(queue.is_empty());
        assert_eq!(queue.dropped_count(), 1);
    }

    proptest! {
        #[test]
        fn dequeue_order_is_non_increasing_and_fifo(priorities in prop::collection::vec(1u8..=10, 0..200)) {
            let mut queue = PriorityQueue::new(priorities.len().max(1));
            let mut inserted = Vec::new();
            for p in &priorities {
                let e = event(*p);
                inserted.push((e.priority(), e.id()));
                queue.enqueue(e);
            }

            let drained = drain(&mut queue);
            prop_assert_eq!(drained.len(), priorities.len());
            for pair in drained.windows(2) {
                prop_assert!(pair[0].priority() >= pair[1].priority());
            }

            for band in 1u8..=10 {
                let expected: Vec<_> = inserted.iter().filter(|(p, _)| *p == band).map(|(_, id)| *id).collect();
                let actual: Vec<_> = drained.iter().filter(|e| e.priority() == band).map(Event::id).collect();
                prop_assert_eq!(expected, actual);
            }
        }

        #[test]
        fn size_never_exceeds_capacity(capacity in 1usize..50, priorities in prop::collection::vec(1u8..=10, 0..300)) {
            let mut queue = PriorityQueue::new(capacity);
            let mut last_dropped = 0;
            for p in priorities {
                let was_full = queue.size() == capacity;
                let size_before = queue.size();
                queue.enqueue(event(p));
                prop_assert!(queue.size() <= capacity);
                prop_assert!(queue.dropped_count() >= last_dropped);
                if was_full {
                    prop_assert_eq!(queue.size(), size_before);
                    prop_assert_eq!(queue.dropped_count(), last_dropped + 1);
                }
                last_dropped = queue.dropped_count();
            }
        }
    }
}
