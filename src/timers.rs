use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

/// Handle for a scheduled continuation, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// One-shot deferred continuations keyed by page time.
///
/// Page time is the `Duration` since page setup. Entries fire in deadline
/// order; entries sharing a deadline fire in the order they were scheduled.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<(Duration, TimerId)>>,
    pending: HashMap<TimerId, T>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn schedule_at(&mut self, deadline: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.heap.push(Reverse((deadline, id)));
        self.pending.insert(id, payload);
        id
    }

    pub fn schedule_in(&mut self, now: Duration, delay: Duration, payload: T) -> TimerId {
        self.schedule_at(now + delay, payload)
    }

    /// Cancelling an id that already fired (or was cancelled) is a no-op
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        self.pending.remove(&id)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pops the earliest entry whose deadline is at or before `now`, along
    /// with that deadline.
    ///
    /// Returns one entry at a time so a fired continuation may schedule
    /// follow-ups that are themselves already due.
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, T)> {
        while let Some(Reverse((deadline, id))) = self.heap.peek().copied() {
            if !self.pending.contains_key(&id) {
                // cancelled
                self.heap.pop();
                continue;
            }
            if deadline > now {
                return None;
            }
            self.heap.pop();
            return self.pending.remove(&id).map(|payload| (deadline, payload));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn nothing_fires_before_its_deadline() {
        let mut q = TimerQueue::new();
        q.schedule_in(ms(0), ms(100), "a");

        assert!(q.pop_due(ms(99)).is_none());
        assert_eq!(q.pop_due(ms(100)).map(|(_, p)| p), Some("a"));
        assert!(q.is_empty());
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule_at(ms(300), 3);
        q.schedule_at(ms(100), 1);
        q.schedule_at(ms(200), 2);

        let fired: Vec<i32> = std::iter::from_fn(|| q.pop_due(ms(1000)).map(|(_, p)| p)).collect();
        assert_eq!(fired, vec![1, 2, 3]);
    }

    #[test]
    fn ties_fire_in_scheduling_order() {
        let mut q = TimerQueue::new();
        q.schedule_at(ms(50), "first");
        q.schedule_at(ms(50), "second");

        assert_eq!(q.pop_due(ms(50)).map(|(_, p)| p), Some("first"));
        assert_eq!(q.pop_due(ms(50)).map(|(_, p)| p), Some("second"));
    }

    #[test]
    fn cancelled_entries_never_fire() {
        let mut q = TimerQueue::new();
        let a = q.schedule_at(ms(10), "a");
        q.schedule_at(ms(20), "b");

        assert_eq!(q.cancel(a), Some("a"));
        assert!(!q.is_pending(a));
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_due(ms(100)).map(|(_, p)| p), Some("b"));
        assert!(q.pop_due(ms(100)).is_none());
    }

    #[test]
    fn cancel_after_fire_is_noop() {
        let mut q = TimerQueue::new();
        let a = q.schedule_at(ms(10), ());
        assert!(q.pop_due(ms(10)).is_some());
        assert_eq!(q.cancel(a), None);
    }
}
