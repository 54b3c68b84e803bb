//! Virtual-time one-shot timers
//!
//! Timers fire in (due time, scheduling order). A cancelled timer never fires.

use std::collections::BTreeMap;

/// Handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
pub struct TimerQueue<E> {
    now_ms: u64,
    next_seq: u64,
    /// (due, seq) -> event
    pending: BTreeMap<(u64, u64), E>,
    /// seq -> due, for cancellation
    due_by_seq: BTreeMap<u64, u64>,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            pending: BTreeMap::new(),
            due_by_seq: BTreeMap::new(),
        }
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule(&mut self, delay_ms: u64, event: E) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        let due = self.now_ms.saturating_add(delay_ms);
        self.pending.insert((due, seq), event);
        self.due_by_seq.insert(seq, due);
        TimerHandle(seq)
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.due_by_seq.remove(&handle.0) {
            Some(due) => self.pending.remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.due_by_seq.contains_key(&handle.0)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its due time. Timers scheduled while handling it are relative to that
    /// time, so they may also fire within the same window.
    pub fn pop_due(&mut self, until: u64) -> Option<(TimerHandle, E)> {
        let (&(due, seq), _) = self.pending.first_key_value()?;
        if due > until {
            return None;
        }
        let event = self.pending.remove(&(due, seq))?;
        self.due_by_seq.remove(&seq);
        self.now_ms = self.now_ms.max(due);
        Some((TimerHandle(seq), event))
    }

    /// Move the clock forward (never backwards)
    pub fn advance_to(&mut self, until: u64) {
        self.now_ms = self.now_ms.max(until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire_all(queue: &mut TimerQueue<&'static str>, until: u64) -> Vec<&'static str> {
        let mut fired = Vec::new();
        while let Some((_, e)) = queue.pop_due(until) {
            fired.push(e);
        }
        queue.advance_to(until);
        fired
    }

    #[test]
    fn test_fires_in_due_order() {
        let mut q = TimerQueue::new();
        q.schedule(300, "c");
        q.schedule(100, "a");
        q.schedule(100, "b");
        assert_eq!(fire_all(&mut q, 99), Vec::<&str>::new());
        assert_eq!(fire_all(&mut q, 300), vec!["a", "b", "c"]);
        assert_eq!(q.now(), 300);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let h = q.schedule(10, "x");
        assert!(q.is_pending(h));
        assert!(q.cancel(h));
        assert!(!q.cancel(h));
        assert!(fire_all(&mut q, 100).is_empty());
    }

    #[test]
    fn test_rescheduling_inside_window() {
        let mut q = TimerQueue::new();
        q.schedule(100, "first");
        let mut fired = Vec::new();
        while let Some((_, e)) = q.pop_due(250) {
            fired.push(e);
            if e == "first" {
                q.schedule(100, "second");
                q.schedule(200, "late");
            }
        }
        assert_eq!(fired, vec!["first", "second"]);
        assert_eq!(q.len(), 1);
    }
}
