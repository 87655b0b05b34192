//! Deadline queue behind a host's one-shot and repeating timers.
//!
//! Deadlines are offsets from the host's start. Timers that fall due at the
//! same instant fire in the order they were armed. A repeating timer is
//! re-armed from its previous deadline rather than from the time it was
//! serviced, so late servicing does not accumulate drift.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;
use tracing::trace;

/// Shortest interval a repeating timer is allowed to run at
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
enum TimerKind {
    Once,
    Repeating(Duration),
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<(Duration, u64, TimerId)>>,
    active: HashMap<TimerId, TimerKind>,
    next_id: u64,
    seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_once(&mut self, now: Duration, delay: Duration) -> TimerId {
        let id = self.allocate(TimerKind::Once);
        self.push(now + delay, id);
        trace!(%id, ?delay, "one-shot timer armed");
        id
    }

    pub fn schedule_repeating(&mut self, now: Duration, interval: Duration) -> TimerId {
        let interval = interval.max(MIN_INTERVAL);
        let id = self.allocate(TimerKind::Repeating(interval));
        self.push(now + interval, id);
        trace!(%id, ?interval, "repeating timer armed");
        id
    }

    /// Returns false if the timer had already fired or been cancelled
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let was_active = self.active.remove(&id).is_some();
        if was_active {
            trace!(%id, "timer cancelled");
        }
        was_active
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.active.clear();
    }

    /// Earliest pending deadline
    pub fn next_deadline(&mut self) -> Option<Duration> {
        self.drop_stale();
        self.heap.peek().map(|Reverse((deadline, _, _))| *deadline)
    }

    /// Removes the earliest timer due at or before `now`, re-arming it if it
    /// repeats. Returns the timer and the deadline it fired for.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, Duration)> {
        self.pop(now, false)
    }

    /// Like [`pop_due`](Self::pop_due), but a repeating timer that is more
    /// than one interval behind fires once and skips to its next deadline
    /// after `now`. Deadlines stay on the timer's original grid.
    pub fn pop_due_coalesced(&mut self, now: Duration) -> Option<(TimerId, Duration)> {
        self.pop(now, true)
    }

    fn pop(&mut self, now: Duration, coalesce: bool) -> Option<(TimerId, Duration)> {
        self.drop_stale();
        let Reverse((deadline, _, id)) = *self.heap.peek()?;
        if deadline > now {
            return None;
        }
        self.heap.pop();
        match self.active.get(&id).copied() {
            Some(TimerKind::Once) => {
                self.active.remove(&id);
            }
            Some(TimerKind::Repeating(interval)) => {
                let skipped = if coalesce {
                    let behind = (now - deadline).as_nanos() / interval.as_nanos();
                    u32::try_from(behind).unwrap_or(u32::MAX - 1)
                } else {
                    0
                };
                if skipped > 0 {
                    trace!(%id, skipped, "late ticks coalesced");
                }
                self.push(deadline + interval * (skipped + 1), id);
            }
            None => unreachable!("stale entries are dropped above"),
        }
        Some((id, deadline))
    }

    fn allocate(&mut self, kind: TimerKind) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.active.insert(id, kind);
        id
    }

    fn push(&mut self, deadline: Duration, id: TimerId) {
        self.heap.push(Reverse((deadline, self.seq, id)));
        self.seq += 1;
    }

    fn drop_stale(&mut self) {
        while let Some(Reverse((_, _, id))) = self.heap.peek() {
            if self.active.contains_key(id) {
                break;
            }
            self.heap.pop();
        }
    }
}
