//! Deferred continuation scheduling.
//!
//! When a chain reaches a delayed step, the pipeline parks the cast and asks
//! the scheduler to hand its ID back once the delay has elapsed. The
//! scheduler only orders wake-ups; it never runs anything itself, so every
//! continuation still executes on the tick loop inside
//! [`EffectPipeline::tick`](crate::pipeline::EffectPipeline::tick).

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::core::CastId;

/// Orders cast wake-ups by tick.
pub trait TaskScheduler {
    /// Wake `cast` at tick `due` or later.
    fn schedule(&mut self, due: u64, cast: CastId);

    /// Remove and return every cast due at or before `now`, earliest first.
    /// Casts due on the same tick come back in scheduling order.
    fn due(&mut self, now: u64) -> Vec<CastId>;

    /// Forget any pending wake-up for `cast`.
    fn discard(&mut self, cast: CastId);

    /// Number of pending wake-ups.
    fn pending(&self) -> usize;
}

/// Min-heap scheduler keyed by due tick.
#[derive(Debug, Default)]
pub struct TickQueue {
    heap: BinaryHeap<Reverse<(u64, u64, CastId)>>,
    seq: u64,
}

impl TickQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest pending due tick.
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse((due, _, _))| *due)
    }
}

impl TaskScheduler for TickQueue {
    fn schedule(&mut self, due: u64, cast: CastId) {
        self.seq += 1;
        self.heap.push(Reverse((due, self.seq, cast)));
    }

    fn due(&mut self, now: u64) -> Vec<CastId> {
        let mut ready = Vec::new();
        while let Some(Reverse((due, _, cast))) = self.heap.peek().copied() {
            if due > now {
                break;
            }
            self.heap.pop();
            ready.push(cast);
        }
        ready
    }

    fn discard(&mut self, cast: CastId) {
        self.heap.retain(|Reverse((_, _, id))| *id != cast);
    }

    fn pending(&self) -> usize {
        self.heap.len()
    }
}
