//! Logical time and the tick-loop-only marker.
//!
//! The host drives a single logical tick loop. Everything that touches
//! world state (capability calls, resource pools, cooldowns) requires a
//! [`Tick`] token, and a `Tick` can only be minted by the [`TickLoop`]
//! and cannot leave the thread that minted it.
//!
//! ```
//! use spellcore::core::TickLoop;
//!
//! let mut clock = TickLoop::new();
//! assert_eq!(clock.current().now(), 0);
//!
//! let tick = clock.advance();
//! assert_eq!(tick.now(), 1);
//! ```
//!
//! `Tick` is neither `Send` nor `Sync`:
//!
//! ```compile_fail
//! fn assert_send<T: Send>() {}
//! assert_send::<spellcore::core::Tick>();
//! ```
//!
//! A `TickLoop` cannot be cloned, so a second clock never shares its count:
//!
//! ```compile_fail
//! let clock = spellcore::core::TickLoop::new();
//! let copy = clock.clone();
//! ```

use std::marker::PhantomData;

/// Host ticks per second.
pub const TICKS_PER_SECOND: u64 = 20;

/// Convert seconds to whole ticks, rounding down.
#[must_use]
pub fn seconds_to_ticks(seconds: f64) -> u64 {
    if seconds <= 0.0 {
        0
    } else {
        (seconds * TICKS_PER_SECOND as f64) as u64
    }
}

/// Owner of logical time.
///
/// Exactly one `TickLoop` should exist per host tick loop. It is `Send` so
/// it can be moved onto that loop at startup, but the tokens it hands out
/// are pinned to the thread that requested them.
///
/// The constructors are public, so a `Tick` proves only that its holder is
/// on the thread owning *some* `TickLoop`. Keeping a single one, owned by
/// the tick thread, is the embedder's job. It is neither `Clone` nor
/// serializable; persist [`now`](Self::now) and rebuild with
/// [`starting_at`](Self::starting_at) instead.
#[derive(Debug, Default)]
pub struct TickLoop {
    now: u64,
}

impl TickLoop {
    /// Start at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self { now: 0 }
    }

    /// Start at an arbitrary tick, e.g. the host's current server tick.
    #[must_use]
    pub fn starting_at(now: u64) -> Self {
        Self { now }
    }

    /// The current tick number.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Token for the current tick.
    #[must_use]
    pub fn current(&self) -> Tick {
        Tick::at(self.now)
    }

    /// Move to the next tick and return its token.
    pub fn advance(&mut self) -> Tick {
        self.now += 1;
        Tick::at(self.now)
    }

    /// Jump forward by `ticks` and return the token for the new tick.
    pub fn advance_by(&mut self, ticks: u64) -> Tick {
        self.now += ticks;
        Tick::at(self.now)
    }
}

/// Proof that the caller is running on the host tick loop.
///
/// The raw-pointer marker makes this `!Send + !Sync`: a `Tick` cannot be
/// handed to a background thread, so neither can anything that needs one.
#[derive(Debug)]
pub struct Tick {
    now: u64,
    _tick_thread_only: PhantomData<*const ()>,
}

impl Tick {
    fn at(now: u64) -> Self {
        Self {
            now,
            _tick_thread_only: PhantomData,
        }
    }

    /// The tick number this token was minted for.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let mut clock = TickLoop::starting_at(100);
        assert_eq!(clock.advance().now(), 101);
        assert_eq!(clock.advance_by(19).now(), 120);
        assert_eq!(clock.now(), 120);
        assert_eq!(clock.current().now(), 120);
    }

    #[test]
    fn test_restart_from_persisted_tick() {
        let mut clock = TickLoop::new();
        clock.advance_by(250);
        let saved = clock.now();

        let mut restarted = TickLoop::starting_at(saved);
        assert_eq!(restarted.current().now(), 250);
        assert_eq!(restarted.advance().now(), 251);
    }

    #[test]
    fn test_seconds_to_ticks() {
        assert_eq!(seconds_to_ticks(1.0), 20);
        assert_eq!(seconds_to_ticks(0.5), 10);
        assert_eq!(seconds_to_ticks(-3.0), 0);
    }
}
