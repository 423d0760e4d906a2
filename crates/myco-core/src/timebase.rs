//! Shared time base built on the free-running hardware counter
//!
//! One [`Timebase`] owns the counter and is shared by reference between the
//! decoders. It hands out two kinds of capability:
//!
//! - **Counter reads** through [`Timebase::read_clock`], available to anyone
//!   holding a reference.
//! - **Compare-channel leases** through [`Timebase::lease`]. Each feature gets
//!   its own [`OneShot`] wrapping exactly one compare channel, so a decoder can
//!   never re-arm or cancel another decoder's timeout.
//!
//! The capture input is arbitrated separately by [`CaptureLock`], because on
//! some parts both decoders are wired to the same capture channel.

use core::cell::Cell;
use core::ops::Add;

use critical_section::Mutex;

use crate::config::{COUNTER_MODULUS, CPU_CLOCK_MHZ, TIMER_PRESCALER};
use crate::error::ScheduleError;
use crate::hal::{CompareChannel, Counter, Tick};

/// Non-negative span of time in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Duration(u32);

impl Duration {
    pub const ZERO: Self = Self(0);

    pub const fn from_micros(micros: u32) -> Self {
        Self(micros)
    }

    pub const fn from_millis(millis: u32) -> Self {
        Self(millis * 1_000)
    }

    /// Converts a tick count using the configured clock and prescaler
    pub const fn from_ticks(ticks: u32) -> Self {
        Self(((ticks as u64 * TIMER_PRESCALER as u64) / CPU_CLOCK_MHZ as u64) as u32)
    }

    pub const fn as_micros(self) -> u32 {
        self.0
    }

    /// Number of counter ticks covering this duration.
    ///
    /// Returns `None` when the duration spans a full counter period or more,
    /// since a compare match that far ahead would be indistinguishable from
    /// one that already wrapped. A zero duration rounds up to one tick.
    pub const fn to_ticks(self) -> Option<Tick> {
        let ticks = (self.0 as u64 * CPU_CLOCK_MHZ as u64) / TIMER_PRESCALER as u64;
        if ticks >= COUNTER_MODULUS as u64 {
            None
        } else if ticks == 0 {
            Some(1)
        } else {
            Some(ticks as Tick)
        }
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

/// Time between two counter values, correct across one counter wraparound.
///
/// `later - earlier` is taken modulo the counter period before conversion, so
/// `elapsed(10, 65530)` is 16 ticks rather than a negative or overflowed value.
pub const fn elapsed(later: Tick, earlier: Tick) -> Duration {
    let ticks = (later as u32 + COUNTER_MODULUS - earlier as u32) % COUNTER_MODULUS;
    Duration::from_ticks(ticks)
}

/// Owner of the free-running counter
pub struct Timebase<C> {
    counter: C,
}

impl<C: Counter> Timebase<C> {
    pub const fn new(counter: C) -> Self {
        Self { counter }
    }

    /// Current counter value, read with interrupts masked
    pub fn read_clock(&self) -> Tick {
        critical_section::with(|_| self.counter.read())
    }

    /// Binds one compare channel to the caller as a one-shot timer
    pub fn lease<K: CompareChannel>(&self, channel: K) -> OneShot<'_, C, K> {
        OneShot {
            timebase: self,
            channel,
            deadline: None,
        }
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }
}

/// A leased compare channel that fires at most once per [`OneShot::schedule`]
pub struct OneShot<'a, C, K> {
    timebase: &'a Timebase<C>,
    channel: K,
    deadline: Option<Tick>,
}

impl<'a, C: Counter, K: CompareChannel> OneShot<'a, C, K> {
    /// Arms the channel to fire `delay` from now, replacing any pending deadline.
    ///
    /// Returns the counter value at which the interrupt will fire.
    pub fn schedule(&mut self, delay: Duration) -> Result<Tick, ScheduleError> {
        let ticks = delay
            .to_ticks()
            .ok_or(ScheduleError::OutOfRange(delay.as_micros()))?;
        let at = self.timebase.read_clock().wrapping_add(ticks);
        self.channel.arm(at);
        self.deadline = Some(at);
        Ok(at)
    }

    /// Disarms the channel so a pending deadline never fires
    pub fn cancel(&mut self) {
        self.channel.disarm();
        self.deadline = None;
    }

    /// Acknowledges a compare interrupt. The channel stays disarmed until the
    /// next `schedule`.
    pub fn expire(&mut self) {
        self.cancel();
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

/// Feature currently listening on the capture channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOwner {
    Sensor,
    Remote,
}

/// Arbitration for a capture channel shared between decoders.
///
/// A decoder claims the lock before it starts listening and releases it when
/// it stops. Boards with an independent capture channel per decoder give each
/// decoder its own lock; boards with one shared channel hand both decoders the
/// same lock so a conflicting acquisition is refused instead of corrupting the
/// other decoder's edge configuration.
pub struct CaptureLock {
    owner: Mutex<Cell<Option<CaptureOwner>>>,
}

impl CaptureLock {
    pub const fn new() -> Self {
        Self {
            owner: Mutex::new(Cell::new(None)),
        }
    }

    /// Takes the lock for `who`. Claiming a lock already held by `who` succeeds.
    ///
    /// On conflict returns the current holder.
    pub fn claim(&self, who: CaptureOwner) -> Result<(), CaptureOwner> {
        critical_section::with(|cs| {
            let owner = self.owner.borrow(cs);
            match owner.get() {
                Some(current) if current != who => Err(current),
                _ => {
                    owner.set(Some(who));
                    Ok(())
                }
            }
        })
    }

    /// Releases the lock if `who` holds it
    pub fn release(&self, who: CaptureOwner) {
        critical_section::with(|cs| {
            let owner = self.owner.borrow(cs);
            if owner.get() == Some(who) {
                owner.set(None);
            }
        });
    }

    pub fn holder(&self) -> Option<CaptureOwner> {
        critical_section::with(|cs| self.owner.borrow(cs).get())
    }
}

impl Default for CaptureLock {
    fn default() -> Self {
        Self::new()
    }
}
