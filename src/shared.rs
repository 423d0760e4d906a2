//! Interrupt shim: decoders shared between interrupt handlers and the
//! foreground loop
//!
//! Each decoder lives in a [`Shared`] slot, usually a `static`. Interrupt
//! vectors forward to [`Shared::on_edge`] / [`Shared::on_timeout`]; the
//! foreground loop reaches the same decoder through [`Shared::with`]. Every
//! access runs inside a critical section, so the two sides never observe a
//! half-updated decoder.
//!
//! ```ignore
//! static REMOTE: Shared<RemoteDecoder<...>> = Shared::new();
//!
//! #[interrupt]
//! fn INT1() {
//!     REMOTE.on_edge(TIMER.read_clock());
//! }
//! ```

use core::cell::RefCell;

use critical_section::Mutex;
use myco_core::{SignalDecoder, Tick};

pub struct Shared<T> {
    slot: Mutex<RefCell<Option<T>>>,
}

impl<T> Shared<T> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(None)),
        }
    }

    /// Puts `value` in the slot, returning whatever was there
    pub fn install(&self, value: T) -> Option<T> {
        critical_section::with(|cs| self.slot.borrow_ref_mut(cs).replace(value))
    }

    pub fn take(&self) -> Option<T> {
        critical_section::with(|cs| self.slot.borrow_ref_mut(cs).take())
    }

    pub fn is_installed(&self) -> bool {
        critical_section::with(|cs| self.slot.borrow_ref(cs).is_some())
    }

    /// Runs `f` on the value with interrupts masked. `None` if the slot is
    /// empty.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        critical_section::with(|cs| self.slot.borrow_ref_mut(cs).as_mut().map(f))
    }
}

impl<T: SignalDecoder> Shared<T> {
    /// Capture/external interrupt entry. Edges before installation are dropped.
    pub fn on_edge(&self, tick: Tick) {
        self.with(|decoder| decoder.handle_edge(tick));
    }

    /// Compare interrupt entry
    pub fn on_timeout(&self) {
        self.with(|decoder| decoder.handle_timeout());
    }
}

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        edges: u32,
        last: Tick,
        timeouts: u32,
    }

    impl SignalDecoder for Recorder {
        fn handle_edge(&mut self, tick: Tick) {
            self.edges += 1;
            self.last = tick;
        }

        fn handle_timeout(&mut self) {
            self.timeouts += 1;
        }
    }

    #[test]
    fn test_events_before_install_are_dropped() {
        let slot: Shared<Recorder> = Shared::new();
        slot.on_edge(5);
        slot.on_timeout();
        assert!(!slot.is_installed());
        assert_eq!(slot.with(|r| r.edges), None);
    }

    #[test]
    fn test_events_reach_installed_decoder() {
        let slot = Shared::new();
        assert!(slot.install(Recorder::default()).is_none());

        slot.on_edge(5);
        slot.on_edge(9);
        slot.on_timeout();
        assert_eq!(slot.with(|r| (r.edges, r.last, r.timeouts)), Some((2, 9, 1)));

        let recorder = slot.take().unwrap();
        assert_eq!(recorder.edges, 2);
        assert!(!slot.is_installed());
    }
}
