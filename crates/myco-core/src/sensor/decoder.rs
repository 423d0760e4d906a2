use embedded_hal::digital::OutputPin;

use super::frame::FrameAccumulator;
use super::{Sensor, SensorReading, SensorState, SensorStatus};
use crate::SignalDecoder;
use crate::error::{AcquireError, DecodeFault};
use crate::hal::{CompareChannel, Counter, EdgeInput, Tick};
use crate::pulse::{PulseClass, PulseClassifier, Window};
use crate::timebase::{CaptureLock, CaptureOwner, Duration, OneShot, Timebase, elapsed};

/// Accepted deviation from every nominal width
pub const SENSOR_TOLERANCE_US: u32 = 20;

/// How long the host holds the line low to wake the sensor
pub const REQUEST_HOLD: Duration = Duration::from_millis(1);

/// Upper bound on a complete reply, measured from line release.
/// A worst-case frame is just under 5 ms.
pub const FRAME_GUARD: Duration = Duration::from_millis(8);

const _: () = assert!(FRAME_GUARD.to_ticks().is_some());

const RESPONSE_DELAY: Window = Window::up_to(40 + SENSOR_TOLERANCE_US);
const ACK: Window = Window::around(80, SENSOR_TOLERANCE_US);
const DATA_START: Window = Window::around(80, SENSOR_TOLERANCE_US);
const BIT_START: Window = Window::around(50, SENSOR_TOLERANCE_US);
const BIT_VALUE: PulseClassifier = PulseClassifier::new(
    Window::around(27, SENSOR_TOLERANCE_US),
    Window::around(70, SENSOR_TOLERANCE_US),
);

/// Interrupt-driven decoder for one sensor on a capture input.
///
/// The foreground calls [`SensorDecoder::start_acquisition`]; everything after
/// that happens in [`SignalDecoder::handle_timeout`] (request pulse end, frame
/// guard) and [`SignalDecoder::handle_edge`] (one call per captured edge).
pub struct SensorDecoder<'a, C, P, X, K> {
    timebase: &'a Timebase<C>,
    line: P,
    capture: X,
    timer: OneShot<'a, C, K>,
    lock: &'a CaptureLock,
    state: SensorState,
    phase_start: Tick,
    frame: FrameAccumulator,
    reading: SensorReading,
    last_fault: Option<DecodeFault>,
}

impl<'a, C, P, X, K> SensorDecoder<'a, C, P, X, K>
where
    C: Counter,
    P: OutputPin,
    X: EdgeInput,
    K: CompareChannel,
{
    pub fn new(
        timebase: &'a Timebase<C>,
        line: P,
        capture: X,
        compare: K,
        lock: &'a CaptureLock,
    ) -> Self {
        Self {
            timebase,
            line,
            capture,
            timer: timebase.lease(compare),
            lock,
            state: SensorState::Idle,
            phase_start: 0,
            frame: FrameAccumulator::new(),
            reading: SensorReading::default(),
            last_fault: None,
        }
    }

    /// Starts the request pulse. Only valid while idle; requests are never
    /// queued.
    pub fn start_acquisition(&mut self) -> Result<(), AcquireError> {
        if self.state != SensorState::Idle {
            log::warn!("sensor: acquisition requested while {}", self.state.name());
            return Err(AcquireError::InProgress);
        }

        self.lock.claim(CaptureOwner::Sensor).map_err(|owner| {
            log::warn!("sensor: capture channel held by {:?}", owner);
            AcquireError::CaptureBusy(owner)
        })?;

        if self.line.set_low().is_err() {
            self.release_line();
            self.lock.release(CaptureOwner::Sensor);
            return Err(AcquireError::Line);
        }

        if let Err(err) = self.timer.schedule(REQUEST_HOLD) {
            self.release_line();
            self.lock.release(CaptureOwner::Sensor);
            return Err(err.into());
        }

        self.frame.clear();
        self.last_fault = None;
        self.state = SensorState::Requesting;
        Ok(())
    }

    /// Status for the foreground loop. No side effects.
    pub fn poll_state(&self) -> SensorStatus {
        self.state.status()
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn bits_received(&self) -> u8 {
        self.frame.count()
    }

    pub fn last_fault(&self) -> Option<DecodeFault> {
        self.last_fault
    }

    /// Last published temperature in tenths of a degree.
    ///
    /// Always returns the decoder to idle, tearing down an acquisition that
    /// is still running.
    pub fn read_temperature(&mut self) -> i16 {
        let value = self.reading.temperature_deci_celsius;
        self.reset();
        value
    }

    /// Last published humidity in tenths of a percent. Resets like
    /// [`Self::read_temperature`].
    pub fn read_humidity(&mut self) -> u16 {
        let value = self.reading.humidity_deci_percent;
        self.reset();
        value
    }

    /// Both values from the same frame, if one is ready
    pub fn take_reading(&mut self) -> Option<SensorReading> {
        if self.state != SensorState::Ready {
            return None;
        }
        self.state = SensorState::Idle;
        Some(self.reading)
    }

    fn reset(&mut self) {
        if self.state != SensorState::Idle && self.state != SensorState::Ready {
            log::debug!("sensor: acquisition cancelled while {}", self.state.name());
            self.teardown();
        }
        self.state = SensorState::Idle;
    }

    /// Release every resource an acquisition holds
    fn teardown(&mut self) {
        self.frame.clear();
        self.capture.unlisten();
        self.timer.cancel();
        self.release_line();
        self.lock.release(CaptureOwner::Sensor);
    }

    fn abort(&mut self, fault: DecodeFault) {
        log::debug!("sensor: {} (after {} bits)", fault, self.frame.count());
        self.teardown();
        self.state = SensorState::Idle;
        self.last_fault = Some(fault);
    }

    fn release_line(&mut self) {
        if self.line.set_high().is_err() {
            log::warn!("sensor: failed to release data line");
        }
    }

    fn enter(&mut self, next: SensorState) {
        self.state = next;
        if let Some(edge) = next.capture_edge() {
            self.capture.set_edge(edge);
        }
    }

    fn finish(&mut self) {
        match self.frame.decode() {
            Ok(reading) => {
                self.capture.unlisten();
                self.timer.cancel();
                self.lock.release(CaptureOwner::Sensor);
                self.frame.clear();
                self.reading = reading;
                self.state = SensorState::Ready;
                log::info!(
                    "sensor: {:.1} C, {:.1} %RH",
                    reading.temperature_celsius(),
                    reading.humidity_percent()
                );
            }
            Err(fault) => self.abort(fault),
        }
    }

    /// Checks `width` against the window for the current state and moves on
    fn expect(&mut self, window: Window, width: Duration, next: SensorState) {
        if window.contains(width) {
            self.enter(next);
        } else {
            self.abort(DecodeFault::PulseOutOfTolerance {
                phase: self.state.name(),
                width_us: width.as_micros(),
            });
        }
    }
}

impl<C, P, X, K> SignalDecoder for SensorDecoder<'_, C, P, X, K>
where
    C: Counter,
    P: OutputPin,
    X: EdgeInput,
    K: CompareChannel,
{
    fn handle_edge(&mut self, tick: Tick) {
        if !self.state.is_capturing() {
            return;
        }

        let width = elapsed(tick, self.phase_start);
        self.phase_start = tick;

        match self.state {
            SensorState::AwaitAck => self.expect(RESPONSE_DELAY, width, SensorState::AckPhase),
            SensorState::AckPhase => self.expect(ACK, width, SensorState::AwaitBitStart),
            SensorState::AwaitBitStart => self.expect(DATA_START, width, SensorState::AwaitBit),
            SensorState::AwaitBit => self.expect(BIT_START, width, SensorState::BitPhase),
            SensorState::BitPhase => {
                let bit = match BIT_VALUE.classify(width) {
                    PulseClass::Short => false,
                    PulseClass::Long => true,
                    PulseClass::Invalid => {
                        self.abort(DecodeFault::PulseOutOfTolerance {
                            phase: self.state.name(),
                            width_us: width.as_micros(),
                        });
                        return;
                    }
                };
                self.frame.push(bit);
                if self.frame.is_complete() {
                    self.finish();
                } else {
                    self.enter(SensorState::AwaitBit);
                }
            }
            _ => {}
        }
    }

    fn handle_timeout(&mut self) {
        self.timer.expire();

        match self.state {
            SensorState::Requesting => {
                self.release_line();
                self.phase_start = self.timebase.read_clock();
                self.enter(SensorState::AwaitAck);
                self.capture.listen();
                if let Err(err) = self.timer.schedule(FRAME_GUARD) {
                    log::warn!("sensor: {}", err);
                    self.abort(DecodeFault::Timeout {
                        phase: SensorState::Requesting.name(),
                    });
                }
            }
            state if state.is_capturing() => {
                self.abort(DecodeFault::Timeout { phase: state.name() });
            }
            _ => {}
        }
    }
}

impl<C, P, X, K> Sensor for SensorDecoder<'_, C, P, X, K>
where
    C: Counter,
    P: OutputPin,
    X: EdgeInput,
    K: CompareChannel,
{
    fn start_acquisition(&mut self) -> Result<(), AcquireError> {
        SensorDecoder::start_acquisition(self)
    }

    fn poll_state(&self) -> SensorStatus {
        SensorDecoder::poll_state(self)
    }

    fn take_reading(&mut self) -> Option<SensorReading> {
        SensorDecoder::take_reading(self)
    }

    fn last_fault(&self) -> Option<DecodeFault> {
        SensorDecoder::last_fault(self)
    }
}
