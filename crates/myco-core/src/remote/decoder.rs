use super::{
    FULL_BIT_US, FrameSink, MESSAGE_BITS, PULSE, Phase, REMOTE_TOLERANCE_US, RemoteMessage,
};
use crate::SignalDecoder;
use crate::error::{AcquireError, DecodeFault};
use crate::hal::{CompareChannel, Counter, Edge, EdgeInput, Polarity, Tick};
use crate::timebase::{CaptureLock, CaptureOwner, Duration, OneShot, Timebase, elapsed};

/// Quiet time after the last expected bit before a corrupt frame is dropped
const GUARD_MARGIN: Duration = Duration::from_millis(1);

/// Longest wait for the next edge of a frame that is still being received.
/// Anything past the widest long pulse means the frame was cut off.
pub const EDGE_TIMEOUT: Duration = Duration::from_micros(FULL_BIT_US + 2 * REMOTE_TOLERANCE_US);

/// Remote-control decoder fed by an edge interrupt.
///
/// Decoded frames go to the [`FrameSink`] synchronously from
/// [`SignalDecoder::handle_edge`]. A corrupt frame is not dropped at once:
/// the decoder sits in [`Phase::Error`] until the line has been quiet long
/// enough for the rest of that frame to have passed, so its trailing edges
/// are not mistaken for the start of a new one. A frame that simply stops
/// is dropped once no edge has arrived for [`EDGE_TIMEOUT`].
pub struct RemoteDecoder<'a, C, X, K, H> {
    input: X,
    guard: OneShot<'a, C, K>,
    lock: &'a CaptureLock,
    handler: H,
    polarity: Polarity,
    edge: Edge,
    phase: Phase,
    data: u16,
    bits: u8,
    last_edge: Tick,
    enabled: bool,
    frames_decoded: u32,
    last_fault: Option<DecodeFault>,
}

impl<'a, C, X, K, H> RemoteDecoder<'a, C, X, K, H>
where
    C: Counter,
    X: EdgeInput,
    K: CompareChannel,
    H: FrameSink,
{
    /// Creates a decoder that hands frames to `handler`. It starts disabled.
    pub fn new(
        timebase: &'a Timebase<C>,
        input: X,
        compare: K,
        lock: &'a CaptureLock,
        handler: H,
        polarity: Polarity,
    ) -> Self {
        let mut decoder = Self {
            input,
            guard: timebase.lease(compare),
            lock,
            handler,
            polarity,
            edge: polarity.start_edge(),
            phase: Phase::StartOne,
            data: 0,
            bits: 0,
            last_edge: 0,
            enabled: false,
            frames_decoded: 0,
            last_fault: None,
        };
        decoder.soft_init();
        decoder
    }

    /// Claims the capture channel and starts listening for frames
    pub fn enable(&mut self) -> Result<(), AcquireError> {
        self.lock.claim(CaptureOwner::Remote).map_err(|owner| {
            log::warn!("remote: capture channel held by {:?}", owner);
            AcquireError::CaptureBusy(owner)
        })?;
        self.input.set_edge(self.edge);
        self.input.listen();
        self.enabled = true;
        Ok(())
    }

    /// Stops listening, drops any partial frame and frees the capture channel
    pub fn disable(&mut self) {
        self.input.unlisten();
        self.guard.cancel();
        self.lock.release(CaptureOwner::Remote);
        self.enabled = false;
        self.soft_init();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bits_received(&self) -> u8 {
        self.bits
    }

    pub fn frames_decoded(&self) -> u32 {
        self.frames_decoded
    }

    pub fn last_fault(&self) -> Option<DecodeFault> {
        self.last_fault
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Back to waiting for a start bit on the polarity's start edge
    fn soft_init(&mut self) {
        self.data = 0;
        self.bits = 0;
        self.phase = Phase::StartOne;
        self.edge = self.polarity.start_edge();
        self.input.set_edge(self.edge);
    }

    /// (Re)arms the end-of-frame guard for the bits still outstanding
    fn arm_guard(&mut self) {
        let remaining = MESSAGE_BITS.saturating_sub(self.bits) as u32;
        let quiet = GUARD_MARGIN + Duration::from_micros(remaining * FULL_BIT_US);
        if let Err(err) = self.guard.schedule(quiet) {
            log::warn!("remote: {}", err);
        }
    }

    fn accept(&mut self, next: Phase, tick: Tick) {
        if let Some(bit) = next.bit() {
            self.data = (self.data << 1) | bit as u16;
            self.bits += 1;
        }

        if self.bits == MESSAGE_BITS {
            let message = RemoteMessage::from_raw(self.data);
            self.frames_decoded = self.frames_decoded.wrapping_add(1);
            log::debug!(
                "remote: address {} command {} toggle {}",
                message.address(),
                message.command(),
                message.toggle_bit() as u8
            );
            self.guard.cancel();
            self.handler.on_frame(message);
            self.soft_init();
            return;
        }

        self.phase = next;
        self.last_edge = tick;
        self.edge = self.edge.toggled();
        self.input.set_edge(self.edge);
        if let Err(err) = self.guard.schedule(EDGE_TIMEOUT) {
            log::warn!("remote: {}", err);
        }
    }
}

impl<C, X, K, H> SignalDecoder for RemoteDecoder<'_, C, X, K, H>
where
    C: Counter,
    X: EdgeInput,
    K: CompareChannel,
    H: FrameSink,
{
    fn handle_edge(&mut self, tick: Tick) {
        if !self.enabled {
            return;
        }

        if self.phase == Phase::Error {
            self.arm_guard();
            return;
        }

        let width = elapsed(tick, self.last_edge);
        let next = if self.bits == 0 {
            // The first edge is the middle of the start bit
            Phase::MidOne
        } else {
            self.phase.transition(PULSE.classify(width))
        };

        if next == Phase::Error {
            let fault = DecodeFault::PulseOutOfTolerance {
                phase: self.phase.name(),
                width_us: width.as_micros(),
            };
            log::debug!("remote: {} (after {} bits)", fault, self.bits);
            self.last_fault = Some(fault);
            self.phase = Phase::Error;
            self.arm_guard();
            return;
        }

        self.accept(next, tick);
    }

    fn handle_timeout(&mut self) {
        self.guard.expire();
        let fault = match self.phase {
            Phase::Error => DecodeFault::FrameGuardTimeout { bits: self.bits },
            // Frame stopped partway through
            phase if self.bits > 0 => DecodeFault::Timeout { phase: phase.name() },
            _ => return,
        };

        log::debug!("remote: {} (after {} bits)", fault, self.bits);
        self.last_fault = Some(fault);
        self.soft_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{CompareTap, EdgeTap, MockCompare, MockCounter, MockEdgeInput};
    use crate::synth;
    use heapless::Vec;

    type Received = Vec<RemoteMessage, 8>;
    type TestDecoder<'a, H> = RemoteDecoder<'a, MockCounter, MockEdgeInput<'a>, MockCompare<'a>, H>;

    struct Rig {
        timebase: Timebase<MockCounter>,
        input: EdgeTap,
        compare: CompareTap,
        lock: CaptureLock,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                timebase: Timebase::new(MockCounter::new(60_000)),
                input: EdgeTap::new(),
                compare: CompareTap::new(),
                lock: CaptureLock::new(),
            }
        }

        fn decoder<H: FrameSink>(&self, handler: H, polarity: Polarity) -> TestDecoder<'_, H> {
            RemoteDecoder::new(
                &self.timebase,
                MockEdgeInput::new(&self.input),
                MockCompare::new(&self.compare),
                &self.lock,
                handler,
                polarity,
            )
        }

        /// Delivers each edge only if the input is listening for that direction
        fn play<H: FrameSink>(&self, remote: &mut TestDecoder<'_, H>, edges: &[(Edge, Duration)]) {
            for (edge, after) in edges {
                let tick = self.timebase.counter().advance(*after);
                if self.input.is_listening() && self.input.edge() == Some(*edge) {
                    remote.handle_edge(tick);
                }
            }
        }

        fn pause(&self, by: Duration) {
            self.timebase.counter().advance(by);
        }
    }

    fn collect(received: &mut Received) -> impl FnMut(RemoteMessage) + '_ {
        move |message| {
            let _ = received.push(message);
        }
    }

    #[test]
    fn test_decodes_frame_with_inverted_receiver() {
        let rig = Rig::new();
        let mut received = Received::new();
        let sent = RemoteMessage::from_fields(true, true, 5, 12);
        {
            let mut remote = rig.decoder(collect(&mut received), Polarity::Inverted);
            remote.enable().unwrap();
            assert_eq!(rig.input.edge(), Some(Edge::Falling));

            rig.play(&mut remote, &synth::remote_edges(sent, Polarity::Inverted));
            assert_eq!(remote.frames_decoded(), 1);
            assert_eq!(remote.bits_received(), 0);
            assert_eq!(rig.input.edge(), Some(Edge::Falling));
            assert_eq!(rig.compare.armed_at(), None);
        }

        assert_eq!(received.len(), 1);
        let message = received[0];
        assert_eq!(message, sent);
        assert_eq!(message.address(), 5);
        assert_eq!(message.command(), 12);
        assert!(message.toggle_bit());
    }

    #[test]
    fn test_decodes_frame_with_normal_receiver() {
        let rig = Rig::new();
        let mut received = Received::new();
        let sent = RemoteMessage::from_fields(false, false, 0, 0x2A);
        {
            let mut remote = rig.decoder(collect(&mut received), Polarity::Normal);
            remote.enable().unwrap();
            assert_eq!(rig.input.edge(), Some(Edge::Rising));
            rig.play(&mut remote, &synth::remote_edges(sent, Polarity::Normal));
        }
        assert_eq!(received.as_slice(), &[sent]);
    }

    #[test]
    fn test_back_to_back_frames() {
        let rig = Rig::new();
        let mut received = Received::new();
        let first = RemoteMessage::from_fields(true, false, 5, 16);
        let second = RemoteMessage::from_fields(true, true, 5, 17);
        {
            let mut remote = rig.decoder(collect(&mut received), Polarity::Inverted);
            remote.enable().unwrap();
            rig.play(&mut remote, &synth::remote_edges(first, Polarity::Inverted));
            rig.pause(Duration::from_millis(50));
            rig.play(&mut remote, &synth::remote_edges(second, Polarity::Inverted));
        }
        assert_eq!(received.as_slice(), &[first, second]);
    }

    #[test]
    fn test_corrupt_frame_waits_for_quiet_line() {
        let rig = Rig::new();
        let mut received = Received::new();
        let sent = RemoteMessage::from_fields(true, true, 5, 12);
        let edges = synth::remote_edges(sent, Polarity::Inverted);
        {
            let mut remote = rig.decoder(collect(&mut received), Polarity::Inverted);
            remote.enable().unwrap();

            // Start of a frame, then a pulse that fits neither window
            rig.play(&mut remote, &edges[..4]);
            let bits = remote.bits_received();
            let now = rig.timebase.counter().advance(Duration::from_micros(1_300));
            remote.handle_edge(now);
            assert_eq!(remote.phase(), Phase::Error);
            assert!(matches!(
                remote.last_fault(),
                Some(DecodeFault::PulseOutOfTolerance { width_us: 1_300, .. })
            ));
            let first_deadline = rig.compare.armed_at().unwrap();
            let expected = 1_000 + (MESSAGE_BITS - bits) as u32 * FULL_BIT_US;
            assert_eq!(first_deadline, now.wrapping_add(expected as u16));
            let arms = rig.compare.arm_count();

            // More edges from the broken frame push the deadline out
            let later = rig.timebase.counter().advance(Duration::from_micros(889));
            remote.handle_edge(later);
            assert_eq!(remote.phase(), Phase::Error);
            assert_eq!(rig.compare.armed_at(), Some(later.wrapping_add(expected as u16)));
            assert_eq!(rig.compare.arm_count(), arms + 1);

            rig.pause(Duration::from_micros(expected));
            remote.handle_timeout();
            assert_eq!(remote.bits_received(), 0);
            assert_eq!(rig.compare.armed_at(), None);
            assert_eq!(remote.phase(), Phase::StartOne);
            assert_eq!(
                remote.last_fault(),
                Some(DecodeFault::FrameGuardTimeout { bits })
            );
            // Start edge restored for the next frame
            assert_eq!(rig.input.edge(), Some(Edge::Falling));

            rig.pause(Duration::from_millis(5));
            rig.play(&mut remote, &edges);
            assert_eq!(remote.frames_decoded(), 1);
        }
        assert_eq!(received.as_slice(), &[sent]);
    }

    #[test]
    fn test_lone_glitch_does_not_swallow_next_frame() {
        let rig = Rig::new();
        let mut received = Received::new();
        let sent = RemoteMessage::from_fields(true, true, 5, 12);
        {
            let mut remote = rig.decoder(collect(&mut received), Polarity::Inverted);
            remote.enable().unwrap();

            // A single noise edge on an idle line looks like a start bit
            let glitch = rig.timebase.counter().advance(Duration::from_millis(3));
            remote.handle_edge(glitch);
            assert_eq!(remote.bits_received(), 1);
            let deadline = glitch.wrapping_add(EDGE_TIMEOUT.as_micros() as u16);
            assert_eq!(rig.compare.armed_at(), Some(deadline));

            rig.pause(EDGE_TIMEOUT);
            remote.handle_timeout();
            assert_eq!(remote.bits_received(), 0);
            assert_eq!(remote.phase(), Phase::StartOne);
            assert_eq!(
                remote.last_fault(),
                Some(DecodeFault::Timeout {
                    phase: Phase::MidOne.name()
                })
            );
            assert_eq!(rig.input.edge(), Some(Edge::Falling));

            rig.pause(Duration::from_millis(50));
            rig.play(&mut remote, &synth::remote_edges(sent, Polarity::Inverted));
            assert_eq!(remote.frames_decoded(), 1);
        }
        assert_eq!(received.as_slice(), &[sent]);
    }

    #[test]
    fn test_truncated_frame_is_dropped() {
        let rig = Rig::new();
        let mut received = Received::new();
        let cut = RemoteMessage::from_fields(true, false, 3, 33);
        let sent = RemoteMessage::from_fields(true, true, 3, 32);
        {
            let mut remote = rig.decoder(collect(&mut received), Polarity::Inverted);
            remote.enable().unwrap();

            rig.play(&mut remote, &synth::remote_edges(cut, Polarity::Inverted)[..12]);
            assert!(remote.bits_received() > 0);
            assert!(rig.compare.armed_at().is_some());

            rig.pause(EDGE_TIMEOUT);
            remote.handle_timeout();
            assert_eq!(remote.bits_received(), 0);
            assert!(matches!(remote.last_fault(), Some(DecodeFault::Timeout { .. })));

            rig.pause(Duration::from_millis(20));
            rig.play(&mut remote, &synth::remote_edges(sent, Polarity::Inverted));
        }
        assert_eq!(received.as_slice(), &[sent]);
    }

    #[test]
    fn test_spurious_timeout_while_idle_is_ignored() {
        let rig = Rig::new();
        let mut remote = rig.decoder(|_: RemoteMessage| {}, Polarity::Inverted);
        remote.enable().unwrap();

        remote.handle_timeout();
        assert_eq!(remote.phase(), Phase::StartOne);
        assert_eq!(remote.last_fault(), None);
    }

    #[test]
    fn test_disabled_decoder_ignores_edges() {
        let rig = Rig::new();
        let mut received = Received::new();
        let sent = RemoteMessage::from_fields(true, false, 1, 1);
        {
            let mut remote = rig.decoder(collect(&mut received), Polarity::Inverted);
            assert!(!remote.is_enabled());
            for (_, after) in synth::remote_edges(sent, Polarity::Inverted) {
                let tick = rig.timebase.counter().advance(after);
                remote.handle_edge(tick);
            }
            assert_eq!(remote.bits_received(), 0);
        }
        assert!(received.is_empty());
    }

    #[test]
    fn test_enable_conflicts_with_sensor() {
        let rig = Rig::new();
        let mut remote = rig.decoder(|_: RemoteMessage| {}, Polarity::Inverted);

        rig.lock.claim(CaptureOwner::Sensor).unwrap();
        assert_eq!(
            remote.enable(),
            Err(AcquireError::CaptureBusy(CaptureOwner::Sensor))
        );
        assert!(!rig.input.is_listening());

        rig.lock.release(CaptureOwner::Sensor);
        remote.enable().unwrap();
        assert_eq!(rig.lock.holder(), Some(CaptureOwner::Remote));

        remote.disable();
        assert!(!rig.input.is_listening());
        assert_eq!(rig.lock.holder(), None);
    }
}
