//! Foreground loop: commands in, climate readings out

use log::debug;
use myco_core::sensor::Sensor;

use crate::command_filter::CommandQueue;
use crate::commands::Command;
use crate::config::Config;
use crate::controller::{Backlight, ControlOutcome, Controller, Relays};
use crate::monitor::{Monitor, ReadingSink};
use crate::shared::Shared;

pub struct App<'q, B, R, K> {
    controller: Controller<B, R>,
    monitor: Monitor,
    queue: &'q CommandQueue,
    sink: K,
}

impl<'q, B, R, K> App<'q, B, R, K>
where
    B: Backlight,
    R: Relays,
    K: ReadingSink,
{
    pub fn new(config: &Config, queue: &'q CommandQueue, backlight: B, relays: R, sink: K) -> Self {
        Self {
            controller: Controller::new(backlight, relays, config.backlight_level),
            monitor: Monitor::new(config.acquisition_interval_secs),
            queue,
            sink,
        }
    }

    /// One pass of the foreground loop: drain queued commands, then pick up
    /// any finished reading.
    pub fn step<S>(&mut self, sensor: &Shared<S>)
    where
        S: Sensor,
    {
        while let Ok(code) = self.queue.try_receive() {
            let command = Command::from_code(code);
            if self.controller.dispatch(command) == ControlOutcome::AcquireClimate {
                sensor.with(|sensor| self.monitor.request_now(sensor));
            }
        }

        let (monitor, sink) = (&mut self.monitor, &mut self.sink);
        if sensor.with(|sensor| monitor.service(sensor, sink)).is_none() {
            debug!("app: sensor not installed");
        }
    }

    /// Called once per second from the periodic timer
    pub fn second_elapsed<S>(&mut self, sensor: &Shared<S>)
    where
        S: Sensor,
    {
        sensor.with(|sensor| self.monitor.tick_second(sensor));
    }

    pub fn controller(&self) -> &Controller<B, R> {
        &self.controller
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;
    use myco_core::hal::{Edge, Polarity};
    use myco_core::mock::{
        CompareTap, EdgeTap, LineTap, MockCompare, MockCounter, MockEdgeInput, MockLine,
    };
    use myco_core::remote::{RemoteDecoder, RemoteMessage};
    use myco_core::sensor::{REQUEST_HOLD, SensorDecoder, SensorReading, SensorState};
    use myco_core::{CaptureLock, Duration, SignalDecoder, Timebase, synth};

    use crate::command_filter::CommandFilter;
    use crate::controller::Relay;

    type BoardSensor<'a> =
        SensorDecoder<'a, MockCounter, MockLine<'a>, MockEdgeInput<'a>, MockCompare<'a>>;

    #[derive(Default)]
    struct Pwm {
        level: u8,
    }

    impl Backlight for Pwm {
        fn set_level(&mut self, level: u8) {
            self.level = level;
        }
    }

    #[derive(Default)]
    struct Outputs {
        a: bool,
        b: bool,
    }

    impl Relays for Outputs {
        fn toggle(&mut self, relay: Relay) {
            match relay {
                Relay::A => self.a = !self.a,
                Relay::B => self.b = !self.b,
            }
        }
    }

    struct Board {
        timebase: Timebase<MockCounter>,
        remote_input: EdgeTap,
        remote_timer: CompareTap,
        sensor_line: LineTap,
        sensor_input: EdgeTap,
        sensor_timer: CompareTap,
        lock: CaptureLock,
        queue: CommandQueue,
    }

    impl Board {
        fn new() -> Self {
            Self {
                timebase: Timebase::new(MockCounter::new(0)),
                remote_input: EdgeTap::new(),
                remote_timer: CompareTap::new(),
                sensor_line: LineTap::new(),
                sensor_input: EdgeTap::new(),
                sensor_timer: CompareTap::new(),
                lock: CaptureLock::new(),
                queue: CommandQueue::new(),
            }
        }

        fn advance(&self, by: Duration) -> u16 {
            self.timebase.counter().advance(by)
        }

        fn sensor(&self) -> Shared<BoardSensor<'_>> {
            let slot = Shared::new();
            slot.install(SensorDecoder::new(
                &self.timebase,
                MockLine::new(&self.sensor_line),
                MockEdgeInput::new(&self.sensor_input),
                MockCompare::new(&self.sensor_timer),
                &self.lock,
            ));
            slot
        }

        /// Sends one frame through an installed remote decoder
        fn send<R: SignalDecoder>(&self, remote: &Shared<R>, message: RemoteMessage) {
            for (edge, after) in synth::remote_edges(message, Polarity::Inverted) {
                let tick = self.advance(after);
                if self.remote_input.is_listening() && self.remote_input.edge() == Some(edge) {
                    remote.on_edge(tick);
                }
            }
            self.advance(Duration::from_millis(89));
        }
    }

    fn key(command: Command, toggle: bool) -> RemoteMessage {
        RemoteMessage::from_fields(true, toggle, 0, command.to_code())
    }

    #[test]
    fn test_key_presses_drive_outputs() {
        let board = Board::new();
        let remote = Shared::new();
        remote.install(RemoteDecoder::new(
            &board.timebase,
            MockEdgeInput::new(&board.remote_input),
            MockCompare::new(&board.remote_timer),
            &board.lock,
            CommandFilter::new(&board.queue),
            Polarity::Inverted,
        ));
        remote.with(|r| r.enable()).unwrap().unwrap();

        // Never installed: this board has no sensor fitted
        let sensor: Shared<BoardSensor<'_>> = Shared::new();
        let mut app = App::new(
            &Config::default(),
            &board.queue,
            Pwm::default(),
            Outputs::default(),
            |_: SensorReading| {},
        );
        assert_eq!(app.controller().backlight_level(), 7);

        // Held power key: only the first frame counts
        for _ in 0..3 {
            board.send(&remote, key(Command::Power, true));
        }
        app.step(&sensor);
        assert_eq!(app.controller().backlight_level(), 0);
        assert_eq!(app.controller().backlight().level, 0);

        // Held brightness key: every frame counts
        for _ in 0..3 {
            board.send(&remote, key(Command::ChannelUp, true));
        }
        app.step(&sensor);
        assert_eq!(app.controller().backlight_level(), 3);

        board.send(&remote, key(Command::Digit2, false));
        board.send(&remote, key(Command::Digit3, true));
        app.step(&sensor);
        assert!(app.controller().relays().a);
        assert!(app.controller().relays().b);

        assert_eq!(remote.with(|r| r.frames_decoded()), Some(8));
    }

    #[test]
    fn test_key_one_starts_climate_reading() {
        let board = Board::new();
        // Separate lock: the remote sits on its own external interrupt line
        let remote_lock = CaptureLock::new();
        let remote = Shared::new();
        remote.install(RemoteDecoder::new(
            &board.timebase,
            MockEdgeInput::new(&board.remote_input),
            MockCompare::new(&board.remote_timer),
            &remote_lock,
            CommandFilter::new(&board.queue),
            Polarity::Inverted,
        ));
        remote.with(|r| r.enable()).unwrap().unwrap();
        let sensor = board.sensor();

        let mut published = Vec::<SensorReading, 2>::new();
        {
            let mut app = App::new(
                &Config::default(),
                &board.queue,
                Pwm::default(),
                Outputs::default(),
                |reading: SensorReading| {
                    let _ = published.push(reading);
                },
            );

            board.send(&remote, key(Command::Digit1, true));
            app.step(&sensor);
            assert_eq!(sensor.with(|s| s.state()), Some(SensorState::Requesting));
            assert!(board.sensor_line.is_driven_low());

            board.advance(REQUEST_HOLD);
            sensor.on_timeout();
            for width in synth::sensor_edges(&synth::sensor_frame(455, 218)) {
                let tick = board.advance(width);
                sensor.on_edge(tick);
            }
            app.step(&sensor);
            assert_eq!(app.monitor().readings(), 1);
        }

        assert_eq!(published.len(), 1);
        assert_eq!(published[0].temperature_deci_celsius, 218);
        assert_eq!(published[0].humidity_deci_percent, 455);
    }

    #[test]
    fn test_shared_capture_channel_refuses_sensor_while_remote_listens() {
        let board = Board::new();
        let remote = Shared::new();
        remote.install(RemoteDecoder::new(
            &board.timebase,
            MockEdgeInput::new(&board.remote_input),
            MockCompare::new(&board.remote_timer),
            &board.lock,
            |_: RemoteMessage| {},
            Polarity::Inverted,
        ));
        remote.with(|r| r.enable()).unwrap().unwrap();
        let sensor = board.sensor();

        let mut app = App::new(
            &Config::default(),
            &board.queue,
            Pwm::default(),
            Outputs::default(),
            |_: SensorReading| {},
        );

        app.second_elapsed(&sensor);
        assert_eq!(sensor.with(|s| s.state()), Some(SensorState::Idle));
        assert!(!board.sensor_line.is_driven_low());
        // Remote keeps its edge configuration
        assert_eq!(board.remote_input.edge(), Some(Edge::Falling));
        assert!(!app.monitor().is_pending());

        remote.with(|r| r.disable());
        app.second_elapsed(&sensor);
        assert_eq!(sensor.with(|s| s.state()), Some(SensorState::Requesting));
    }
}
