//! Desktop simulator for the myco-rs climate controller.
//!
//! Wires both decoders to mock hardware exactly as the firmware wires them to
//! the timer unit, then replays synthetic pulse trains through the interrupt
//! shim: good and corrupted sensor replies, remote key presses with held-key
//! repeats, and a corrupted remote frame followed by guard recovery. The
//! foreground [`App`] runs between events. Everything is reported through
//! `log`; run with `RUST_LOG=debug` to see the decoders' fault diagnostics.

use log::{error, info};

use myco_core::hal::{Edge, Polarity};
use myco_core::mock::{
    CompareTap, EdgeTap, LineTap, MockCompare, MockCounter, MockEdgeInput, MockLine,
};
use myco_core::remote::{RemoteDecoder, RemoteMessage};
use myco_core::sensor::{SensorDecoder, SensorReading};
use myco_core::timebase::elapsed;
use myco_core::{CaptureLock, Duration, SignalDecoder, Tick, Timebase, synth};
use myco_rs::command_filter::{COMMAND_CHANNEL, CommandFilter};
use myco_rs::config::{CONFIG_MAX_SIZE, Config};
use myco_rs::{App, Backlight, Command, Relay, Relays, Shared};

// ---------------------------------------------------------------------------
// Timing constants
// ---------------------------------------------------------------------------

/// Counter value at power-up. Close to the top so the first frames wrap.
const COUNTER_START: Tick = 60_000;

/// Gap between repeated frames of a held key (114 ms period, ~25 ms frame)
const REPEAT_GAP: Duration = Duration::from_millis(89);

/// Pause between separate key presses
const PRESS_GAP: Duration = Duration::from_millis(300);

// ---------------------------------------------------------------------------
// Board outputs
// ---------------------------------------------------------------------------

struct LoggedBacklight;

impl Backlight for LoggedBacklight {
    fn set_level(&mut self, level: u8) {
        info!("[board] backlight PWM duty {}/15", level);
    }
}

#[derive(Default)]
struct LoggedRelays {
    a: bool,
    b: bool,
}

impl Relays for LoggedRelays {
    fn toggle(&mut self, relay: Relay) {
        let state = match relay {
            Relay::A => {
                self.a = !self.a;
                self.a
            }
            Relay::B => {
                self.b = !self.b;
                self.b
            }
        };
        info!("[board] relay {:?} {}", relay, if state { "on" } else { "off" });
    }
}

fn show_reading(reading: SensorReading) {
    info!(
        "[display] T: {:.1} C  H: {:.1} %",
        reading.temperature_celsius(),
        reading.humidity_percent()
    );
}

// ---------------------------------------------------------------------------
// Simulated timer unit
// ---------------------------------------------------------------------------

/// Moves simulated time forward and raises the interrupts it crosses
struct Bench<'a, S, R> {
    timebase: &'a Timebase<MockCounter>,
    sensor: &'a Shared<S>,
    remote: &'a Shared<R>,
    sensor_timer: &'a CompareTap,
    remote_timer: &'a CompareTap,
    sensor_input: &'a EdgeTap,
    remote_input: &'a EdgeTap,
    polarity: Polarity,
}

impl<S: SignalDecoder, R: SignalDecoder> Bench<'_, S, R> {
    /// Advances the counter by `by`, firing every compare match on the way
    fn advance(&self, by: Duration) -> Tick {
        let counter = self.timebase.counter();
        let mut left = by.as_micros();

        loop {
            let now = self.timebase.read_clock();
            let due = |tap: &CompareTap| {
                tap
                    .armed_at()
                    .map(|at| elapsed(at, now).as_micros())
                    .filter(|wait| *wait <= left)
            };

            match (due(self.sensor_timer), due(self.remote_timer)) {
                (Some(s), r) if r.is_none_or(|r| s <= r) => {
                    counter.advance(Duration::from_micros(s));
                    left -= s;
                    self.sensor.on_timeout();
                }
                (_, Some(r)) => {
                    counter.advance(Duration::from_micros(r));
                    left -= r;
                    self.remote.on_timeout();
                }
                _ => return counter.advance(Duration::from_micros(left)),
            }
        }
    }

    fn sensor_reply(&self, widths: &[Duration]) {
        for width in widths {
            let tick = self.advance(*width);
            if self.sensor_input.is_listening() {
                self.sensor.on_edge(tick);
            }
        }
    }

    fn remote_edge(&self, edge: Edge, after: Duration) {
        let tick = self.advance(after);
        // The edge detector only reacts to the configured direction
        if self.remote_input.is_listening() && self.remote_input.edge() == Some(edge) {
            self.remote.on_edge(tick);
        }
    }

    fn remote_frame(&self, message: RemoteMessage) {
        for (edge, after) in synth::remote_edges(message, self.polarity) {
            self.remote_edge(edge, after);
        }
    }

    /// One key press, optionally held for a number of repeats
    fn press(&self, command: Command, toggle: bool, repeats: usize) {
        info!("[remote] {:?} (toggle {}, {} repeats)", command, toggle as u8, repeats);
        let message = RemoteMessage::from_fields(true, toggle, 0, command.to_code());
        for _ in 0..=repeats {
            self.remote_frame(message);
            self.advance(REPEAT_GAP);
        }
        self.advance(PRESS_GAP);
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting myco-rs simulator");

    // Persisted settings round trip, as read from EEPROM at boot
    let mut eeprom = [0u8; CONFIG_MAX_SIZE];
    let stored = match Config::default().store(&mut eeprom) {
        Ok(bytes) => bytes.len(),
        Err(e) => {
            error!("Config encode failed: {}", e);
            0
        }
    };
    let config = Config::load_or_default(&eeprom[..stored]);
    info!("Config: {:?}", config);

    // Timer unit: one counter, one compare channel per decoder
    let timebase = Timebase::new(MockCounter::new(COUNTER_START));
    let sensor_timer = CompareTap::new();
    let remote_timer = CompareTap::new();

    // Sensor on the input-capture pin, remote on an external interrupt line
    let sensor_line = LineTap::new();
    let sensor_input = EdgeTap::new();
    let remote_input = EdgeTap::new();
    let capture_lock = CaptureLock::new();
    let external_lock = CaptureLock::new();

    let sensor = Shared::new();
    sensor.install(SensorDecoder::new(
        &timebase,
        MockLine::new(&sensor_line),
        MockEdgeInput::new(&sensor_input),
        MockCompare::new(&sensor_timer),
        &capture_lock,
    ));

    let remote = Shared::new();
    remote.install(RemoteDecoder::new(
        &timebase,
        MockEdgeInput::new(&remote_input),
        MockCompare::new(&remote_timer),
        &external_lock,
        CommandFilter::new(&COMMAND_CHANNEL),
        config.remote_polarity,
    ));
    if let Some(Err(e)) = remote.with(|r| r.enable()) {
        error!("Remote enable failed: {}", e);
        return;
    }

    let mut app = App::new(
        &config,
        &COMMAND_CHANNEL,
        LoggedBacklight,
        LoggedRelays::default(),
        show_reading,
    );

    let bench = Bench {
        timebase: &timebase,
        sensor: &sensor,
        remote: &remote,
        sensor_timer: &sensor_timer,
        remote_timer: &remote_timer,
        sensor_input: &sensor_input,
        remote_input: &remote_input,
        polarity: config.remote_polarity,
    };

    // -----------------------------------------------------------------------
    // Climate sensor
    // -----------------------------------------------------------------------
    let good = synth::sensor_frame(652, synth::temperature_raw(351));
    let cold = synth::sensor_frame(873, synth::temperature_raw(-42));

    info!("--- sensor: valid frame");
    app.second_elapsed(&sensor);
    bench.advance(myco_core::sensor::REQUEST_HOLD);
    bench.sensor_reply(&synth::sensor_edges(&good));
    app.step(&sensor);

    info!("--- sensor: below freezing");
    app.second_elapsed(&sensor);
    bench.advance(myco_core::sensor::REQUEST_HOLD);
    bench.sensor_reply(&synth::sensor_edges(&cold));
    app.step(&sensor);

    info!("--- sensor: corrupted checksum");
    let mut corrupted = good;
    corrupted[4] ^= 0x5A;
    app.second_elapsed(&sensor);
    bench.advance(myco_core::sensor::REQUEST_HOLD);
    bench.sensor_reply(&synth::sensor_edges(&corrupted));
    app.step(&sensor);

    info!("--- sensor: acknowledge pulse out of tolerance");
    let mut stretched = synth::sensor_edges(&good);
    stretched[1] = Duration::from_micros(105);
    app.second_elapsed(&sensor);
    bench.advance(myco_core::sensor::REQUEST_HOLD);
    bench.sensor_reply(&stretched);
    app.step(&sensor);

    info!("--- sensor: no reply");
    app.second_elapsed(&sensor);
    bench.advance(myco_core::sensor::REQUEST_HOLD + myco_core::sensor::FRAME_GUARD);
    app.step(&sensor);

    // -----------------------------------------------------------------------
    // Remote control
    // -----------------------------------------------------------------------
    info!("--- remote: power off and on, held key repeats ignored");
    bench.press(Command::Power, true, 3);
    app.step(&sensor);
    bench.press(Command::Power, false, 0);
    app.step(&sensor);

    info!("--- remote: brightness keys act on every repeat");
    bench.press(Command::ChannelUp, true, 4);
    app.step(&sensor);
    bench.press(Command::ChannelDown, false, 1);
    app.step(&sensor);

    info!("--- remote: relays");
    bench.press(Command::Digit2, true, 0);
    bench.press(Command::Digit3, false, 2);
    app.step(&sensor);

    info!("--- remote: corrupted frame, then recovery");
    let edges = synth::remote_edges(
        RemoteMessage::from_fields(true, true, 0, Command::Digit2.to_code()),
        config.remote_polarity,
    );
    let (head, tail) = edges.split_at(5);
    for (edge, after) in head {
        bench.remote_edge(*edge, *after);
    }
    // A reflection lands between two expected edges
    bench.remote_edge(Edge::Falling, Duration::from_micros(1_300));
    bench.remote_edge(Edge::Rising, Duration::from_micros(1_300));
    for (edge, after) in tail {
        bench.remote_edge(*edge, *after);
    }
    bench.advance(PRESS_GAP);
    // The lost frame never reached the filter, so the same toggle still counts
    bench.press(Command::Digit2, true, 0);
    app.step(&sensor);

    info!("--- remote: key 1 reads the climate now");
    bench.press(Command::Digit1, false, 0);
    app.step(&sensor);
    bench.advance(myco_core::sensor::REQUEST_HOLD);
    bench.sensor_reply(&synth::sensor_edges(&good));
    app.step(&sensor);

    // -----------------------------------------------------------------------
    // Summary
    // -----------------------------------------------------------------------
    let monitor = app.monitor();
    info!(
        "Climate: {} readings, {} failures",
        monitor.readings(),
        monitor.failures()
    );
    info!("Backlight level {}", app.controller().backlight_level());
    if let Some((frames, dropped)) = remote.with(|r| (r.frames_decoded(), r.handler().dropped())) {
        info!("Remote: {} frames decoded, {} commands dropped", frames, dropped);
    }
    info!("Simulator exiting");
}
